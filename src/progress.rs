//! Progress display for long-running fleet operations
//!
//! Bars and spinners are drawn on stderr with indicatif so text and JSON
//! reports on stdout stay clean. A hidden reporter (quiet or JSON mode)
//! holds no bar and every call is a no-op.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress reporter for one phase of a run
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Spinner for a phase of unknown length, such as repository resolution
    pub fn spinner(enabled: bool, message: &str) -> Self {
        let bar = enabled.then(|| {
            let spinner = ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars(TICK_CHARS),
            );
            spinner.set_message(message.to_string());
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        Self { bar }
    }

    /// Bar counting repositories as each one is handled
    pub fn repositories(enabled: bool, total: usize, label: &str) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(total as u64).with_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░"),
            );
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        Self { bar }
    }

    /// Run `work` for one repository, showing its name and counting it when done
    pub fn track<T>(&self, repository: &str, work: impl FnOnce() -> T) -> T {
        if let Some(bar) = &self.bar {
            bar.set_message(repository.to_string());
        }
        let result = work();
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        result
    }

    /// Remove the bar from the terminal
    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
