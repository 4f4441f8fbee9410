//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Per-repository push results with colors
//! - Change ledger lines for every rewritten manifest section
//! - Invalid candidates with their validation diagnostic
//! - Summary line with a breakdown by outcome

use crate::output::{OutputFormatter, Verbosity};
use crate::pipeline::{PullReport, PushAttempt, PushOutcome, PushReport, SyncRecord};
use crate::repository::LocalRepository;
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    dry_run: bool,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self::with_color(verbosity, dry_run, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    fn dry_run_prefix(&self) -> String {
        match (self.dry_run, self.color) {
            (false, _) => String::new(),
            (true, true) => format!("{} ", "(dry-run)".cyan()),
            (true, false) => "(dry-run) ".to_string(),
        }
    }

    fn marker(&self, outcome: PushOutcome) -> String {
        let (symbol, painted) = match outcome {
            PushOutcome::Applied => ("✓", "✓".green().to_string()),
            PushOutcome::Skipped => ("-", "-".dimmed().to_string()),
            PushOutcome::Invalid => ("✗", "✗".yellow().to_string()),
            PushOutcome::Failed => ("!", "!".red().bold().to_string()),
        };
        if self.color {
            painted
        } else {
            symbol.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_sync(&self, sync: &[SyncRecord], writer: &mut dyn Write) -> std::io::Result<()> {
        for record in sync {
            if record.outcome.is_success() {
                if self.verbosity == Verbosity::Verbose {
                    writeln!(writer, "  {} {}", record.repository, record.outcome)?;
                }
                continue;
            }
            let line = format!("  {}: {}", record.repository, record.outcome);
            if self.color {
                writeln!(writer, "{}", line.red())?;
            } else {
                writeln!(writer, "{}", line)?;
            }
        }
        Ok(())
    }

    fn write_attempt(&self, attempt: &PushAttempt, writer: &mut dyn Write) -> std::io::Result<()> {
        let marker = self.marker(attempt.outcome);
        match attempt.outcome {
            PushOutcome::Applied => {
                writeln!(writer, "  {} {}", marker, attempt.title)?;
                for change in &attempt.changes {
                    writeln!(writer, "      {}", change)?;
                }
            }
            PushOutcome::Skipped => {
                if self.verbosity == Verbosity::Verbose {
                    writeln!(
                        writer,
                        "  {} {}@{} already up to date",
                        marker, attempt.dependency, attempt.version
                    )?;
                }
            }
            PushOutcome::Invalid | PushOutcome::Failed => {
                let label = if attempt.outcome == PushOutcome::Invalid {
                    "invalid"
                } else {
                    "failed"
                };
                writeln!(
                    writer,
                    "  {} {}@{} {}: {}",
                    marker,
                    attempt.dependency,
                    attempt.version,
                    label,
                    attempt.message.as_deref().unwrap_or("")
                )?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_push(&self, report: &PushReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let applied = report.count(PushOutcome::Applied);
        let skipped = report.count(PushOutcome::Skipped);
        let invalid = report.count(PushOutcome::Invalid);
        let failed = report.count(PushOutcome::Failed);

        if self.verbosity != Verbosity::Quiet {
            writeln!(
                writer,
                "{}Pushing {} candidate(s) to {} repositor{}",
                self.dry_run_prefix(),
                report.candidates.len(),
                report.repositories.len(),
                if report.repositories.len() == 1 { "y" } else { "ies" }
            )?;
            if self.verbosity == Verbosity::Verbose {
                for candidate in &report.candidates {
                    writeln!(writer, "  {}", candidate)?;
                }
            }
            self.write_sync(&report.sync, writer)?;

            for repository in &report.repositories {
                let visible = repository.attempts.iter().any(|a| {
                    a.outcome != PushOutcome::Skipped || self.verbosity == Verbosity::Verbose
                });
                if !visible {
                    continue;
                }
                writeln!(writer)?;
                writeln!(writer, "{}", self.bold(&repository.repository))?;
                for attempt in &repository.attempts {
                    self.write_attempt(attempt, writer)?;
                }
            }
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "{}{} applied, {} skipped, {} invalid, {} failed",
            self.dry_run_prefix(),
            applied,
            skipped,
            invalid,
            failed
        )
    }

    fn format_pull(&self, report: &PullReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            self.write_sync(&report.sync, writer)?;
            for result in &report.results {
                let outcome = if result.success {
                    PushOutcome::Applied
                } else {
                    PushOutcome::Failed
                };
                writeln!(
                    writer,
                    "  {} {} ({})",
                    self.marker(outcome),
                    result.repository,
                    result.kind
                )?;
            }
        }
        let failed = report.results.iter().filter(|r| !r.success).count();
        writeln!(
            writer,
            "{} upgraded, {} failed",
            report.results.len() - failed,
            failed
        )
    }

    fn format_repositories(
        &self,
        repositories: &[LocalRepository],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        for repository in repositories {
            if self.verbosity == Verbosity::Verbose {
                writeln!(
                    writer,
                    "- {} {} {}",
                    repository.markdown_link(),
                    repository.clone_url,
                    repository.dir.display()
                )?;
            } else {
                writeln!(writer, "- {}", repository.markdown_link())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Kind;
    use crate::ledger::Change;
    use crate::pipeline::{PullResult, RepositoryPushResult};
    use crate::repository::{SyncOutcome, SyncStep};
    use chrono::Utc;
    use std::path::PathBuf;

    fn attempt(dependency: &str, outcome: PushOutcome, message: Option<&str>) -> PushAttempt {
        PushAttempt {
            kind: Kind::Npm,
            dependency: dependency.to_string(),
            version: "2.0.0".to_string(),
            outcome,
            title: format!("fix(version): update {} to 2.0.0", dependency),
            changes: if outcome == PushOutcome::Applied {
                vec![Change {
                    dependency_key: "dependencies".to_string(),
                    name: dependency.to_string(),
                    new_value: "2.0.0".to_string(),
                    old_value: "1.0.0".to_string(),
                }]
            } else {
                vec![]
            },
            updated_files: vec![],
            message: message.map(str::to_string),
        }
    }

    fn report(dry_run: bool) -> PushReport {
        PushReport {
            started_at: Utc::now(),
            dry_run,
            candidates: vec![],
            sync: vec![SyncRecord {
                repository: "acme/api".to_string(),
                outcome: SyncOutcome::Failed {
                    step: SyncStep::Pull,
                    status: 1,
                },
            }],
            repositories: vec![RepositoryPushResult {
                repository: "acme/web".to_string(),
                link: "`acme/web`".to_string(),
                dir: PathBuf::from("/work/acme/web"),
                attempts: vec![
                    attempt("lib-x", PushOutcome::Applied, None),
                    attempt("left-pad", PushOutcome::Skipped, None),
                    attempt("missing-pkg", PushOutcome::Invalid, Some("not found")),
                ],
            }],
        }
    }

    fn render(formatter: &TextFormatter, report: &PushReport) -> String {
        let mut buffer = Vec::new();
        formatter.format_push(report, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_push_output() {
        let output = render(&TextFormatter::with_color(Verbosity::Normal, false, false), &report(false));
        assert!(output.contains("acme/api: git pull failed with status 1"));
        assert!(output.contains("✓ fix(version): update lib-x to 2.0.0"));
        assert!(output.contains("dependencies: lib-x 1.0.0 -> 2.0.0"));
        assert!(output.contains("✗ missing-pkg@2.0.0 invalid: not found"));
        assert!(!output.contains("left-pad"));
        assert!(output.contains("1 applied, 1 skipped, 1 invalid, 0 failed"));
    }

    #[test]
    fn test_push_output_verbose_shows_skips() {
        let output = render(&TextFormatter::with_color(Verbosity::Verbose, false, false), &report(false));
        assert!(output.contains("- left-pad@2.0.0 already up to date"));
    }

    #[test]
    fn test_push_output_quiet_prints_summary_only() {
        let output = render(&TextFormatter::with_color(Verbosity::Quiet, true, false), &report(true));
        assert_eq!(output, "(dry-run) 1 applied, 1 skipped, 1 invalid, 0 failed\n");
    }

    #[test]
    fn test_pull_output() {
        let report = PullReport {
            started_at: Utc::now(),
            sync: vec![],
            results: vec![PullResult {
                repository: "acme/web".to_string(),
                kind: Kind::Npm,
                success: true,
            }],
        };
        let mut buffer = Vec::new();
        TextFormatter::with_color(Verbosity::Normal, false, false)
            .format_pull(&report, &mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("✓ acme/web (npm)"));
        assert!(output.contains("1 upgraded, 0 failed"));
    }

    #[test]
    fn test_repositories_output() {
        let repo = LocalRepository::from_dir("/work/git/tools");
        let mut buffer = Vec::new();
        TextFormatter::new(Verbosity::Normal, false)
            .format_repositories(&[repo], &mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "- `tools`\n");
    }
}
