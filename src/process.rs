//! External process execution
//!
//! This module provides:
//! - The ProcessRunner seam used for git, upgrade tools and tree dumps
//! - A system implementation backed by std::process::Command
//!
//! Every invocation is synchronous and blocking with no timeout.

use crate::error::ProcessError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Result of running an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status (-1 when the process was terminated by a signal)
    pub status: i32,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
}

impl ProcessOutput {
    /// Create an output with the given status and empty streams
    pub fn with_status(status: i32) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Create a successful output carrying stdout
    pub fn success_with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Returns true if the command exited with status zero
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Trait for running external commands in a working directory
pub trait ProcessRunner: Send + Sync {
    /// Run `program args...` in `dir` and wait for it to finish
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ProcessOutput, ProcessError>;

    /// Run a command and return its exit status, treating spawn failures as `-1`
    fn run_status(&self, dir: &Path, program: &str, args: &[&str]) -> i32 {
        match self.run(dir, program, args) {
            Ok(output) => output.status,
            Err(e) => {
                tracing::warn!("{}", e);
                -1
            }
        }
    }
}

/// Default runner that executes real commands
#[derive(Debug, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    /// Create a new system process runner
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ProcessOutput, ProcessError> {
        if program.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }

        let command_str = command_line(program, args);
        debug!("Running '{}' in {}", command_str, dir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| ProcessError::SpawnFailed {
                command: command_str,
                dir: dir.to_path_buf(),
                source: e,
            })?;

        Ok(ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Render a command line for logging
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner shared by unit tests

    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// A recorded invocation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation {
        pub dir: PathBuf,
        pub command: String,
    }

    /// Runner that records invocations and replays scripted outputs
    ///
    /// Commands without a scripted response succeed with empty output.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub invocations: Mutex<Vec<Invocation>>,
        responses: Mutex<Vec<(String, VecDeque<ProcessOutput>)>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the next output for commands starting with `prefix`
        pub fn respond(&self, prefix: &str, output: ProcessOutput) {
            let mut responses = self.responses.lock().unwrap();
            if let Some((_, queue)) = responses.iter_mut().find(|(p, _)| p == prefix) {
                queue.push_back(output);
            } else {
                responses.push((prefix.to_string(), VecDeque::from([output])));
            }
        }

        pub fn commands(&self) -> Vec<String> {
            self.invocations
                .lock()
                .unwrap()
                .iter()
                .map(|i| i.command.clone())
                .collect()
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(
            &self,
            dir: &Path,
            program: &str,
            args: &[&str],
        ) -> Result<ProcessOutput, ProcessError> {
            let command = command_line(program, args);
            self.invocations.lock().unwrap().push(Invocation {
                dir: dir.to_path_buf(),
                command: command.clone(),
            });
            let mut responses = self.responses.lock().unwrap();
            for (prefix, queue) in responses.iter_mut() {
                if command.starts_with(prefix.as_str()) {
                    if let Some(output) = queue.pop_front() {
                        return Ok(output);
                    }
                }
            }
            Ok(ProcessOutput::with_status(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;

    #[test]
    fn test_process_output_success() {
        assert!(ProcessOutput::with_status(0).success());
        assert!(!ProcessOutput::with_status(1).success());
        assert_eq!(ProcessOutput::success_with_stdout("{}").stdout, "{}");
    }

    #[test]
    fn test_command_line() {
        assert_eq!(command_line("git", &["checkout", "master"]), "git checkout master");
        assert_eq!(command_line("ncu", &[]), "ncu");
    }

    #[test]
    fn test_system_runner_empty_program() {
        let runner = SystemProcessRunner::new();
        let result = runner.run(Path::new("."), "", &[]);
        assert!(matches!(result, Err(ProcessError::EmptyCommand)));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let temp_dir = tempfile::tempdir().unwrap();
        let runner = SystemProcessRunner::new();
        let result = runner.run(temp_dir.path(), "depush-no-such-binary-xyz", &["--version"]);
        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
        assert_eq!(
            runner.run_status(temp_dir.path(), "depush-no-such-binary-xyz", &[]),
            -1
        );
    }

    #[test]
    fn test_recording_runner_scripts_responses() {
        let runner = RecordingRunner::new();
        runner.respond("git pull", ProcessOutput::with_status(1));

        assert_eq!(runner.run_status(Path::new("/repo"), "git", &["stash"]), 0);
        assert_eq!(runner.run_status(Path::new("/repo"), "git", &["pull"]), 1);
        // scripted response is consumed
        assert_eq!(runner.run_status(Path::new("/repo"), "git", &["pull"]), 0);
        assert_eq!(runner.commands(), vec!["git stash", "git pull", "git pull"]);
    }
}
