//! Clone-or-refresh of local working copies
//!
//! A working copy that already has a `.git` directory is refreshed with
//! `git stash`, `git checkout <main-branch>` and (unless pulling is
//! disabled) `git pull`. Anything else is cloned fresh. Each step must exit
//! with status zero; the first failure ends the sequence for that
//! repository and is reported, never raised.

use super::LocalRepository;
use crate::config::ProjectConfig;
use crate::process::ProcessRunner;
use crate::progress::Progress;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// One step of the synchronization sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStep {
    /// Creating the parent directory of a fresh clone
    CreateDir,
    Clone,
    Stash,
    Checkout,
    Pull,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::CreateDir => "create directory",
            SyncStep::Clone => "git clone",
            SyncStep::Stash => "git stash",
            SyncStep::Checkout => "git checkout",
            SyncStep::Pull => "git pull",
        };
        write!(f, "{}", name)
    }
}

/// Result of synchronizing one working copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// A fresh clone was created
    Cloned,
    /// An existing working copy was reset to the main branch
    Refreshed { pulled: bool },
    /// A step exited with a non-zero status
    Failed { step: SyncStep, status: i32 },
}

impl SyncOutcome {
    /// Returns true if the working copy is usable
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncOutcome::Failed { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Cloned => write!(f, "cloned"),
            SyncOutcome::Refreshed { pulled: true } => write!(f, "pulled"),
            SyncOutcome::Refreshed { pulled: false } => write!(f, "refreshed"),
            SyncOutcome::Failed { step, status } => {
                write!(f, "{} failed with status {}", step, status)
            }
        }
    }
}

/// Options controlling the refresh sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub main_branch: String,
    pub pull_disabled: bool,
}

impl SyncOptions {
    /// Take the refresh options from the project configuration
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            main_branch: config.main_branch.clone(),
            pull_disabled: config.pull_disabled,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&ProjectConfig::default())
    }
}

/// Synchronizes working copies through git
pub struct RepositorySync<'a> {
    runner: &'a dyn ProcessRunner,
    options: SyncOptions,
}

impl<'a> RepositorySync<'a> {
    /// Create a synchronizer running git through `runner`
    pub fn new(runner: &'a dyn ProcessRunner, options: SyncOptions) -> Self {
        Self { runner, options }
    }

    /// Clone or refresh a single working copy
    pub fn sync(&self, repo: &LocalRepository) -> SyncOutcome {
        if repo.has_working_copy() {
            self.refresh(repo)
        } else {
            self.clone_fresh(repo)
        }
    }

    /// Synchronize every repository in order, continuing past failures
    pub fn sync_all(&self, repos: &[LocalRepository], show_progress: bool) -> Vec<SyncOutcome> {
        let progress = Progress::repositories(show_progress, repos.len(), "Synchronizing");

        let outcomes = repos
            .iter()
            .map(|repo| {
                progress.track(&repo.full_name, || {
                    let outcome = self.sync(repo);
                    if !outcome.is_success() {
                        warn!("Failed to synchronize {}: {}", repo.full_name, outcome);
                    }
                    outcome
                })
            })
            .collect();

        progress.finish();
        outcomes
    }

    fn refresh(&self, repo: &LocalRepository) -> SyncOutcome {
        let dir = repo.dir.as_path();
        debug!("Refreshing {} in {}", repo.full_name, dir.display());

        let status = self.runner.run_status(dir, "git", &["stash"]);
        if status != 0 {
            return SyncOutcome::Failed {
                step: SyncStep::Stash,
                status,
            };
        }

        let status = self
            .runner
            .run_status(dir, "git", &["checkout", &self.options.main_branch]);
        if status != 0 {
            return SyncOutcome::Failed {
                step: SyncStep::Checkout,
                status,
            };
        }

        if self.options.pull_disabled {
            return SyncOutcome::Refreshed { pulled: false };
        }

        let status = self.runner.run_status(dir, "git", &["pull"]);
        if status != 0 {
            return SyncOutcome::Failed {
                step: SyncStep::Pull,
                status,
            };
        }
        SyncOutcome::Refreshed { pulled: true }
    }

    fn clone_fresh(&self, repo: &LocalRepository) -> SyncOutcome {
        let Some(parent) = repo.dir.parent() else {
            return SyncOutcome::Failed {
                step: SyncStep::CreateDir,
                status: -1,
            };
        };
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create {}: {}", parent.display(), e);
            return SyncOutcome::Failed {
                step: SyncStep::CreateDir,
                status: -1,
            };
        }

        let dir_name = repo
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| repo.name.clone());

        info!("Cloning {} into {}", repo.clone_url, repo.dir.display());
        let status = self
            .runner
            .run_status(parent, "git", &["clone", &repo.clone_url, &dir_name]);
        if status != 0 {
            return SyncOutcome::Failed {
                step: SyncStep::Clone,
                status,
            };
        }
        SyncOutcome::Cloned
    }
}
