//! CLI argument parsing module for depush

use crate::config::{ProjectConfig, DEFAULT_CONFIG_FILE};
use crate::domain::Kind;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Propagate dependency versions across a fleet of repositories
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depush",
    version,
    about = "Propagate dependency versions across a fleet of repositories"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Project configuration file path or http(s) URL
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Directory holding local working copies (overrides the config file)
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Do not run `git pull` when refreshing working copies
    #[arg(long, global = true)]
    pub pull_disabled: bool,

    /// Dry run mode - report what would change without writing manifests
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Push the versions published by source checkouts to every repository
    Push {
        /// Source checkout to extract versions from (can be specified multiple times)
        #[arg(long = "source", action = ArgAction::Append, default_value = ".")]
        sources: Vec<PathBuf>,
    },

    /// Push one explicit dependency version to every repository
    PushVersion {
        /// Ecosystem of the dependency (npm or cargo)
        #[arg(long, value_parser = parse_kind)]
        kind: Kind,
        /// Dependency name
        name: String,
        /// Version value to write
        value: String,
    },

    /// Run each ecosystem's upgrade tool in every repository
    Pull,

    /// List the resolved repositories
    Repos,
}

fn parse_kind(s: &str) -> Result<Kind, String> {
    s.parse::<Kind>().map_err(|e| e.to_string())
}

impl CliArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut ProjectConfig) {
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if self.pull_disabled {
            config.pull_disabled = true;
        }
    }

    /// Returns true if progress bars should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}
