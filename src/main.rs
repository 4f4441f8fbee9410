//! depush - propagate dependency versions across a fleet of repositories
//!
//! Sources publish versions (their own and the ones they pin); every other
//! configured repository gets those versions written into its manifests
//! after the change is validated against its resolved dependency tree.

use clap::Parser;
use depush::cli::{CliArgs, Command};
use depush::config::ProjectConfig;
use depush::domain::{Classification, DependencyVersionChange};
use depush::output::{create_formatter, OutputConfig};
use depush::pipeline::{Pipeline, PipelineOptions};
use depush::process::SystemProcessRunner;
use depush::progress::Progress;
use depush::repository::{resolve_repositories, GitHubDirectory, LocalRepository, SyncOptions};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status when the run completed but some repositories or attempts failed
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "depush=debug" } else { "depush=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    let mut config = ProjectConfig::load(&args.config, Some(&cwd)).await?;
    args.apply_overrides(&mut config);
    debug!("Working copies in {}", config.resolved_work_dir().display());

    let directory = GitHubDirectory::new()?;
    let spinner = Progress::spinner(args.show_progress(), "Resolving repositories...");
    let repositories = resolve_repositories(&config, &directory).await;
    spinner.finish();

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.dry_run);
    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();

    let pipeline = Pipeline::new(
        Arc::new(SystemProcessRunner::new()),
        PipelineOptions {
            dry_run: args.dry_run,
            show_progress: args.show_progress(),
            sync: SyncOptions::from_config(&config),
        },
    );

    let has_failures = match &args.command {
        Command::Repos => {
            formatter.format_repositories(&repositories, &mut stdout)?;
            false
        }
        Command::Push { sources } => {
            let sources: Vec<LocalRepository> =
                sources.iter().map(LocalRepository::from_dir).collect();
            let report = pipeline.push(&repositories, &sources, &config.dependencies);
            formatter.format_push(&report, &mut stdout)?;
            report.has_failures()
        }
        Command::PushVersion { kind, name, value } => {
            let candidate = DependencyVersionChange::new(
                *kind,
                name,
                value,
                kind.dependency_key(Classification::Dependencies),
            );
            let report = pipeline.push_version(&repositories, candidate);
            formatter.format_push(&report, &mut stdout)?;
            report.has_failures()
        }
        Command::Pull => {
            let report = pipeline.pull(&repositories);
            formatter.format_pull(&report, &mut stdout)?;
            report.has_failures()
        }
    };
    stdout.flush()?;

    if has_failures {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
