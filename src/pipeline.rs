//! Push pipeline coordinating the whole propagation workflow
//!
//! This module provides:
//! - Workflow coordination: sync → extract → validate → apply
//! - Dry-run mode support
//! - Per-repository partial continuation (one failure never stops the run)
//! - The report types consumed by the output formatters

use crate::domain::{DependencyConfig, DependencyVersionChange, Kind};
use crate::ledger::{Change, PushVersionContext};
use crate::process::ProcessRunner;
use crate::progress::Progress;
use crate::repository::{LocalRepository, RepositorySync, SyncOptions, SyncOutcome};
use crate::updater::UpdaterRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final state of one candidate against one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushOutcome {
    /// The manifest was rewritten
    Applied,
    /// The manifest already pinned the proposed value
    Skipped,
    /// The dependency is not part of the repository's resolved tree
    Invalid,
    /// Reading or writing the manifest failed
    Failed,
}

/// One candidate attempted (or rejected) against one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushAttempt {
    pub kind: Kind,
    pub dependency: String,
    pub version: String,
    pub outcome: PushOutcome,
    /// Commit/PR title for this push
    pub title: String,
    pub changes: Vec<Change>,
    pub updated_files: Vec<PathBuf>,
    /// Validation diagnostic or error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PushAttempt {
    fn from_context(context: &PushVersionContext, outcome: PushOutcome, message: Option<String>) -> Self {
        Self {
            kind: context.kind(),
            dependency: context.name().to_string(),
            version: context.value().to_string(),
            outcome,
            title: context.create_title(),
            changes: context.changes().to_vec(),
            updated_files: context.updated_files().to_vec(),
            message,
        }
    }
}

/// All attempts made against one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryPushResult {
    pub repository: String,
    /// Markdown link for the commit/PR layer
    pub link: String,
    pub dir: PathBuf,
    pub attempts: Vec<PushAttempt>,
}

impl RepositoryPushResult {
    fn new(repository: &LocalRepository) -> Self {
        Self {
            repository: repository.full_name.clone(),
            link: repository.markdown_link(),
            dir: repository.dir.clone(),
            attempts: Vec::new(),
        }
    }

    /// Returns the number of attempts with the given outcome
    pub fn count(&self, outcome: PushOutcome) -> usize {
        self.attempts.iter().filter(|a| a.outcome == outcome).count()
    }

    /// Returns true if any manifest was rewritten
    pub fn is_modified(&self) -> bool {
        self.count(PushOutcome::Applied) > 0
    }
}

/// Sync outcome for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRecord {
    pub repository: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Result of a push run
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub candidates: Vec<DependencyVersionChange>,
    pub sync: Vec<SyncRecord>,
    pub repositories: Vec<RepositoryPushResult>,
}

impl PushReport {
    /// Total attempts with the given outcome across all repositories
    pub fn count(&self, outcome: PushOutcome) -> usize {
        self.repositories.iter().map(|r| r.count(outcome)).sum()
    }

    /// Repositories whose manifests changed
    pub fn modified_repositories(&self) -> impl Iterator<Item = &RepositoryPushResult> {
        self.repositories.iter().filter(|r| r.is_modified())
    }

    /// Returns true if a sync step or a manifest write failed
    pub fn has_failures(&self) -> bool {
        self.sync.iter().any(|s| !s.outcome.is_success()) || self.count(PushOutcome::Failed) > 0
    }
}

/// Upgrade tool result for one repository and kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullResult {
    pub repository: String,
    pub kind: Kind,
    pub success: bool,
}

/// Result of a pull run
#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub started_at: DateTime<Utc>,
    pub sync: Vec<SyncRecord>,
    pub results: Vec<PullResult>,
}

impl PullReport {
    pub fn has_failures(&self) -> bool {
        self.sync.iter().any(|s| !s.outcome.is_success()) || self.results.iter().any(|r| !r.success)
    }
}

/// Options for a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Record changes without writing manifests
    pub dry_run: bool,
    /// Draw progress bars on stderr
    pub show_progress: bool,
    pub sync: SyncOptions,
}

/// Pipeline wiring sync, updaters and validation together
pub struct Pipeline {
    registry: UpdaterRegistry,
    runner: Arc<dyn ProcessRunner>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with the default npm and cargo updaters
    pub fn new(runner: Arc<dyn ProcessRunner>, options: PipelineOptions) -> Self {
        let registry = UpdaterRegistry::with_defaults(runner.clone());
        Self::with_registry(registry, runner, options)
    }

    /// Create a pipeline with a custom updater registry
    pub fn with_registry(
        registry: UpdaterRegistry,
        runner: Arc<dyn ProcessRunner>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            registry,
            runner,
            options,
        }
    }

    pub fn registry(&self) -> &UpdaterRegistry {
        &self.registry
    }

    /// Clone or refresh every repository
    pub fn sync(&self, repositories: &[LocalRepository]) -> Vec<SyncRecord> {
        let sync = RepositorySync::new(self.runner.as_ref(), self.options.sync.clone());
        let outcomes = sync.sync_all(repositories, self.options.show_progress);
        repositories
            .iter()
            .zip(outcomes)
            .map(|(repo, outcome)| SyncRecord {
                repository: repo.full_name.clone(),
                outcome,
            })
            .collect()
    }

    /// Candidates published by the source repositories, first occurrence kept
    pub fn collect_candidates(
        &self,
        sources: &[LocalRepository],
        config: &DependencyConfig,
    ) -> Vec<DependencyVersionChange> {
        let mut candidates = Vec::new();
        for source in sources {
            for updater in self.registry.applicable(source) {
                updater.add_push_versions_steps(source, config, &mut candidates);
            }
        }

        let mut unique: Vec<DependencyVersionChange> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        debug!("Collected {} candidates", unique.len());
        unique
    }

    /// Validate and apply candidates to one repository
    ///
    /// Candidates are grouped by kind; each kind's tree is built once before
    /// any manifest of that kind is touched. Invalid candidates are recorded
    /// and never attempted.
    pub fn push_to_repository(
        &self,
        repository: &LocalRepository,
        candidates: &[DependencyVersionChange],
    ) -> RepositoryPushResult {
        let mut result = RepositoryPushResult::new(repository);

        let mut by_kind: BTreeMap<Kind, Vec<DependencyVersionChange>> = BTreeMap::new();
        for candidate in candidates {
            by_kind.entry(candidate.kind()).or_default().push(candidate.clone());
        }

        for (kind, changes) in by_kind {
            let Some(updater) = self.registry.for_kind(kind) else {
                continue;
            };
            if !updater.is_applicable(repository) {
                continue;
            }

            let check = updater.check_dependencies(repository, &changes);
            for change in &changes {
                let mut context =
                    PushVersionContext::new(kind, change.dependency(), change.version())
                        .with_dry_run(self.options.dry_run);

                if check.invalid_changes.contains(change) {
                    let message = check
                        .failed_check(change.dependency())
                        .map(|c| c.message.clone());
                    debug!("{} rejected for {}", change, repository.full_name);
                    result
                        .attempts
                        .push(PushAttempt::from_context(&context, PushOutcome::Invalid, message));
                    continue;
                }

                let attempt = match updater.push_versions(repository, &mut context) {
                    Ok(true) => {
                        info!("{}: {}", repository.full_name, context.create_title());
                        PushAttempt::from_context(&context, PushOutcome::Applied, None)
                    }
                    Ok(false) => PushAttempt::from_context(&context, PushOutcome::Skipped, None),
                    Err(e) => {
                        warn!("{}: {}", repository.full_name, e);
                        PushAttempt::from_context(&context, PushOutcome::Failed, Some(e.to_string()))
                    }
                };
                result.attempts.push(attempt);
            }
        }
        result
    }

    /// Sync every repository, extract candidates from the synced sources,
    /// then push them to each synced target
    ///
    /// Repositories sharing a directory with a source are not targets.
    pub fn push(
        &self,
        repositories: &[LocalRepository],
        sources: &[LocalRepository],
        config: &DependencyConfig,
    ) -> PushReport {
        let started_at = Utc::now();
        let sync = self.sync(repositories);
        let candidates = self.collect_candidates(sources, config);
        self.apply(started_at, repositories, sync, sources, candidates)
    }

    /// Sync every repository, then push one explicit candidate to each
    pub fn push_version(
        &self,
        repositories: &[LocalRepository],
        candidate: DependencyVersionChange,
    ) -> PushReport {
        let started_at = Utc::now();
        let sync = self.sync(repositories);
        self.apply(started_at, repositories, sync, &[], vec![candidate])
    }

    fn apply(
        &self,
        started_at: DateTime<Utc>,
        repositories: &[LocalRepository],
        sync: Vec<SyncRecord>,
        sources: &[LocalRepository],
        candidates: Vec<DependencyVersionChange>,
    ) -> PushReport {
        let targets: Vec<&LocalRepository> = repositories
            .iter()
            .zip(&sync)
            .filter(|(_, record)| record.outcome.is_success())
            .map(|(repo, _)| repo)
            .filter(|repo| !sources.iter().any(|s| s.same_dir(&repo.dir)))
            .collect();

        let progress = Progress::repositories(self.options.show_progress, targets.len(), "Pushing");
        let results = targets
            .into_iter()
            .map(|repo| {
                progress.track(&repo.full_name, || self.push_to_repository(repo, &candidates))
            })
            .collect();
        progress.finish();

        PushReport {
            started_at,
            dry_run: self.options.dry_run,
            candidates,
            sync,
            repositories: results,
        }
    }

    /// Sync every repository, then run each applicable upgrade tool
    pub fn pull(&self, repositories: &[LocalRepository]) -> PullReport {
        let started_at = Utc::now();
        let sync = self.sync(repositories);
        let mut results = Vec::new();

        for (repo, record) in repositories.iter().zip(&sync) {
            if !record.outcome.is_success() {
                continue;
            }
            for updater in self.registry.applicable(repo) {
                results.push(PullResult {
                    repository: repo.full_name.clone(),
                    kind: updater.kind(),
                    success: updater.pull_versions(repo),
                });
            }
        }

        PullReport {
            started_at,
            sync,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencySet, KindDependencies};
    use crate::process::testing::RecordingRunner;
    use crate::process::ProcessOutput;
    use std::path::Path;
    use tempfile::TempDir;

    const NPM_LS: &str = r#"{"name":"app","dependencies":{"left-pad":{"version":"1.0.0"},"lib-x":{"version":"1.0.0"}}}"#;

    fn checkout(root: &Path, name: &str, package_json: &str) -> LocalRepository {
        let dir = root.join(name);
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join("package.json"), package_json).unwrap();
        LocalRepository::from_dir(dir)
    }

    fn pipeline(runner: Arc<RecordingRunner>, dry_run: bool) -> Pipeline {
        Pipeline::new(
            runner,
            PipelineOptions {
                dry_run,
                ..Default::default()
            },
        )
    }

    fn npm_candidate(name: &str, version: &str) -> DependencyVersionChange {
        DependencyVersionChange::new(Kind::Npm, name, version, "dependencies")
    }

    #[test]
    fn test_push_to_repository_applies_valid_and_rejects_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let repo = checkout(temp_dir.path(), "web", r#"{"dependencies":{"left-pad":"1.0.0"}}"#);
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("npm ls", ProcessOutput::success_with_stdout(NPM_LS));

        let candidates = vec![npm_candidate("left-pad", "1.1.0"), npm_candidate("missing-pkg", "1.0.0")];
        let result = pipeline(runner, false).push_to_repository(&repo, &candidates);

        assert_eq!(result.attempts.len(), 2);
        assert_eq!(result.attempts[0].outcome, PushOutcome::Applied);
        assert_eq!(result.attempts[0].title, "fix(version): update left-pad to 1.1.0");
        assert_eq!(result.attempts[0].changes[0].old_value, "1.0.0");
        assert_eq!(result.attempts[1].outcome, PushOutcome::Invalid);
        assert!(result.attempts[1].message.is_some());
        assert!(result.is_modified());
    }

    #[test]
    fn test_push_skips_unchanged_values() {
        let temp_dir = TempDir::new().unwrap();
        let repo = checkout(temp_dir.path(), "web", r#"{"dependencies":{"left-pad":"1.0.0"}}"#);
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("npm ls", ProcessOutput::success_with_stdout(NPM_LS));

        let result =
            pipeline(runner, false).push_to_repository(&repo, &[npm_candidate("left-pad", "1.0.0")]);
        assert_eq!(result.attempts[0].outcome, PushOutcome::Skipped);
        assert!(result.attempts[0].changes.is_empty());
        assert!(!result.is_modified());
    }

    #[test]
    fn test_push_ignores_kinds_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let repo = checkout(temp_dir.path(), "web", "{}");
        let runner = Arc::new(RecordingRunner::new());

        let candidate = DependencyVersionChange::new(Kind::Cargo, "serde", "1.0.0", "dependencies");
        let result = pipeline(runner.clone(), false).push_to_repository(&repo, &[candidate]);
        assert!(result.attempts.is_empty());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_push_excludes_sources_and_reports_sync() {
        let temp_dir = TempDir::new().unwrap();
        let source = checkout(temp_dir.path(), "lib-x", r#"{"name":"lib-x","version":"2.0.0"}"#);
        let target = checkout(temp_dir.path(), "web", r#"{"dependencies":{"lib-x":"1.0.0"}}"#);
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("npm ls", ProcessOutput::success_with_stdout(NPM_LS));
        let pipeline = pipeline(runner, false);

        let report = pipeline.push(
            &[source.clone(), target.clone()],
            &[source],
            &DependencyConfig::default(),
        );
        assert_eq!(report.candidates, vec![npm_candidate("lib-x", "2.0.0")]);
        assert_eq!(report.sync.len(), 2);
        assert_eq!(report.repositories.len(), 1);
        assert_eq!(report.repositories[0].repository, "web");
        assert_eq!(report.count(PushOutcome::Applied), 1);
        assert!(!report.has_failures());
        assert_eq!(report.modified_repositories().count(), 1);
    }

    /// Runner whose `git pull` / `git clone` deliver an upstream manifest
    struct UpstreamRunner {
        inner: RecordingRunner,
        source_dir: PathBuf,
        upstream: String,
    }

    impl ProcessRunner for UpstreamRunner {
        fn run(
            &self,
            dir: &Path,
            program: &str,
            args: &[&str],
        ) -> Result<ProcessOutput, crate::error::ProcessError> {
            let delivered = match (program, args) {
                ("git", ["pull"]) => Some(dir.to_path_buf()),
                ("git", ["clone", _, name]) => Some(dir.join(name)),
                _ => None,
            };
            if let Some(target) = delivered.filter(|d| *d == self.source_dir) {
                std::fs::create_dir_all(target.join(".git")).unwrap();
                std::fs::write(target.join("package.json"), &self.upstream).unwrap();
            }
            self.inner.run(dir, program, args)
        }
    }

    fn upstream_runner(source_dir: PathBuf) -> Arc<UpstreamRunner> {
        let inner = RecordingRunner::new();
        inner.respond("npm ls", ProcessOutput::success_with_stdout(NPM_LS));
        Arc::new(UpstreamRunner {
            inner,
            source_dir,
            upstream: r#"{"name":"lib-x","version":"2.1.0"}"#.to_string(),
        })
    }

    #[test]
    fn test_push_extracts_candidates_after_sync() {
        let temp_dir = TempDir::new().unwrap();
        let source = checkout(temp_dir.path(), "lib-x", r#"{"name":"lib-x","version":"2.0.0"}"#);
        let target = checkout(temp_dir.path(), "web", r#"{"dependencies":{"lib-x":"1.0.0"}}"#);
        let runner = upstream_runner(source.dir.clone());

        let report = Pipeline::new(runner, PipelineOptions::default()).push(
            &[source.clone(), target.clone()],
            &[source],
            &DependencyConfig::default(),
        );

        assert_eq!(report.candidates, vec![npm_candidate("lib-x", "2.1.0")]);
        let written = std::fs::read_to_string(target.file("package.json")).unwrap();
        assert!(written.contains(r#""lib-x": "2.1.0""#));
    }

    #[test]
    fn test_push_extracts_candidates_from_freshly_cloned_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = LocalRepository::from_dir(temp_dir.path().join("lib-x"));
        let target = checkout(temp_dir.path(), "web", r#"{"dependencies":{"lib-x":"1.0.0"}}"#);
        let runner = upstream_runner(source.dir.clone());

        let report = Pipeline::new(runner, PipelineOptions::default()).push(
            &[source.clone(), target],
            &[source],
            &DependencyConfig::default(),
        );

        assert_eq!(report.sync[0].outcome, SyncOutcome::Cloned);
        assert_eq!(report.candidates, vec![npm_candidate("lib-x", "2.1.0")]);
        assert_eq!(report.repositories.len(), 1);
        assert_eq!(report.count(PushOutcome::Applied), 1);
    }

    #[test]
    fn test_push_skips_repositories_that_failed_to_sync() {
        let temp_dir = TempDir::new().unwrap();
        let target = checkout(temp_dir.path(), "web", r#"{"dependencies":{"lib-x":"1.0.0"}}"#);
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("git pull", ProcessOutput::with_status(1));

        let report =
            pipeline(runner, false).push_version(&[target], npm_candidate("lib-x", "2.0.0"));
        assert!(report.repositories.is_empty());
        assert!(report.has_failures());
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let original = r#"{"dependencies":{"left-pad":"1.0.0"}}"#;
        let repo = checkout(temp_dir.path(), "web", original);
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("npm ls", ProcessOutput::success_with_stdout(NPM_LS));

        let report = pipeline(runner, true)
            .push_version(std::slice::from_ref(&repo), npm_candidate("left-pad", "1.1.0"));
        assert!(report.dry_run);
        assert_eq!(report.count(PushOutcome::Applied), 1);
        assert_eq!(std::fs::read_to_string(repo.file("package.json")).unwrap(), original);
    }

    #[test]
    fn test_collect_candidates_dedups() {
        let temp_dir = TempDir::new().unwrap();
        let a = checkout(temp_dir.path(), "a", r#"{"dependencies":{"foo-bar":"1.0.0"}}"#);
        let b = checkout(temp_dir.path(), "b", r#"{"dependencies":{"foo-bar":"1.0.0"}}"#);
        let config = DependencyConfig {
            npm: Some(KindDependencies {
                dependencies: Some(DependencySet::new(vec!["foo-*".to_string()], vec![])),
                ..Default::default()
            }),
            cargo: None,
        };

        let candidates =
            pipeline(Arc::new(RecordingRunner::new()), false).collect_candidates(&[a, b], &config);
        assert_eq!(candidates, vec![npm_candidate("foo-bar", "1.0.0")]);
    }

    #[test]
    fn test_pull_runs_upgrade_tools() {
        let temp_dir = TempDir::new().unwrap();
        let repo = checkout(temp_dir.path(), "web", "{}");
        let runner = Arc::new(RecordingRunner::new());
        runner.respond("ncu", ProcessOutput::with_status(1));

        let report = pipeline(runner.clone(), false).pull(&[repo]);
        assert_eq!(
            report.results,
            vec![PullResult {
                repository: "web".to_string(),
                kind: Kind::Npm,
                success: false
            }]
        );
        assert!(report.has_failures());
        assert!(runner.commands().contains(&"ncu --upgrade".to_string()));
    }
}
