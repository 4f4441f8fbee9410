//! Ecosystem updaters
//!
//! This module provides:
//! - Updater: the capability contract implemented once per Kind
//! - UpdaterRegistry: selection of updaters by applicability or kind
//! - Manifest read/write helpers shared by the implementations
//!
//! Several updaters may apply to the same repository (a repository with
//! both `package.json` and `Cargo.toml` is handled by both).

mod cargo;
mod npm;

pub use cargo::{rewrite_dependency_version, CargoUpdater, VersionEdit};
pub use npm::NpmUpdater;

use crate::domain::{DependencyConfig, DependencyVersionChange, Kind};
use crate::error::ManifestError;
use crate::ledger::PushVersionContext;
use crate::process::ProcessRunner;
use crate::repository::LocalRepository;
use crate::validate::KindDependenciesCheck;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Version suffix marking unreleased builds that are never pushed
pub const DEVELOPMENT_SUFFIX: &str = "-development";

/// Returns true if a version is tagged as a development build
pub fn is_development_version(version: &str) -> bool {
    version.ends_with(DEVELOPMENT_SUFFIX)
}

/// Capability contract for one package ecosystem
pub trait Updater: Send + Sync {
    /// Ecosystem handled by this updater
    fn kind(&self) -> Kind;

    /// Returns true if the repository carries this ecosystem's manifest
    fn is_applicable(&self, repository: &LocalRepository) -> bool {
        repository.file(self.kind().manifest_filename()).is_file()
    }

    /// Append the candidates a source repository publishes
    ///
    /// A missing or unparsable manifest contributes nothing.
    fn add_push_versions_steps(
        &self,
        repository: &LocalRepository,
        config: &DependencyConfig,
        list: &mut Vec<DependencyVersionChange>,
    );

    /// Apply the context's `(name, value)` to every manifest section that
    /// pins a different value; returns true if the manifest changed
    fn push_versions(
        &self,
        repository: &LocalRepository,
        context: &mut PushVersionContext,
    ) -> Result<bool, ManifestError>;

    /// Run the ecosystem's upgrade tool; true on exit status zero
    fn pull_versions(&self, repository: &LocalRepository) -> bool;

    /// Partition candidates against the repository's resolved dependency tree
    fn check_dependencies(
        &self,
        repository: &LocalRepository,
        changes: &[DependencyVersionChange],
    ) -> KindDependenciesCheck;
}

/// The set of available updaters
pub struct UpdaterRegistry {
    updaters: Vec<Box<dyn Updater>>,
}

impl UpdaterRegistry {
    pub fn new(updaters: Vec<Box<dyn Updater>>) -> Self {
        Self { updaters }
    }

    /// Registry with the npm and cargo updaters backed by `runner`
    pub fn with_defaults(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(vec![
            Box::new(NpmUpdater::new(runner.clone())),
            Box::new(CargoUpdater::new(runner)),
        ])
    }

    /// Updaters applicable to a repository, in registration order
    pub fn applicable<'a>(
        &'a self,
        repository: &'a LocalRepository,
    ) -> impl Iterator<Item = &'a dyn Updater> + 'a {
        self.updaters
            .iter()
            .map(|u| u.as_ref())
            .filter(move |u| u.is_applicable(repository))
    }

    /// Updater for a kind
    pub fn for_kind(&self, kind: Kind) -> Option<&dyn Updater> {
        self.updaters
            .iter()
            .map(|u| u.as_ref())
            .find(|u| u.kind() == kind)
    }
}

/// Read a manifest file
pub(crate) fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Write content to a manifest file
pub(crate) fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}

/// Run an upgrade tool in the repository directory
pub(crate) fn run_upgrade_tool(
    runner: &dyn ProcessRunner,
    repository: &LocalRepository,
    program: &str,
    args: &[&str],
) -> bool {
    let status = runner.run_status(&repository.dir, program, args);
    if status != 0 {
        tracing::warn!(
            "{} failed in {} with status {}",
            crate::process::command_line(program, args),
            repository.full_name,
            status
        );
    }
    status == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use tempfile::TempDir;

    #[test]
    fn test_is_development_version() {
        assert!(is_development_version("2.0.0-development"));
        assert!(!is_development_version("2.0.0"));
        assert!(!is_development_version("2.0.0-development.1"));
        assert!(!is_development_version("2.0.0-SNAPSHOT"));
    }

    #[test]
    fn test_registry_selects_applicable_updaters() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("package.json"), "{}").unwrap();
        let repo = LocalRepository::from_dir(temp_dir.path());
        let registry = UpdaterRegistry::with_defaults(Arc::new(RecordingRunner::new()));

        let kinds: Vec<Kind> = registry.applicable(&repo).map(|u| u.kind()).collect();
        assert_eq!(kinds, vec![Kind::Npm]);

        std::fs::write(temp_dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let kinds: Vec<Kind> = registry.applicable(&repo).map(|u| u.kind()).collect();
        assert_eq!(kinds, vec![Kind::Npm, Kind::Cargo]);
    }

    #[test]
    fn test_registry_for_kind() {
        let registry = UpdaterRegistry::with_defaults(Arc::new(RecordingRunner::new()));
        assert_eq!(registry.for_kind(Kind::Cargo).unwrap().kind(), Kind::Cargo);
        assert!(UpdaterRegistry::new(vec![]).for_kind(Kind::Npm).is_none());
    }

    #[test]
    fn test_manifest_io() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");
        assert!(matches!(read_manifest(&path), Err(ManifestError::ReadError { .. })));
        write_manifest(&path, "{}").unwrap();
        assert_eq!(read_manifest(&path).unwrap(), "{}");
    }
}
