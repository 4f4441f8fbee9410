//! Dependency tree validation
//!
//! This module provides:
//! - DependencyTree: the resolved graph of one repository
//! - DependencyCheck / KindDependenciesCheck: verdicts for candidates
//! - DependencyTreeGenerator: ecosystem tooling that dumps the graph
//! - check_dependencies: generate, parse and delete the transient tree file

mod generator;
mod tree;

pub use generator::{
    cargo_tree, npm_tree, CargoTreeGenerator, DependencyTreeGenerator, NpmTreeGenerator,
};
pub use tree::{
    DependencyCheck, DependencyTree, KindDependenciesCheck, NOT_FOUND_MESSAGE, NO_TREE_MESSAGE,
};

use crate::domain::DependencyVersionChange;
use crate::repository::LocalRepository;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exchange file written into the repository directory
pub const DEPENDENCY_TREE_FILE: &str = ".dependency-tree.json";

/// A file removed when the guard is dropped
///
/// Removal failures are logged and never propagated.
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.path.is_file() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Build the repository's dependency tree and partition `changes` against it
///
/// A generator failure or an unreadable tree leaves every change invalid.
/// The exchange file is removed on every exit path.
pub fn check_dependencies(
    generator: &dyn DependencyTreeGenerator,
    repository: &LocalRepository,
    changes: &[DependencyVersionChange],
) -> KindDependenciesCheck {
    let transient = TransientFile::new(repository.file(DEPENDENCY_TREE_FILE));

    if let Err(e) = generator.generate_dependency_tree(&repository.dir, DEPENDENCY_TREE_FILE) {
        warn!(
            "Failed to generate {} dependency tree for {}: {}",
            generator.kind(),
            repository.full_name,
            e
        );
    }

    let tree = DependencyTree::load(transient.path());
    KindDependenciesCheck::from_tree(tree.as_ref(), changes)
}
