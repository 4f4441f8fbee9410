//! Candidate version change structures

use super::Kind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A proposed `(dependency, version)` pair to propagate to other repositories
///
/// Produced by scanning a source repository's manifest and consumed by the
/// dependency tree validator and the updaters that apply it to targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyVersionChange {
    kind: Kind,
    dependency: String,
    version: String,
    /// Manifest section the change was found in (e.g. `devDependencies`)
    dependency_key: String,
}

impl DependencyVersionChange {
    /// Creates a new version change
    pub fn new(
        kind: Kind,
        dependency: impl Into<String>,
        version: impl Into<String>,
        dependency_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            dependency: dependency.into(),
            version: version.into(),
            dependency_key: dependency_key.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dependency_key(&self) -> &str {
        &self.dependency_key
    }
}

impl fmt::Display for DependencyVersionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} [{} {}]",
            self.dependency, self.version, self.kind, self.dependency_key
        )
    }
}
