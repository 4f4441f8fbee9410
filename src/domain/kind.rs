//! Ecosystem kinds and their manifest conventions

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported package ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// npm ecosystem (package.json)
    Npm,
    /// Cargo ecosystem (Cargo.toml)
    Cargo,
}

/// Role of a dependency inside a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Regular runtime dependencies
    Dependencies,
    /// Development-only dependencies
    DevDependencies,
    /// Peer dependencies (npm)
    PeerDependencies,
    /// Build-script dependencies (cargo)
    BuildDependencies,
}

impl Kind {
    /// Returns the manifest filename for this kind
    pub fn manifest_filename(&self) -> &'static str {
        match self {
            Kind::Npm => "package.json",
            Kind::Cargo => "Cargo.toml",
        }
    }

    /// Returns the display name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Kind::Npm => "npm",
            Kind::Cargo => "cargo",
        }
    }

    /// Classifications a manifest of this kind carries, direct dependencies first
    pub fn classifications(&self) -> &'static [Classification] {
        match self {
            Kind::Npm => &[
                Classification::Dependencies,
                Classification::DevDependencies,
                Classification::PeerDependencies,
            ],
            Kind::Cargo => &[
                Classification::Dependencies,
                Classification::DevDependencies,
                Classification::BuildDependencies,
            ],
        }
    }

    /// Manifest section key holding dependencies of the given classification
    pub fn dependency_key(&self, classification: Classification) -> &'static str {
        match (self, classification) {
            (Kind::Npm, Classification::Dependencies) => "dependencies",
            (Kind::Npm, Classification::DevDependencies) => "devDependencies",
            (Kind::Npm, Classification::PeerDependencies) => "peerDependencies",
            (Kind::Npm, Classification::BuildDependencies) => "buildDependencies",
            (Kind::Cargo, Classification::Dependencies) => "dependencies",
            (Kind::Cargo, Classification::DevDependencies) => "dev-dependencies",
            (Kind::Cargo, Classification::PeerDependencies) => "peer-dependencies",
            (Kind::Cargo, Classification::BuildDependencies) => "build-dependencies",
        }
    }

    /// All manifest section keys this kind rewrites, in manifest scan order
    pub fn dependency_keys(&self) -> Vec<&'static str> {
        self.classifications()
            .iter()
            .map(|c| self.dependency_key(*c))
            .collect()
    }

    /// Returns all supported kinds
    pub fn all() -> &'static [Kind] {
        &[Kind::Npm, Kind::Cargo]
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Kind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" | "node" => Ok(Kind::Npm),
            "cargo" | "rust" => Ok(Kind::Cargo),
            other => Err(ConfigError::UnknownKind {
                value: other.to_string(),
            }),
        }
    }
}
