//! Change ledger for one push-version operation
//!
//! A `PushVersionContext` carries the dependency being pushed and records
//! every manifest edit and touched file while updaters apply it. The
//! recorded changes drive the commit/PR title and the report.

use crate::domain::Kind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Conventional-commit prefix used for version bump titles
pub const TITLE_PREFIX: &str = "fix(version): update ";

/// A single manifest edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Manifest section the edit happened in
    pub dependency_key: String,
    pub name: String,
    pub new_value: String,
    pub old_value: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {}",
            self.dependency_key, self.name, self.old_value, self.new_value
        )
    }
}

/// Ledger of one push-version operation
#[derive(Debug, Clone, Serialize)]
pub struct PushVersionContext {
    kind: Kind,
    name: String,
    value: String,
    changes: Vec<Change>,
    updated_files: Vec<PathBuf>,
    dry_run: bool,
    started_at: DateTime<Utc>,
}

impl PushVersionContext {
    /// Start a ledger for pushing `name` at `value`
    pub fn new(kind: Kind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
            changes: Vec::new(),
            updated_files: Vec::new(),
            dry_run: false,
            started_at: Utc::now(),
        }
    }

    /// Record edits without writing manifests back
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record one dependency version edit
    pub fn updated_version(
        &mut self,
        dependency_key: &str,
        name: &str,
        new_value: &str,
        old_value: &str,
    ) {
        self.changes.push(Change {
            dependency_key: dependency_key.to_string(),
            name: name.to_string(),
            new_value: new_value.to_string(),
            old_value: old_value.to_string(),
        });
    }

    /// First recorded change for a dependency name
    pub fn change(&self, name: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.name == name)
    }

    /// All recorded changes in recording order
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Record a file touched by the operation (each path once)
    pub fn updated_file(&mut self, path: &Path) {
        if !self.updated_files.iter().any(|p| p == path) {
            self.updated_files.push(path.to_path_buf());
        }
    }

    pub fn updated_files(&self) -> &[PathBuf] {
        &self.updated_files
    }

    /// Commit/PR title for this push
    pub fn create_title(&self) -> String {
        format!("{}{} to {}", TITLE_PREFIX, self.name, self.value)
    }

    /// Title without the version, for finding earlier pushes of the same dependency
    pub fn create_title_prefix(&self) -> String {
        format!("{}{} to ", TITLE_PREFIX, self.name)
    }
}

impl fmt::Display for PushVersionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        let context = PushVersionContext::new(Kind::Npm, "foo", "1.2.3");
        assert_eq!(context.create_title(), "fix(version): update foo to 1.2.3");
        assert_eq!(context.create_title_prefix(), "fix(version): update foo to ");
        assert!(context.create_title().starts_with(&context.create_title_prefix()));
    }

    #[test]
    fn test_records_changes_in_order() {
        let mut context = PushVersionContext::new(Kind::Npm, "foo", "2.0.0");
        context.updated_version("dependencies", "foo", "2.0.0", "1.0.0");
        context.updated_version("devDependencies", "foo", "2.0.0", "1.5.0");

        assert_eq!(context.changes().len(), 2);
        let first = context.change("foo").unwrap();
        assert_eq!(first.dependency_key, "dependencies");
        assert_eq!(first.old_value, "1.0.0");
        assert!(context.change("bar").is_none());
    }

    #[test]
    fn test_updated_files_are_unique() {
        let mut context = PushVersionContext::new(Kind::Cargo, "acme-core", "0.3.0");
        context.updated_file(Path::new("/work/api/Cargo.toml"));
        context.updated_file(Path::new("/work/api/Cargo.toml"));
        assert_eq!(context.updated_files(), &[PathBuf::from("/work/api/Cargo.toml")]);
    }

    #[test]
    fn test_dry_run_flag() {
        let context = PushVersionContext::new(Kind::Npm, "foo", "1.0.0");
        assert!(!context.is_dry_run());
        assert!(context.with_dry_run(true).is_dry_run());
    }

    #[test]
    fn test_display() {
        let context = PushVersionContext::new(Kind::Npm, "foo", "1.0.0");
        assert_eq!(context.to_string(), "npm foo@1.0.0");
        let change = Change {
            dependency_key: "dependencies".to_string(),
            name: "foo".to_string(),
            new_value: "1.0.0".to_string(),
            old_value: "0.9.0".to_string(),
        };
        assert_eq!(change.to_string(), "dependencies: foo 0.9.0 -> 1.0.0");
    }
}
