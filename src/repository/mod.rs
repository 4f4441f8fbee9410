//! Repository discovery, resolution and synchronization
//!
//! This module provides:
//! - LocalRepository: a local working copy bound to one remote repository
//! - RepositoryDirectory: the seam to the repository hosting service
//! - Resolution of the configured repository set (see `resolver`)
//! - Clone-or-refresh of local working copies (see `sync`)

mod github;
mod resolver;
mod sync;

pub use github::GitHubDirectory;
pub use resolver::resolve_repositories;
pub use sync::{RepositorySync, SyncOptions, SyncOutcome, SyncStep};

use crate::config::GitRepositoryConfig;
use crate::error::DirectoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A repository as described by the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Short repository name
    pub name: String,
    /// Owner-qualified name (e.g. `acme/api`)
    pub full_name: String,
    /// URL used to clone the repository
    pub clone_url: String,
    /// Web page of the repository
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A local working copy bound to one remote repository
///
/// Identity is the clone URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRepository {
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    pub dir: PathBuf,
}

impl LocalRepository {
    /// Bind a hosting-service repository to a local directory
    pub fn from_remote(remote: RemoteRepository, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: remote.name,
            full_name: remote.full_name,
            clone_url: remote.clone_url,
            html_url: remote.html_url,
            dir: dir.into(),
        }
    }

    /// Bind an explicitly configured git repository to a local directory
    pub fn from_git(git: &GitRepositoryConfig, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: git.name.clone(),
            full_name: git.name.clone(),
            clone_url: git.clone_url.clone(),
            html_url: git.html_url.clone(),
            dir: dir.into(),
        }
    }

    /// Wrap an existing directory, such as the source checkout of a release
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let absolute = std::path::absolute(&dir).unwrap_or_else(|_| dir.clone());
        let name = absolute
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("source")
            .to_string();
        Self {
            full_name: name.clone(),
            name,
            clone_url: format!("file://{}", absolute.display()),
            html_url: None,
            dir,
        }
    }

    /// Resolve a file inside the working copy
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Returns true if the working copy directory contains a git checkout
    pub fn has_working_copy(&self) -> bool {
        self.dir.join(".git").exists()
    }

    /// Markdown link to the repository labelled with its full name
    pub fn markdown_link(&self) -> String {
        self.markdown_link_with_label(&self.full_name)
    }

    /// Markdown link with a custom label, or the label in backticks when
    /// the repository has no web URL
    pub fn markdown_link_with_label(&self, label: &str) -> String {
        match self.html_url.as_deref() {
            Some(url) if !url.is_empty() => format!("[{}]({})", label, url),
            _ => format!("`{}`", label),
        }
    }

    /// Returns true if both bindings point at the same local directory
    pub fn same_dir(&self, other: &Path) -> bool {
        match (self.dir.canonicalize(), other.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.dir == other,
        }
    }
}

/// Returns the first repository with the given short name
pub fn find_repository<'a>(
    repositories: &'a [LocalRepository],
    name: &str,
) -> Option<&'a LocalRepository> {
    repositories.iter().find(|r| r.name == name)
}

/// Trait for the repository hosting service
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// Get the service name used in log and error messages
    fn service_name(&self) -> &'static str;

    /// Look up a single repository of an organisation or user by name
    async fn find_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RemoteRepository>, DirectoryError>;

    /// List every repository of an organisation or user
    async fn list_repositories(&self, owner: &str)
        -> Result<Vec<RemoteRepository>, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> RemoteRepository {
        RemoteRepository {
            name: name.to_string(),
            full_name: format!("acme/{}", name),
            clone_url: format!("https://github.com/acme/{}.git", name),
            html_url: Some(format!("https://github.com/acme/{}", name)),
        }
    }

    #[test]
    fn test_from_remote() {
        let repo = LocalRepository::from_remote(remote("api"), "/work/github/acme/api");
        assert_eq!(repo.name, "api");
        assert_eq!(repo.full_name, "acme/api");
        assert_eq!(repo.clone_url, "https://github.com/acme/api.git");
        assert_eq!(repo.file("package.json"), PathBuf::from("/work/github/acme/api/package.json"));
    }

    #[test]
    fn test_from_git() {
        let git = GitRepositoryConfig {
            name: "tools".to_string(),
            clone_url: "https://git.example.com/tools.git".to_string(),
            html_url: None,
        };
        let repo = LocalRepository::from_git(&git, "/work/git/tools");
        assert_eq!(repo.full_name, "tools");
        assert_eq!(repo.clone_url, "https://git.example.com/tools.git");
    }

    #[test]
    fn test_from_dir_uses_directory_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("lib-x");
        std::fs::create_dir(&dir).unwrap();
        let repo = LocalRepository::from_dir(&dir);
        assert_eq!(repo.name, "lib-x");
        assert!(repo.clone_url.starts_with("file://"));
        assert!(repo.same_dir(&dir));
    }

    #[test]
    fn test_markdown_link() {
        let repo = LocalRepository::from_remote(remote("api"), "/work/api");
        assert_eq!(repo.markdown_link(), "[acme/api](https://github.com/acme/api)");

        let mut plain = repo.clone();
        plain.html_url = None;
        assert_eq!(plain.markdown_link(), "`acme/api`");
        assert_eq!(plain.markdown_link_with_label("api"), "`api`");
    }

    #[test]
    fn test_find_repository() {
        let repos = vec![
            LocalRepository::from_remote(remote("api"), "/work/api"),
            LocalRepository::from_remote(remote("web"), "/work/web"),
        ];
        assert_eq!(find_repository(&repos, "web").unwrap().full_name, "acme/web");
        assert!(find_repository(&repos, "missing").is_none());
    }

    #[test]
    fn test_has_working_copy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::from_dir(temp_dir.path());
        assert!(!repo.has_working_copy());
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        assert!(repo.has_working_copy());
    }
}
