//! Project configuration
//!
//! The project file is TOML and lists the repositories to keep in sync plus
//! the dependency sets eligible for propagation:
//!
//! ```toml
//! work-dir = ".depush"
//! main-branch = "master"
//!
//! [[github.organisations]]
//! name = "acme"
//! repositories = ["api"]
//! includes = ["lib-*"]
//! excludes = ["lib-internal"]
//!
//! [[git]]
//! name = "tools"
//! clone-url = "https://git.example.com/tools.git"
//!
//! [dependencies.npm.dependencies]
//! includes = ["@acme/*"]
//! ```

use crate::domain::{DependencyConfig, NameFilter};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default project configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".depush.toml";

/// Default directory holding local working copies
pub const DEFAULT_WORK_DIR: &str = ".depush";

/// Default branch checked out before pulling
pub const DEFAULT_MAIN_BRANCH: &str = "master";

/// Repository set and dependency policy for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Directory holding local working copies
    pub work_dir: PathBuf,
    /// Branch checked out when refreshing a working copy
    pub main_branch: String,
    /// Skip `git pull` when refreshing working copies
    pub pull_disabled: bool,
    /// Repositories discovered through GitHub organisations
    pub github: Option<GitHubProjects>,
    /// Explicit git repositories outside any organisation
    pub git: Vec<GitRepositoryConfig>,
    /// Dependencies eligible for propagation
    pub dependencies: DependencyConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            main_branch: DEFAULT_MAIN_BRANCH.to_string(),
            pull_disabled: false,
            github: None,
            git: Vec::new(),
            dependencies: DependencyConfig::default(),
            source_dir: None,
        }
    }
}

/// GitHub organisations to scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GitHubProjects {
    pub organisations: Vec<GitHubOrganisation>,
}

/// One GitHub organisation (or user) and the repositories taken from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GitHubOrganisation {
    /// Organisation or user name
    pub name: String,
    /// Repositories always included, looked up by name
    pub repositories: Vec<String>,
    /// Name patterns selecting further repositories from the listing
    pub includes: Vec<String>,
    /// Name patterns removed from the listing
    pub excludes: Vec<String>,
}

impl GitHubOrganisation {
    /// Compile the include/exclude filter applied to the organisation listing
    pub fn create_filter(&self) -> Result<NameFilter, ConfigError> {
        NameFilter::new(&self.includes, &self.excludes)
    }
}

/// An explicitly configured git repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitRepositoryConfig {
    pub name: String,
    pub clone_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl ProjectConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str, location: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig =
            toml::from_str(content).map_err(|e| ConfigError::parse_error(location, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from a file path or an `http(s)` URL
    ///
    /// Relative paths are resolved against `source_dir` when it is a
    /// directory. A location that is neither an existing file nor a
    /// readable URL is a fatal `NotFound`.
    pub async fn load(location: &str, source_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut path = PathBuf::from(location);
        if let Some(dir) = source_dir.filter(|d| d.is_dir()) {
            if path.is_relative() {
                path = dir.join(location);
            }
        }

        let mut config = if path.is_file() {
            debug!("Loading project configuration from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::read_error(path.display().to_string(), e.to_string()))?;
            Self::from_toml_str(&content, &path.display().to_string())?
        } else if is_url(location) {
            debug!("Loading project configuration from {}", location);
            let content = fetch_url(location).await?;
            Self::from_toml_str(&content, location)?
        } else {
            let shown = std::path::absolute(&path).unwrap_or(path);
            return Err(ConfigError::not_found(shown.display().to_string()));
        };

        config.source_dir = source_dir.map(Path::to_path_buf);
        Ok(config)
    }

    /// Work directory with relative paths resolved against the source directory
    pub fn resolved_work_dir(&self) -> PathBuf {
        if self.work_dir.is_absolute() {
            return self.work_dir.clone();
        }
        match &self.source_dir {
            Some(dir) if dir.is_dir() => dir.join(&self.work_dir),
            _ => self.work_dir.clone(),
        }
    }

    /// Organisations configured under `[github]`
    pub fn organisations(&self) -> &[GitHubOrganisation] {
        self.github
            .as_ref()
            .map(|g| g.organisations.as_slice())
            .unwrap_or(&[])
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for organisation in self.organisations() {
            organisation.create_filter()?;
        }
        self.dependencies.validate()
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

async fn fetch_url(url: &str) -> Result<String, ConfigError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| ConfigError::read_error(url, format!("failed to open URL: {}", e)))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ConfigError::not_found(url));
    }
    if !response.status().is_success() {
        return Err(ConfigError::read_error(
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| ConfigError::read_error(url, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classification, Kind};
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
work-dir = "work"
main-branch = "main"
pull-disabled = true

[[github.organisations]]
name = "acme"
repositories = ["api", "web"]
includes = ["lib-*"]
excludes = ["lib-internal"]

[[git]]
name = "tools"
clone-url = "https://git.example.com/tools.git"
html-url = "https://git.example.com/tools"

[dependencies.npm.dependencies]
includes = ["@acme/*"]

[dependencies.npm.dev-dependencies]
excludes = ["typescript"]

[dependencies.cargo.dependencies]
includes = ["acme-*"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = ProjectConfig::from_toml_str(SAMPLE, "sample").unwrap();
        assert_eq!(config.work_dir, PathBuf::from("work"));
        assert_eq!(config.main_branch, "main");
        assert!(config.pull_disabled);

        let orgs = config.organisations();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].repositories, vec!["api", "web"]);
        let filter = orgs[0].create_filter().unwrap();
        assert!(filter.matches("lib-core"));
        assert!(!filter.matches("lib-internal"));

        assert_eq!(config.git.len(), 1);
        assert_eq!(config.git[0].clone_url, "https://git.example.com/tools.git");

        let npm = config.dependencies.for_kind(Kind::Npm).unwrap();
        assert_eq!(
            npm.set_for(Classification::Dependencies).unwrap().includes,
            vec!["@acme/*"]
        );
        assert_eq!(
            npm.set_for(Classification::DevDependencies).unwrap().excludes,
            vec!["typescript"]
        );
        assert!(config.dependencies.for_kind(Kind::Cargo).is_some());
    }

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::from_toml_str("", "empty").unwrap();
        assert_eq!(config.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
        assert_eq!(config.main_branch, DEFAULT_MAIN_BRANCH);
        assert!(!config.pull_disabled);
        assert!(config.organisations().is_empty());
        assert!(config.git.is_empty());
    }

    #[test]
    fn test_parse_error() {
        let result = ProjectConfig::from_toml_str("work-dir = ", "broken.toml");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_load_relative_to_source_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DEFAULT_CONFIG_FILE), SAMPLE).unwrap();

        let config = ProjectConfig::load(DEFAULT_CONFIG_FILE, Some(temp_dir.path()))
            .await
            .unwrap();
        assert_eq!(config.source_dir.as_deref(), Some(temp_dir.path()));
        assert_eq!(config.resolved_work_dir(), temp_dir.path().join("work"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = ProjectConfig::load("missing.toml", Some(temp_dir.path())).await;
        match result {
            Err(ConfigError::NotFound { location }) => assert!(location.ends_with("missing.toml")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_absolute_work_dir_is_kept() {
        let config = ProjectConfig {
            work_dir: PathBuf::from("/var/depush"),
            source_dir: Some(PathBuf::from("/somewhere")),
            ..Default::default()
        };
        assert_eq!(config.resolved_work_dir(), PathBuf::from("/var/depush"));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/.depush.toml"));
        assert!(is_url("http://example.com/.depush.toml"));
        assert!(!is_url(".depush.toml"));
    }
}
