//! npm updater for `package.json`
//!
//! Handles:
//! - dependencies
//! - devDependencies
//! - peerDependencies
//!
//! Manifests are rewritten with two-space pretty printing, original key
//! order and a trailing newline.

use super::{
    is_development_version, read_manifest, run_upgrade_tool, write_manifest, Updater,
};
use crate::domain::{Classification, DependencyConfig, DependencyVersionChange, Kind};
use crate::error::ManifestError;
use crate::ledger::PushVersionContext;
use crate::process::ProcessRunner;
use crate::repository::LocalRepository;
use crate::validate::{
    check_dependencies, DependencyTreeGenerator, KindDependenciesCheck, NpmTreeGenerator,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Updater for npm projects
pub struct NpmUpdater {
    runner: Arc<dyn ProcessRunner>,
    generator: Box<dyn DependencyTreeGenerator>,
}

impl NpmUpdater {
    /// Create an updater using `npm ls` for dependency trees
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        let generator = Box::new(NpmTreeGenerator::new(runner.clone()));
        Self::with_generator(runner, generator)
    }

    /// Create an updater with a custom dependency tree generator
    pub fn with_generator(
        runner: Arc<dyn ProcessRunner>,
        generator: Box<dyn DependencyTreeGenerator>,
    ) -> Self {
        Self { runner, generator }
    }
}

fn parse_package_json(path: &Path, content: &str) -> Result<Value, ManifestError> {
    serde_json::from_str(content).map_err(|e| ManifestError::json_parse_error(path, e.to_string()))
}

/// Serialize `package.json` content the way npm writes it
fn to_package_json_string(path: &Path, json: &Value) -> Result<String, ManifestError> {
    let mut content = serde_json::to_string_pretty(json)
        .map_err(|e| ManifestError::json_parse_error(path, e.to_string()))?;
    content.push('\n');
    Ok(content)
}

/// Load a source manifest, logging why it contributes nothing
fn load_source_manifest(repository: &LocalRepository) -> Option<Value> {
    let path = repository.file(Kind::Npm.manifest_filename());
    if !path.is_file() {
        debug!("No package.json in {}", repository.full_name);
        return None;
    }
    match read_manifest(&path).and_then(|content| parse_package_json(&path, &content)) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

impl Updater for NpmUpdater {
    fn kind(&self) -> Kind {
        Kind::Npm
    }

    fn add_push_versions_steps(
        &self,
        repository: &LocalRepository,
        config: &DependencyConfig,
        list: &mut Vec<DependencyVersionChange>,
    ) {
        let Some(json) = load_source_manifest(repository) else {
            return;
        };
        let kind = self.kind();
        let direct_key = kind.dependency_key(Classification::Dependencies);

        let name = json.get("name").and_then(Value::as_str).unwrap_or_default();
        let version = json.get("version").and_then(Value::as_str).unwrap_or_default();
        if !name.is_empty() && !version.is_empty() {
            if is_development_version(version) {
                debug!("Not pushing development version {}@{}", name, version);
            } else {
                list.push(DependencyVersionChange::new(kind, name, version, direct_key));
            }
        }

        let Some(dependencies) = config.for_kind(kind) else {
            return;
        };
        for &classification in kind.classifications() {
            let Some(set) = dependencies.set_for(classification) else {
                continue;
            };
            let filter = match set.create_filter() {
                Ok(filter) => filter,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            let key = kind.dependency_key(classification);
            let Some(section) = json.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (field, value) in section {
                if !filter.matches(field) {
                    continue;
                }
                if let Some(value) = value.as_str() {
                    list.push(DependencyVersionChange::new(kind, field, value, key));
                }
            }
        }
    }

    fn push_versions(
        &self,
        repository: &LocalRepository,
        context: &mut PushVersionContext,
    ) -> Result<bool, ManifestError> {
        let path = repository.file(self.kind().manifest_filename());
        if !path.is_file() {
            return Ok(false);
        }
        let content = read_manifest(&path)?;
        let mut json = parse_package_json(&path, &content)?;

        let name = context.name().to_string();
        let value = context.value().to_string();
        let mut modified = false;

        for key in self.kind().dependency_keys() {
            let Some(section) = json.get_mut(key).and_then(Value::as_object_mut) else {
                continue;
            };
            let Some(current) = section.get(&name).and_then(Value::as_str).map(str::to_string)
            else {
                continue;
            };
            if current != value {
                section.insert(name.clone(), Value::String(value.clone()));
                context.updated_version(key, &name, &value, &current);
                modified = true;
            }
        }

        if modified {
            if !context.is_dry_run() {
                write_manifest(&path, &to_package_json_string(&path, &json)?)?;
            }
            context.updated_file(&path);
        }
        Ok(modified)
    }

    fn pull_versions(&self, repository: &LocalRepository) -> bool {
        run_upgrade_tool(self.runner.as_ref(), repository, "ncu", &["--upgrade"])
    }

    fn check_dependencies(
        &self,
        repository: &LocalRepository,
        changes: &[DependencyVersionChange],
    ) -> KindDependenciesCheck {
        check_dependencies(self.generator.as_ref(), repository, changes)
    }
}
