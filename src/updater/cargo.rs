//! Cargo updater for `Cargo.toml`
//!
//! Handles:
//! - dependencies
//! - dev-dependencies
//! - build-dependencies
//! - Inline table format: { version = "1.0" }
//! - Dotted key format: name.version = "1.0"
//! - Dotted table format: [dependencies.name] with a version key
//! - Basic ("1.0") and literal ('1.0') strings
//!
//! Versions are rewritten in place line by line so comments, ordering and
//! formatting of everything else survive byte for byte.

use super::{
    is_development_version, read_manifest, run_upgrade_tool, write_manifest, Updater,
};
use crate::domain::{Classification, DependencyConfig, DependencyVersionChange, Kind};
use crate::error::ManifestError;
use crate::ledger::PushVersionContext;
use crate::process::ProcessRunner;
use crate::repository::LocalRepository;
use crate::validate::{
    check_dependencies, CargoTreeGenerator, DependencyTreeGenerator, KindDependenciesCheck,
};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use toml::{Table, Value};
use tracing::{debug, warn};

/// Updater for Cargo projects
pub struct CargoUpdater {
    runner: Arc<dyn ProcessRunner>,
    generator: Box<dyn DependencyTreeGenerator>,
}

impl CargoUpdater {
    /// Create an updater using `cargo metadata` for dependency trees
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        let generator = Box::new(CargoTreeGenerator::new(runner.clone()));
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

fn parse_cargo_toml(path: &Path, content: &str) -> Result<Table, ManifestError> {
    toml::from_str(content).map_err(|e| ManifestError::toml_parse_error(path, e.to_string()))
}

/// Literal version of a dependency entry: a plain string or a table's `version`
fn literal_version(value: &Value) -> Option<&str> {
    match value {
        Value::String(version) => Some(version.as_str()),
        Value::Table(table) => table.get("version").and_then(Value::as_str),
        _ => None,
    }
}

/// A version edit made by [`rewrite_dependency_version`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEdit {
    pub dependency_key: String,
    pub old_value: String,
}

/// A basic or literal TOML string, captured as `dq` or `sq`
const QUOTED_VALUE: &str = r#"(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#;

/// Rewrite every pinned version of `name` in the given sections to `value`
///
/// Recognizes `name = "x"`, `name.version = "x"` and
/// `name = { version = "x", ... }` under `[section]`, and `version = "x"`
/// under `[section.name]`, with basic or literal quotes. Lines that
/// already pin `value` are left alone and the original quote style is
/// kept. Returns the new content and the edits made, in file order.
pub fn rewrite_dependency_version(
    content: &str,
    name: &str,
    value: &str,
    sections: &[&str],
) -> Result<(String, Vec<VersionEdit>), regex::Error> {
    let key = format!(r#"["']?{}["']?"#, regex::escape(name));
    let entry_patterns = [
        Regex::new(&format!(
            r#"^(?P<pre>\s*{}\s*=\s*\{{.*?\bversion\s*=\s*){}(?P<rest>.*)$"#,
            key, QUOTED_VALUE
        ))?,
        Regex::new(&format!(
            r#"^(?P<pre>\s*{}\s*\.\s*version\s*=\s*){}(?P<rest>.*)$"#,
            key, QUOTED_VALUE
        ))?,
        Regex::new(&format!(
            r#"^(?P<pre>\s*{}\s*=\s*){}(?P<rest>.*)$"#,
            key, QUOTED_VALUE
        ))?,
    ];
    let version_key = Regex::new(&format!(
        r#"^(?P<pre>\s*version\s*=\s*){}(?P<rest>.*)$"#,
        QUOTED_VALUE
    ))?;

    let mut output = String::with_capacity(content.len() + value.len());
    let mut edits = Vec::new();
    // (section key, inside a dotted [section.name] table)
    let mut current: Option<(&str, bool)> = None;

    for raw_line in content.split_inclusive('\n') {
        let (line, ending) = split_line_ending(raw_line);
        let trimmed = line.trim_start();

        if trimmed.starts_with('[') {
            current = section_header(trimmed).and_then(|header| {
                sections.iter().find_map(|&key| {
                    if header == key {
                        Some((key, false))
                    } else if header
                        .strip_prefix(key)
                        .and_then(|rest| rest.strip_prefix('.'))
                        .map(|rest| rest.trim().trim_matches(|c: char| c == '"' || c == '\'') == name)
                        .unwrap_or(false)
                    {
                        Some((key, true))
                    } else {
                        None
                    }
                })
            });
            output.push_str(raw_line);
            continue;
        }

        let captures = match current {
            Some((_, true)) => version_key.captures(line),
            Some((_, false)) => entry_patterns.iter().find_map(|re| re.captures(line)),
            None => None,
        };
        let found = captures.and_then(|caps| {
            let (quote, old) = match (caps.name("dq"), caps.name("sq")) {
                (Some(dq), _) => ('"', dq.as_str()),
                (None, Some(sq)) => ('\'', sq.as_str()),
                (None, None) => return None,
            };
            Some((caps.name("pre")?.as_str(), quote, old, caps.name("rest")?.as_str()))
        });
        match (current, found) {
            (Some((key, _)), Some((pre, quote, old, rest))) if old != value => {
                edits.push(VersionEdit {
                    dependency_key: key.to_string(),
                    old_value: old.to_string(),
                });
                output.push_str(pre);
                output.push(quote);
                output.push_str(value);
                output.push(quote);
                output.push_str(rest);
                output.push_str(ending);
            }
            _ => output.push_str(raw_line),
        }
    }

    Ok((output, edits))
}

fn split_line_ending(raw_line: &str) -> (&str, &str) {
    let without_lf = raw_line.strip_suffix('\n').unwrap_or(raw_line);
    let line = without_lf.strip_suffix('\r').unwrap_or(without_lf);
    (line, &raw_line[line.len()..])
}

/// Name of a `[table]` header; array-of-tables headers yield `None`
fn section_header(line: &str) -> Option<&str> {
    if line.starts_with("[[") {
        return None;
    }
    let inner = line.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

impl Updater for CargoUpdater {
    fn kind(&self) -> Kind {
        Kind::Cargo
    }

    fn add_push_versions_steps(
        &self,
        repository: &LocalRepository,
        config: &DependencyConfig,
        list: &mut Vec<DependencyVersionChange>,
    ) {
        let kind = self.kind();
        let path = repository.file(kind.manifest_filename());
        if !path.is_file() {
            debug!("No Cargo.toml in {}", repository.full_name);
            return;
        }
        let manifest = match read_manifest(&path).and_then(|c| parse_cargo_toml(&path, &c)) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        let package = manifest.get("package").and_then(Value::as_table);
        let name = package.and_then(|p| p.get("name")).and_then(Value::as_str);
        // `version.workspace = true` is not a literal version
        let version = package.and_then(|p| p.get("version")).and_then(Value::as_str);
        if let (Some(name), Some(version)) = (name, version) {
            if is_development_version(version) {
                debug!("Not pushing development version {}@{}", name, version);
            } else if !name.is_empty() && !version.is_empty() {
                list.push(DependencyVersionChange::new(
                    kind,
                    name,
                    version,
                    kind.dependency_key(Classification::Dependencies),
                ));
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
            let Some(section) = manifest.get(key).and_then(Value::as_table) else {
                continue;
            };
            for (dependency, value) in section {
                if !filter.matches(dependency) {
                    continue;
                }
                if let Some(version) = literal_version(value) {
                    list.push(DependencyVersionChange::new(kind, dependency, version, key));
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
        parse_cargo_toml(&path, &content)?;

        let name = context.name().to_string();
        let value = context.value().to_string();
        let (rewritten, edits) =
            rewrite_dependency_version(&content, &name, &value, &self.kind().dependency_keys())
                .map_err(|e| ManifestError::toml_parse_error(&path, e.to_string()))?;

        if edits.is_empty() {
            return Ok(false);
        }
        for edit in &edits {
            context.updated_version(&edit.dependency_key, &name, &value, &edit.old_value);
        }
        if !context.is_dry_run() {
            write_manifest(&path, &rewritten)?;
        }
        context.updated_file(&path);
        Ok(true)
    }

    fn pull_versions(&self, repository: &LocalRepository) -> bool {
        run_upgrade_tool(self.runner.as_ref(), repository, "cargo", &["update"])
    }

    fn check_dependencies(
        &self,
        repository: &LocalRepository,
        changes: &[DependencyVersionChange],
    ) -> KindDependenciesCheck {
        check_dependencies(self.generator.as_ref(), repository, changes)
    }
}
