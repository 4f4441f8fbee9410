//! Ecosystem-native dependency tree generators
//!
//! Each generator runs its ecosystem's tooling in the repository directory
//! and writes the resolved graph as the `{ name, version, children }`
//! exchange document.

use super::tree::DependencyTree;
use crate::domain::Kind;
use crate::error::ProcessError;
use crate::process::{command_line, ProcessRunner};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for writing a repository's resolved dependency graph to a file
pub trait DependencyTreeGenerator: Send + Sync {
    /// Ecosystem this generator serves
    fn kind(&self) -> Kind;

    /// Write the exchange document to `dir/output_file`
    fn generate_dependency_tree(&self, dir: &Path, output_file: &str) -> Result<(), ProcessError>;
}

/// Run a tool and parse its stdout as JSON
///
/// Tools such as `npm ls` exit non-zero on peer warnings while still
/// printing a full graph, so usable stdout wins over the exit status.
fn run_json(
    runner: &dyn ProcessRunner,
    dir: &Path,
    program: &str,
    args: &[&str],
) -> Result<Value, ProcessError> {
    let command = command_line(program, args);
    let output = runner.run(dir, program, args)?;
    match serde_json::from_str::<Value>(&output.stdout) {
        Ok(value) => {
            if !output.success() {
                debug!("'{}' exited with status {} but printed a graph", command, output.status);
            }
            Ok(value)
        }
        Err(_) if !output.success() => Err(ProcessError::Failed {
            command,
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        }),
        Err(e) => Err(ProcessError::InvalidOutput {
            command,
            message: e.to_string(),
        }),
    }
}

fn write_tree(dir: &Path, output_file: &str, tree: &DependencyTree) -> Result<(), ProcessError> {
    let path = dir.join(output_file);
    let content = serde_json::to_string_pretty(&tree.to_value()).map_err(|e| {
        ProcessError::InvalidOutput {
            command: output_file.to_string(),
            message: e.to_string(),
        }
    })?;
    std::fs::write(&path, content).map_err(|e| ProcessError::WriteFailed { path, source: e })
}

/// Generator backed by `npm ls --json --all`
pub struct NpmTreeGenerator {
    runner: Arc<dyn ProcessRunner>,
}

impl NpmTreeGenerator {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

impl DependencyTreeGenerator for NpmTreeGenerator {
    fn kind(&self) -> Kind {
        Kind::Npm
    }

    fn generate_dependency_tree(&self, dir: &Path, output_file: &str) -> Result<(), ProcessError> {
        let value = run_json(self.runner.as_ref(), dir, "npm", &["ls", "--json", "--all"])?;
        let tree = npm_tree(&value, "").ok_or_else(|| ProcessError::InvalidOutput {
            command: "npm ls --json --all".to_string(),
            message: "expected a JSON object".to_string(),
        })?;
        write_tree(dir, output_file, &tree)
    }
}

/// Convert npm's nested `dependencies` object into the exchange shape
pub fn npm_tree(value: &Value, fallback_name: &str) -> Option<DependencyTree> {
    let object = value.as_object()?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(fallback_name);
    let version = object
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);
    let children = object
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter_map(|(dep_name, dep)| npm_tree(dep, dep_name))
                .collect()
        })
        .unwrap_or_default();
    Some(DependencyTree::new(name, version, children))
}

/// Generator backed by `cargo metadata --format-version 1`
pub struct CargoTreeGenerator {
    runner: Arc<dyn ProcessRunner>,
}

impl CargoTreeGenerator {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

impl DependencyTreeGenerator for CargoTreeGenerator {
    fn kind(&self) -> Kind {
        Kind::Cargo
    }

    fn generate_dependency_tree(&self, dir: &Path, output_file: &str) -> Result<(), ProcessError> {
        let args = ["metadata", "--format-version", "1"];
        let value = run_json(self.runner.as_ref(), dir, "cargo", &args)?;
        let root_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tree = cargo_tree(&value, &root_name).ok_or_else(|| ProcessError::InvalidOutput {
            command: command_line("cargo", &args),
            message: "missing packages or resolve graph".to_string(),
        })?;
        write_tree(dir, output_file, &tree)
    }
}

/// Convert `cargo metadata` output into the exchange shape
///
/// Starts at the resolve root, or at every workspace member under a
/// synthetic root for virtual workspaces. Each package is expanded once;
/// later occurrences appear as leaves.
pub fn cargo_tree(metadata: &Value, root_name: &str) -> Option<DependencyTree> {
    let packages: HashMap<&str, (&str, Option<&str>)> = metadata
        .get("packages")?
        .as_array()?
        .iter()
        .filter_map(|p| {
            let id = p.get("id")?.as_str()?;
            let name = p.get("name")?.as_str()?;
            let version = p.get("version").and_then(Value::as_str);
            Some((id, (name, version)))
        })
        .collect();

    let resolve = metadata.get("resolve")?.as_object()?;
    let edges: HashMap<&str, Vec<&str>> = resolve
        .get("nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(|node| {
                    let id = node.get("id")?.as_str()?;
                    let deps = node
                        .get("dependencies")
                        .and_then(Value::as_array)
                        .map(|d| d.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    Some((id, deps))
                })
                .collect()
        })
        .unwrap_or_default();

    let graph = CargoGraph { packages, edges };
    let mut expanded = HashSet::new();

    match resolve.get("root").and_then(Value::as_str) {
        Some(root) => graph.expand(root, &mut expanded),
        None => {
            let members: Vec<&str> = metadata
                .get("workspace_members")
                .and_then(Value::as_array)
                .map(|m| m.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let children = members
                .into_iter()
                .filter_map(|id| graph.expand(id, &mut expanded))
                .collect();
            Some(DependencyTree::new(root_name, None, children))
        }
    }
}

struct CargoGraph<'a> {
    packages: HashMap<&'a str, (&'a str, Option<&'a str>)>,
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> CargoGraph<'a> {
    fn expand(&self, id: &'a str, expanded: &mut HashSet<&'a str>) -> Option<DependencyTree> {
        let Some((name, version)) = self.packages.get(id).copied() else {
            warn!("Package {} is missing from cargo metadata", id);
            return None;
        };
        let version = version.map(str::to_string);
        if !expanded.insert(id) {
            return Some(DependencyTree::new(name, version, Vec::new()));
        }
        let children = self
            .edges
            .get(id)
            .map(|deps| {
                deps.iter()
                    .copied()
                    .filter_map(|dep| self.expand(dep, expanded))
                    .collect()
            })
            .unwrap_or_default();
        Some(DependencyTree::new(name, version, children))
    }
}
