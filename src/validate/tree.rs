//! Dependency tree model and candidate verdicts

use crate::domain::DependencyVersionChange;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use tracing::{debug, warn};

/// Message recorded for every candidate when no tree could be built
pub const NO_TREE_MESSAGE: &str = "no dependency tree available";

/// Message recorded when a candidate is absent from the tree
pub const NOT_FOUND_MESSAGE: &str = "dependency not found in the dependency tree";

/// Resolved dependency graph of one repository
///
/// The root node is the repository itself; its descendants are the resolved
/// dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyTree {
    pub name: String,
    pub version: Option<String>,
    pub children: Vec<DependencyTree>,
}

impl DependencyTree {
    /// Create a node
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        children: Vec<DependencyTree>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            children,
        }
    }

    /// Build a tree from the exchange document
    ///
    /// Only `name`, `version` and `children` are read. Malformed children
    /// are dropped; a non-object root yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let version = object
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);
        let children = object
            .get("children")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default();

        Some(Self {
            name,
            version,
            children,
        })
    }

    /// Serialize into the exchange document shape
    pub fn to_value(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("name".to_string(), Value::String(self.name.clone()));
        if let Some(version) = &self.version {
            object.insert("version".to_string(), Value::String(version.clone()));
        }
        object.insert(
            "children".to_string(),
            Value::Array(self.children.iter().map(Self::to_value).collect()),
        );
        Value::Object(object)
    }

    /// Load a tree from an exchange file, treating any failure as no tree
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No dependency tree at {}: {}", path.display(), e);
                return None;
            }
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse dependency tree {}: {}", path.display(), e);
                return None;
            }
        };
        let tree = Self::from_value(&value);
        if tree.is_none() {
            warn!("Dependency tree {} is not an object", path.display());
        }
        tree
    }

    /// Breadth-first search of the descendants for a dependency name
    pub fn find(&self, name: &str) -> Option<&DependencyTree> {
        let mut queue: VecDeque<&DependencyTree> = self.children.iter().collect();
        while let Some(node) = queue.pop_front() {
            if node.name == name {
                return Some(node);
            }
            queue.extend(node.children.iter());
        }
        None
    }

    /// Verdict for one dependency name against this tree
    pub fn dependency_check(&self, name: &str) -> DependencyCheck {
        match self.find(name) {
            Some(node) => DependencyCheck::valid(name, node.version.clone()),
            None => DependencyCheck::invalid(name, NOT_FOUND_MESSAGE),
        }
    }
}

/// Verdict for one candidate against one tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCheck {
    pub dependency: String,
    pub valid: bool,
    pub message: String,
    /// Resolved version found in the tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DependencyCheck {
    pub fn valid(dependency: impl Into<String>, version: Option<String>) -> Self {
        let message = match &version {
            Some(v) => format!("resolved to {}", v),
            None => "present in the dependency tree".to_string(),
        };
        Self {
            dependency: dependency.into(),
            valid: true,
            message,
            version,
        }
    }

    pub fn invalid(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            valid: false,
            message: message.into(),
            version: None,
        }
    }
}

/// Aggregate verdict for a batch of candidates against one repository
///
/// Every input change lands in exactly one of `valid_changes` and
/// `invalid_changes`; each invalid name has an entry in `failed_checks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindDependenciesCheck {
    pub valid_changes: Vec<DependencyVersionChange>,
    pub invalid_changes: Vec<DependencyVersionChange>,
    pub failed_checks: BTreeMap<String, DependencyCheck>,
}

impl KindDependenciesCheck {
    /// Partition changes against a tree; with no tree every change is invalid
    pub fn from_tree(tree: Option<&DependencyTree>, changes: &[DependencyVersionChange]) -> Self {
        let mut result = Self::default();
        for change in changes {
            let check = match tree {
                Some(tree) => tree.dependency_check(change.dependency()),
                None => DependencyCheck::invalid(change.dependency(), NO_TREE_MESSAGE),
            };
            if check.valid {
                result.valid_changes.push(change.clone());
            } else {
                result
                    .failed_checks
                    .entry(change.dependency().to_string())
                    .or_insert(check);
                result.invalid_changes.push(change.clone());
            }
        }
        result
    }

    /// Returns true if no change was rejected
    pub fn is_valid(&self) -> bool {
        self.invalid_changes.is_empty()
    }

    /// Diagnostic for a rejected dependency
    pub fn failed_check(&self, name: &str) -> Option<&DependencyCheck> {
        self.failed_checks.get(name)
    }
}
