//! Include/exclude name filters
//!
//! This module provides:
//! - NameFilter: compiled wildcard include/exclude patterns
//! - DependencySet: the configured patterns for one classification group
//! - DependencyConfig: per-kind, per-classification dependency sets

use super::{Classification, Kind};
use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Compiled include/exclude filter over names
///
/// A name matches iff it satisfies an include pattern (or there are no
/// include patterns) and satisfies no exclude pattern. Patterns are matched
/// against the whole name; `*` matches any run of characters and `?` any
/// single character.
#[derive(Debug, Clone)]
pub struct NameFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl NameFilter {
    /// Compile a filter from include and exclude patterns
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            includes: compile_patterns(includes)?,
            excludes: compile_patterns(excludes)?,
        })
    }

    /// Check whether a name passes this filter
    pub fn matches(&self, name: &str) -> bool {
        let included = self.includes.is_empty() || self.includes.iter().any(|re| re.is_match(name));
        included && !self.excludes.iter().any(|re| re.is_match(name))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(wildcard_to_regex)
        .collect()
}

fn wildcard_to_regex(pattern: &str) -> Result<Regex, ConfigError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Configured inclusion policy for one classification group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencySet {
    /// Name patterns to include (empty means everything)
    pub includes: Vec<String>,
    /// Name patterns to exclude
    pub excludes: Vec<String>,
}

impl DependencySet {
    /// Create a set from include and exclude patterns
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    /// Compile this set into a filter
    pub fn create_filter(&self) -> Result<NameFilter, ConfigError> {
        NameFilter::new(&self.includes, &self.excludes)
    }
}

/// Dependency sets for one kind, one per classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KindDependencies {
    pub dependencies: Option<DependencySet>,
    pub dev_dependencies: Option<DependencySet>,
    pub peer_dependencies: Option<DependencySet>,
    pub build_dependencies: Option<DependencySet>,
}

impl KindDependencies {
    /// Returns the set configured for a classification, if any
    pub fn set_for(&self, classification: Classification) -> Option<&DependencySet> {
        match classification {
            Classification::Dependencies => self.dependencies.as_ref(),
            Classification::DevDependencies => self.dev_dependencies.as_ref(),
            Classification::PeerDependencies => self.peer_dependencies.as_ref(),
            Classification::BuildDependencies => self.build_dependencies.as_ref(),
        }
    }

    fn sets(&self) -> impl Iterator<Item = &DependencySet> {
        [
            &self.dependencies,
            &self.dev_dependencies,
            &self.peer_dependencies,
            &self.build_dependencies,
        ]
        .into_iter()
        .flatten()
    }
}

/// Which dependencies of each kind are eligible for propagation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    pub npm: Option<KindDependencies>,
    pub cargo: Option<KindDependencies>,
}

impl DependencyConfig {
    /// Returns the dependency sets configured for a kind
    pub fn for_kind(&self, kind: Kind) -> Option<&KindDependencies> {
        match kind {
            Kind::Npm => self.npm.as_ref(),
            Kind::Cargo => self.cargo.as_ref(),
        }
    }

    /// Compile every configured set once so bad patterns surface at load time
    pub fn validate(&self) -> Result<(), ConfigError> {
        for deps in [&self.npm, &self.cargo].into_iter().flatten() {
            for set in deps.sets() {
                set.create_filter()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(includes: &[&str], excludes: &[&str]) -> NameFilter {
        let includes: Vec<String> = includes.iter().map(|s| s.to_string()).collect();
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        NameFilter::new(&includes, &excludes).unwrap()
    }

    #[test]
    fn test_include_wildcard_with_exclude() {
        let f = filter(&["foo-*"], &["foo-internal"]);
        assert!(f.matches("foo-bar"));
        assert!(f.matches("foo-utils"));
        assert!(!f.matches("foo-internal"));
        assert!(!f.matches("bar"));
    }

    #[test]
    fn test_empty_includes_match_everything() {
        let f = filter(&[], &[]);
        assert!(f.matches("anything"));
    }

    #[test]
    fn test_exclude_only() {
        let f = filter(&[], &["*-internal"]);
        assert!(f.matches("lib-public"));
        assert!(!f.matches("lib-internal"));
    }

    #[test]
    fn test_exact_pattern_is_anchored() {
        let f = filter(&["react"], &[]);
        assert!(f.matches("react"));
        assert!(!f.matches("react-dom"));
        assert!(!f.matches("preact"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let f = filter(&["@acme/*"], &[]);
        assert!(f.matches("@acme/core"));
        assert!(!f.matches("@other/core"));

        let dotted = filter(&["a.b"], &[]);
        assert!(dotted.matches("a.b"));
        assert!(!dotted.matches("axb"));
    }

    #[test]
    fn test_question_mark_matches_single_char() {
        let f = filter(&["lib-?"], &[]);
        assert!(f.matches("lib-a"));
        assert!(!f.matches("lib-ab"));
    }

    #[test]
    fn test_blank_patterns_ignored() {
        let f = filter(&["  "], &[""]);
        assert!(f.matches("anything"));
    }

    #[test]
    fn test_kind_dependencies_set_for() {
        let deps = KindDependencies {
            dev_dependencies: Some(DependencySet::new(vec!["jest".to_string()], vec![])),
            ..Default::default()
        };
        assert!(deps.set_for(Classification::Dependencies).is_none());
        assert_eq!(
            deps.set_for(Classification::DevDependencies).unwrap().includes,
            vec!["jest"]
        );
    }

    #[test]
    fn test_dependency_config_for_kind() {
        let config = DependencyConfig {
            npm: Some(KindDependencies::default()),
            cargo: None,
        };
        assert!(config.for_kind(Kind::Npm).is_some());
        assert!(config.for_kind(Kind::Cargo).is_none());
        assert!(config.validate().is_ok());
    }
}
