//! depush - dependency version propagation library
//!
//! This library provides the core functionality for pushing dependency
//! versions from source checkouts into a fleet of repositories:
//! - Repository resolution (GitHub organisations and explicit git remotes)
//! - Working copy sync through git
//! - Manifest rewriting for npm (package.json) and Cargo (Cargo.toml)
//! - Validation against each repository's resolved dependency tree

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod repository;
pub mod updater;
pub mod validate;
