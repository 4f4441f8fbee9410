//! Core domain models for depush
//!
//! This module contains the fundamental types used throughout the application:
//! - Ecosystem kinds and dependency classifications
//! - Candidate version changes extracted from source repositories
//! - Include/exclude name filters and per-kind dependency sets

mod change;
mod filter;
mod kind;

pub use change::DependencyVersionChange;
pub use filter::{DependencyConfig, DependencySet, KindDependencies, NameFilter};
pub use kind::{Classification, Kind};
