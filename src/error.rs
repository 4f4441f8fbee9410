//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Issues loading the project configuration
//! - ManifestError: Issues reading, parsing or writing manifest files
//! - DirectoryError: Issues talking to the repository hosting service
//! - ProcessError: Failures spawning external tools

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to the project configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be found by path or URL
    #[error("project configuration not found: {location}")]
    NotFound { location: String },

    /// Failed to read the configuration file
    #[error("failed to read project configuration {location}: {message}")]
    ReadError { location: String, message: String },

    /// TOML parsing error
    #[error("failed to parse project configuration {location}: {message}")]
    ParseError { location: String, message: String },

    /// Invalid include/exclude pattern
    #[error("invalid name pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Unknown ecosystem kind
    #[error("unknown kind '{value}': expected 'npm' or 'cargo'")]
    UnknownKind { value: String },
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error (for package.json)
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// TOML parsing error (for Cargo.toml)
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParseError { path: PathBuf, message: String },
}

/// Errors related to the repository hosting service
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Organisation or user not found
    #[error("organisation or user '{owner}' not found on {service}")]
    OwnerNotFound { owner: String, service: String },

    /// Network request failed
    #[error("request to {service} failed for '{target}': {message}")]
    NetworkError {
        target: String,
        service: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {service}")]
    RateLimitExceeded { service: String },

    /// Invalid response from the service
    #[error("invalid response from {service} for '{target}': {message}")]
    InvalidResponse {
        target: String,
        service: String,
        message: String,
    },
}

/// Errors related to running external tools
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started
    #[error("failed to run '{command}' in {dir}: {source}")]
    SpawnFailed {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The program exited with a non-zero status and produced nothing usable
    #[error("'{command}' exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The program output could not be interpreted
    #[error("unexpected output from '{command}': {message}")]
    InvalidOutput { command: String, message: String },

    /// Failed to write a file derived from the program output
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Empty command line
    #[error("empty command")]
    EmptyCommand,
}

impl ConfigError {
    /// Creates a new NotFound error
    pub fn not_found(location: impl Into<String>) -> Self {
        ConfigError::NotFound {
            location: location.into(),
        }
    }

    /// Creates a new ReadError
    pub fn read_error(location: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ReadError {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Creates a new ParseError
    pub fn parse_error(location: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new TomlParseError
    pub fn toml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::TomlParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl DirectoryError {
    /// Creates a new NetworkError
    pub fn network_error(
        target: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DirectoryError::NetworkError {
            target: target.into(),
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        target: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DirectoryError::InvalidResponse {
            target: target.into(),
            service: service.into(),
            message: message.into(),
        }
    }
}
