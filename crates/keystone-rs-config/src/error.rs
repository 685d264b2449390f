//! Error types for config parsing, compilation and artifact caching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading, merging or compiling config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source does not exist or cannot be read.
    #[error("configuration file \"{}\" does not exist or is not readable", path.display())]
    NotFound { path: PathBuf },
    /// A configuration source is malformed or violates its category contract.
    #[error("configuration file \"{}\" {message}", file.display())]
    Parse { file: PathBuf, message: String },
    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serializing or deserializing an artifact failed.
    #[error("failed to decode artifact: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A compiled artifact does not have the expected shape.
    #[error("invalid artifact \"{}\": {message}", path.display())]
    Artifact { path: PathBuf, message: String },
    /// A specific value failed validation.
    #[error("invalid config at {path}: {message}")]
    Invalid { path: String, message: String },
}

impl ConfigError {
    /// Build a parse error attached to a source file.
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}
