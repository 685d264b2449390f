use keystone_rs_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a [`crate::ClassLoader`] while loading a file.
pub type LoadFailure = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AutoloadError {
    #[error("class \"{class}\" is not in the autoload table")]
    ClassNotFound { class: String },
    #[error("failed to load class \"{class}\" from {}: {source}", file.display())]
    Load {
        class: String,
        file: PathBuf,
        #[source]
        source: LoadFailure,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
