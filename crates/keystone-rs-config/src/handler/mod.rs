//! Per-category configuration handlers.
//!
//! A handler turns the merged YAML of one configuration category into an
//! [`ArtifactBody`] that the config cache stores and callers replay.

mod autoload;
mod cache;
mod database;
mod factory;
mod filter;
mod view;

pub use autoload::AutoloadConfigHandler;
pub use cache::CacheConfigHandler;
pub use database::DatabaseConfigHandler;
pub use factory::{FactoryConfigHandler, RoleRule, RoleSpec, default_roles};
pub use filter::FilterConfigHandler;
pub use view::ViewConfigHandler;

use crate::artifact::ArtifactBody;
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Compiler for one configuration category.
pub trait ConfigHandler: Send + Sync {
    /// Handler name recorded in artifact stamps.
    fn name(&self) -> &str;

    /// Category handled (e.g. `factories`).
    fn category(&self) -> &str;

    /// Compile the given source files.
    fn execute(&self, files: &ConfigFileSet, settings: &Settings)
    -> Result<ArtifactBody, ConfigError>;
}

/// First source file, used to attribute errors.
pub(crate) fn first_file(files: &ConfigFileSet) -> PathBuf {
    files
        .first()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
