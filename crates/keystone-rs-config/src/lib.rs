//! Configuration parsing, per-category compilation and artifact caching.
//!
//! YAML sources are merged across environments and configuration roots,
//! compiled by category handlers into typed artifacts, and cached on disk
//! until one of their sources changes.

mod artifact;
mod cache;
mod error;
pub mod handler;
pub mod loader;
mod locator;
mod settings;
mod value;

/// Compiled artifacts and the registrations they carry.
pub use artifact::{
    Artifact, ArtifactBody, ArtifactHeader, AssetKind, AssetRegistration, AutoloadSection,
    CachePolicy, ComponentSpec, DatabaseRegistration, FactoryRegistration, FilterRegistration,
    Registration, RegistrationContext, ViewRegistration,
};
pub use cache::ConfigCache;
/// Public error type returned by config loading and compilation APIs.
pub use error::ConfigError;
pub use handler::{
    AutoloadConfigHandler, CacheConfigHandler, ConfigHandler, DatabaseConfigHandler,
    FactoryConfigHandler, FilterConfigHandler, RoleRule, RoleSpec, ViewConfigHandler,
};
pub use loader::{
    deep_merge, flatten_configuration, flatten_with_environment, get_config_value,
    merge_config_value, parse_yaml, parse_yaml_str, parse_yamls, replace_constants,
    replace_constants_map, replace_path,
};
pub use locator::{ConfigFileSet, ConfigLocator, ConfigRoot, ConfigRootKind};
pub use settings::Settings;
pub use value::{ConfigMap, ConfigValue};

/// Well-known setting names.
pub mod settings_keys {
    pub use crate::settings::{APP, CACHE_DIR, ENVIRONMENT, ROOT_DIR};
}
