//! Project settings bag used during compilation.
//!
//! Settings hold the values that configuration files may reference through
//! `%name%` constants (root dir, environment, application, ...).

use crate::value::{ConfigMap, ConfigValue};
use std::path::{Path, PathBuf};

/// Setting holding the project root directory.
pub const ROOT_DIR: &str = "sf_root_dir";
/// Setting holding the active environment name.
pub const ENVIRONMENT: &str = "sf_environment";
/// Setting holding the active application name.
pub const APP: &str = "sf_app";
/// Setting holding the cache directory.
pub const CACHE_DIR: &str = "sf_cache_dir";

/// Default environment when none is configured.
const DEFAULT_ENVIRONMENT: &str = "prod";

/// Case-insensitive settings bag with well-known project locations.
#[derive(Debug, Clone)]
pub struct Settings {
    values: ConfigMap,
}

impl Settings {
    /// Create settings rooted at `root_dir` for the given environment.
    pub fn new(root_dir: impl AsRef<Path>, environment: &str) -> Self {
        let root_dir = root_dir.as_ref().to_path_buf();
        let mut settings = Self {
            values: ConfigMap::new(),
        };
        settings.set(CACHE_DIR, root_dir.join("cache").to_string_lossy().as_ref());
        settings.set(ROOT_DIR, root_dir.to_string_lossy().as_ref());
        settings.set(ENVIRONMENT, environment);
        settings
    }

    /// Set the active application.
    pub fn with_app(mut self, app: &str) -> Self {
        self.set(APP, app);
        self
    }

    /// Override the cache directory.
    pub fn with_cache_dir(mut self, cache_dir: impl AsRef<Path>) -> Self {
        self.set(CACHE_DIR, cache_dir.as_ref().to_string_lossy().as_ref());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ConfigValue>) {
        self.values.insert(name.to_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(&name.to_lowercase())
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    /// Typed string lookup, `None` for missing or non-string settings.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ConfigValue::as_str)
    }

    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(self.get_str(ROOT_DIR).unwrap_or("."))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.get_str(CACHE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.root_dir().join("cache"))
    }

    pub fn environment(&self) -> &str {
        self.get_str(ENVIRONMENT).unwrap_or(DEFAULT_ENVIRONMENT)
    }

    pub fn app(&self) -> Option<&str> {
        self.get_str(APP)
    }

    /// Merge settings from a config map, lowercasing keys.
    pub fn add(&mut self, values: &ConfigMap) {
        for (key, value) in values {
            self.set(key, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::ConfigValue;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn names_are_case_insensitive() {
        let mut settings = Settings::new("/srv/app", "dev");
        settings.set("SF_CUSTOM", "value");
        assert_eq!(settings.get_str("sf_custom"), Some("value"));
        assert_eq!(settings.get("Sf_Environment"), Some(&ConfigValue::from("dev")));
    }

    #[test]
    fn derives_default_locations() {
        let settings = Settings::new("/srv/app", "dev").with_app("frontend");
        assert_eq!(settings.root_dir(), PathBuf::from("/srv/app"));
        assert_eq!(settings.cache_dir(), PathBuf::from("/srv/app/cache"));
        assert_eq!(settings.app(), Some("frontend"));
    }
}
