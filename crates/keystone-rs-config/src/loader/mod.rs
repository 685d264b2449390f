//! YAML parsing and environment-layered merging.
//!
//! Config files are mappings keyed by environment (`default`, `all`, `<env>`).
//! Files are parsed in order and deep merged; handlers then flatten the
//! environment layers they care about.

mod merge;
pub(crate) mod schema;


pub use merge::{deep_merge, deep_merge_maps, merge_all};

use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use log::debug;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Layer merged before every other layer.
pub const DEFAULT_LAYER: &str = "default";
/// Layer shared by every environment.
pub const ALL_LAYER: &str = "all";

/// Parse a single YAML config file into an ordered map.
///
/// An empty document yields an empty map.
pub fn parse_yaml(path: impl AsRef<Path>) -> Result<ConfigMap, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
        path: path.to_path_buf(),
    })?;
    debug!(
        "parsing config file (path={}, len={})",
        path.display(),
        contents.len()
    );
    parse_yaml_str(&contents, path)
}

/// Parse YAML contents attributed to `file`.
pub fn parse_yaml_str(contents: &str, file: &Path) -> Result<ConfigMap, ConfigError> {
    let raw: serde_yaml::Value = serde_yaml::from_str(contents)
        .map_err(|err| ConfigError::parse(file, format!("could not be parsed: {err}")))?;
    let value = ConfigValue::from_yaml(raw)
        .map_err(|err| ConfigError::parse(file, format!("could not be parsed: {err}")))?;
    match value {
        ConfigValue::Null => Ok(ConfigMap::new()),
        ConfigValue::Map(map) => Ok(map),
        _ => Err(ConfigError::parse(file, "must contain a mapping")),
    }
}

/// Parse every file in order and deep merge them.
///
/// Top-level keys with a null value are dropped before merging so an empty
/// environment section never erases an earlier one.
pub fn parse_yamls<P: AsRef<Path>>(
    files: impl IntoIterator<Item = P>,
) -> Result<ConfigMap, ConfigError> {
    let mut config = ConfigMap::new();
    for file in files {
        let mut values = parse_yaml(file)?;
        values.retain(|_, value| !value.is_null());
        deep_merge_maps(&mut config, &values);
    }
    Ok(config)
}

/// Merge `default` into `all` and drop `default`; other layers stay untouched.
pub fn flatten_configuration(mut config: ConfigMap) -> ConfigMap {
    let default = layer(&config, DEFAULT_LAYER);
    let all = layer(&config, ALL_LAYER);
    let merged = merge_all([&default, &all]);
    config.shift_remove(DEFAULT_LAYER);
    config.insert(ALL_LAYER.to_string(), ConfigValue::Map(merged));
    config
}

/// Merge `default`, `all` and `environment` layers, in that order.
///
/// Missing or non-map layers count as empty.
pub fn flatten_with_environment(config: &ConfigMap, environment: &str) -> ConfigMap {
    let default = layer(config, DEFAULT_LAYER);
    let all = layer(config, ALL_LAYER);
    let env = layer(config, environment);
    merge_all([&default, &all, &env])
}

fn layer(config: &ConfigMap, name: &str) -> ConfigMap {
    config
        .get(name)
        .and_then(ConfigValue::as_map)
        .cloned()
        .unwrap_or_default()
}

fn constant_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"%([^%\s]+)%").ok())
        .as_ref()
}

/// Replace `%name%` tokens in every string value with the matching setting.
///
/// A string made of a single token takes the setting's value as is, keeping
/// its type. Unknown tokens are left in place.
pub fn replace_constants(value: &ConfigValue, settings: &Settings) -> ConfigValue {
    match value {
        ConfigValue::String(text) => replace_constants_str(text, settings),
        ConfigValue::List(items) => ConfigValue::List(
            items
                .iter()
                .map(|item| replace_constants(item, settings))
                .collect(),
        ),
        ConfigValue::Map(map) => ConfigValue::Map(replace_constants_map(map, settings)),
        other => other.clone(),
    }
}

/// Map variant of [`replace_constants`].
pub fn replace_constants_map(map: &ConfigMap, settings: &Settings) -> ConfigMap {
    map.iter()
        .map(|(key, value)| (key.clone(), replace_constants(value, settings)))
        .collect()
}

fn replace_constants_str(text: &str, settings: &Settings) -> ConfigValue {
    let Some(pattern) = constant_pattern() else {
        return ConfigValue::String(text.to_string());
    };
    if let Some(captures) = pattern.captures(text) {
        if captures.get(0).map(|m| m.as_str().len()) == Some(text.len()) {
            if let Some(value) = settings.get(&captures[1]) {
                return value.clone();
            }
        }
    }
    let replaced = pattern.replace_all(text, |captures: &Captures<'_>| {
        settings
            .get(&captures[1])
            .map(ConfigValue::to_plain_string)
            .unwrap_or_else(|| captures[0].to_string())
    });
    ConfigValue::String(replaced.into_owned())
}

/// Resolve a relative path against the project root directory.
pub fn replace_path(path: &str, settings: &Settings) -> String {
    if Path::new(path).is_absolute() {
        return path.to_string();
    }
    settings.root_dir().join(path).to_string_lossy().into_owned()
}

/// Read `key` from `category`, falling back to `all` then to `default`.
pub fn get_config_value(
    config: &ConfigMap,
    key: &str,
    category: &str,
    default: Option<ConfigValue>,
) -> Option<ConfigValue> {
    let lookup = |layer: &str| {
        config
            .get(layer)
            .and_then(|value| value.pointer(&[key]))
            .filter(|value| !value.is_null())
            .cloned()
    };
    lookup(category).or_else(|| lookup(ALL_LAYER)).or(default)
}

/// Combine the collection values of `key` under `all` and `category`.
///
/// Lists are concatenated and maps are overlaid shallowly, `category` last.
/// Non-collection values are ignored.
pub fn merge_config_value(config: &ConfigMap, key: &str, category: &str) -> ConfigValue {
    let lookup = |layer: &str| {
        config
            .get(layer)
            .and_then(|value| value.pointer(&[key]))
            .filter(|value| !value.is_scalar())
            .cloned()
    };
    let base = lookup(ALL_LAYER);
    let overlay = if category.is_empty() {
        None
    } else {
        lookup(category)
    };
    match (base, overlay) {
        (None, None) => ConfigValue::List(Vec::new()),
        (Some(value), None) | (None, Some(value)) => value,
        (Some(ConfigValue::List(mut base)), Some(ConfigValue::List(overlay))) => {
            base.extend(overlay);
            ConfigValue::List(base)
        }
        (Some(ConfigValue::Map(mut base)), Some(ConfigValue::Map(overlay))) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            ConfigValue::Map(base)
        }
        (Some(_), Some(overlay)) => overlay,
    }
}
