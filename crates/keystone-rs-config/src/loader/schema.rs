//! Shape checks shared by the category handlers.

use crate::ConfigError;
use crate::value::{ConfigMap, ConfigValue};
use std::path::Path;

/// Require a map value for an entry.
pub fn expect_map<'a>(
    value: &'a ConfigValue,
    file: &Path,
    path: &str,
) -> Result<&'a ConfigMap, ConfigError> {
    value
        .as_map()
        .ok_or_else(|| ConfigError::parse(file, format!("specifies \"{path}\" which must be a mapping")))
}

/// Require an optional value to be a map when present; a missing value is empty.
pub fn optional_map(
    value: Option<&ConfigValue>,
    file: &Path,
    path: &str,
) -> Result<ConfigMap, ConfigError> {
    match value {
        None | Some(ConfigValue::Null) => Ok(ConfigMap::new()),
        Some(value) => expect_map(value, file, path).cloned(),
    }
}

/// Require a string `class` key for a category entry.
pub fn require_class(
    entry: &ConfigMap,
    file: &Path,
    category: &str,
) -> Result<String, ConfigError> {
    match entry.get("class") {
        Some(ConfigValue::String(class)) if !class.is_empty() => Ok(class.clone()),
        _ => Err(ConfigError::parse(
            file,
            format!("specifies category \"{category}\" with missing class key"),
        )),
    }
}

/// Validate an optional `file` key that must point to a readable file.
pub fn readable_file(
    entry: &ConfigMap,
    file: &Path,
    class: &str,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = entry.get("file") else {
        return Ok(None);
    };
    let Some(include) = value.as_str() else {
        return Err(ConfigError::parse(
            file,
            format!("specifies class \"{class}\" with a non-string file"),
        ));
    };
    if std::fs::File::open(include).is_err() {
        return Err(ConfigError::parse(
            file,
            format!("specifies class \"{class}\" with nonexistent or unreadable file \"{include}\""),
        ));
    }
    Ok(Some(include.to_string()))
}

/// Promote a scalar to a one-element list; null becomes empty.
pub fn to_list(value: Option<&ConfigValue>) -> Vec<ConfigValue> {
    match value {
        None | Some(ConfigValue::Null) => Vec::new(),
        Some(ConfigValue::List(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}
