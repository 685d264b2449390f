//! Generic tagged value used for merged configuration trees.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping of configuration keys to values.
pub type ConfigMap = IndexMap<String, ConfigValue>;

/// A configuration value: a scalar, a list or an ordered map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigValue {
    /// Convert a parsed YAML value, stringifying non-string keys.
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self, String> {
        use serde_yaml::Value as Yaml;
        Ok(match value {
            Yaml::Null => Self::Null,
            Yaml::Bool(value) => Self::Bool(value),
            Yaml::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Self::Integer(value)
                } else if let Some(value) = number.as_f64() {
                    Self::Float(value)
                } else {
                    return Err(format!("unsupported number {number}"));
                }
            }
            Yaml::String(value) => Self::String(value),
            Yaml::Sequence(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(mapping) => {
                let mut map = ConfigMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    map.insert(yaml_key(key)?, Self::from_yaml(value)?);
                }
                Self::Map(map)
            }
            Yaml::Tagged(tagged) => return Err(format!("unsupported tag {}", tagged.tag)),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Loose truthiness used for flags such as `enabled` and `condition`.
    ///
    /// Null, `false`, `0`, `0.0`, `""`, `"0"` and empty collections are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::String(value) => !(value.is_empty() || value == "0"),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Look up a nested key through maps, e.g. `["param", "timeout"]`.
    pub fn pointer(&self, keys: &[&str]) -> Option<&ConfigValue> {
        let mut current = self;
        for key in keys {
            current = current.as_map()?.get(*key)?;
        }
        Some(current)
    }

    /// Render a scalar as plain text (used for constant substitution).
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "1".to_string(),
            Self::Bool(false) => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::String(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(key) => Ok(key),
        Yaml::Number(number) => Ok(number.to_string()),
        Yaml::Bool(value) => Ok(value.to_string()),
        Yaml::Null => Ok(String::new()),
        other => Err(format!("unsupported mapping key {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigMap, ConfigValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_yaml_preserving_order() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("b: 1\na: [true, 2.5, ~]\n3: x\n").expect("yaml");
        let value = ConfigValue::from_yaml(yaml).expect("value");
        let map = value.as_map().expect("map");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "3"]);
        assert_eq!(
            map["a"],
            ConfigValue::List(vec![
                ConfigValue::Bool(true),
                ConfigValue::Float(2.5),
                ConfigValue::Null
            ])
        );
    }

    #[test]
    fn truthiness_follows_loose_rules() {
        assert!(!ConfigValue::from("0").is_truthy());
        assert!(!ConfigValue::from("").is_truthy());
        assert!(!ConfigValue::Map(ConfigMap::new()).is_truthy());
        assert!(ConfigValue::from("off").is_truthy());
        assert!(ConfigValue::Integer(2).is_truthy());
    }

    #[test]
    fn pointer_walks_nested_maps() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("user:\n  param:\n    timeout: 1800\n").expect("yaml");
        let value = ConfigValue::from_yaml(yaml).expect("value");
        assert_eq!(
            value.pointer(&["user", "param", "timeout"]),
            Some(&ConfigValue::Integer(1800))
        );
        assert_eq!(value.pointer(&["user", "missing"]), None);
    }
}
