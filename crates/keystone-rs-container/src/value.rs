//! Values held by service definitions and the parameter bag.

use indexmap::IndexMap;
use keystone_rs_config::ConfigValue;
use std::fmt;

/// Id of the container itself.
pub const SERVICE_CONTAINER_ID: &str = "service_container";

/// Argument, call argument or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Reference to another service by id.
    Service(String),
    /// Reference to a container parameter by name.
    Parameter(String),
    /// A live host object; never representable in generated code.
    Opaque { type_name: String },
}

impl Value {
    pub fn service(id: &str) -> Self {
        Self::Service(id.to_lowercase())
    }

    pub fn parameter(name: &str) -> Self {
        Self::Parameter(name.to_lowercase())
    }

    pub fn opaque(type_name: &str) -> Self {
        Self::Opaque {
            type_name: type_name.to_string(),
        }
    }

    /// Convert configuration data; `@id` strings become service references
    /// and `@@` escapes a literal `@`.
    pub fn from_config(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Null => Self::Null,
            ConfigValue::Bool(value) => Self::Bool(*value),
            ConfigValue::Integer(value) => Self::Integer(*value),
            ConfigValue::Float(value) => Self::Float(*value),
            ConfigValue::String(value) => {
                if let Some(escaped) = value.strip_prefix("@@") {
                    Self::String(format!("@{escaped}"))
                } else if let Some(id) = value.strip_prefix('@') {
                    Self::service(id)
                } else {
                    Self::String(value.clone())
                }
            }
            ConfigValue::List(items) => Self::List(items.iter().map(Self::from_config).collect()),
            ConfigValue::Map(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_config(value)))
                    .collect(),
            ),
        }
    }

    /// Visit this value and every nested value.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Value)) {
        visit(self);
        match self {
            Self::List(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            Self::Map(map) => {
                for item in map.values() {
                    item.walk(visit);
                }
            }
            _ => {}
        }
    }

    /// Ids of every service referenced by this value.
    pub fn service_references(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.walk(&mut |value| {
            if let Self::Service(id) = value {
                ids.push(id.as_str());
            }
        });
        ids
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
            Self::List(_) => write!(f, "[list]"),
            Self::Map(_) => write!(f, "[map]"),
            Self::Service(id) => write!(f, "@{id}"),
            Self::Parameter(name) => write!(f, "%{name}%"),
            Self::Opaque { type_name } => write!(f, "<{type_name}>"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}
