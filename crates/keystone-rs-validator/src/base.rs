//! Validator contract and the options every validator shares.

use crate::error::{ValidationError, ValidatorError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Debug;

/// Options and messages common to all validators.
///
/// * `required` (default true): empty input fails with `required`
/// * `trim` (default false): strip surrounding whitespace from strings first
/// * `empty_value` (default null): returned for empty, optional input
#[derive(Debug, Clone, PartialEq)]
pub struct BaseOptions {
    pub required: bool,
    pub trim: bool,
    pub empty_value: Value,
    messages: IndexMap<String, String>,
}

impl Default for BaseOptions {
    fn default() -> Self {
        let mut messages = IndexMap::new();
        messages.insert("required".to_string(), "Required.".to_string());
        messages.insert("invalid".to_string(), "Invalid.".to_string());
        Self {
            required: true,
            trim: false,
            empty_value: Value::Null,
            messages,
        }
    }
}

impl BaseOptions {
    /// Register a default message for a code; an existing override stays.
    pub fn add_message(&mut self, code: &str, template: &str) {
        self.messages
            .entry(code.to_string())
            .or_insert_with(|| template.to_string());
    }

    /// Replace the message used for a code.
    pub fn set_message(&mut self, code: &str, template: &str) {
        self.messages.insert(code.to_string(), template.to_string());
    }

    pub fn message<'a>(&'a self, code: &'a str) -> &'a str {
        self.messages.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn messages(&self) -> &IndexMap<String, String> {
        &self.messages
    }

    /// Error for `code` using the configured message.
    pub fn error(&self, code: &str) -> ValidatorError {
        ValidatorError::new(code, self.message(code))
    }
}

/// Length or range limits that a replacement validator may inherit.
#[derive(Debug, Clone, PartialEq)]
pub enum Limits {
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
}

/// A value cleaner.
pub trait Validator: Send + Sync + Debug {
    fn options(&self) -> &BaseOptions;

    fn options_mut(&mut self) -> &mut BaseOptions;

    /// Validator-specific cleaning of a non-empty value.
    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Trim, apply `required`/`empty_value`, then [`Validator::do_clean`].
    fn clean(&self, value: &Value) -> Result<Value, ValidationError> {
        let options = self.options();
        let trimmed;
        let value = match value {
            Value::String(text) if options.trim => {
                trimmed = Value::String(text.trim().to_string());
                &trimmed
            }
            other => other,
        };
        if is_empty(value) {
            if options.required {
                return Err(options.error("required").into());
            }
            return Ok(options.empty_value.clone());
        }
        self.do_clean(value)
    }

    /// Limits carried by this validator, if any.
    fn limits(&self) -> Option<Limits> {
        None
    }

    /// Fill unset limits from a replaced validator; `true` when applied.
    fn inherit_limits(&mut self, _limits: &Limits) -> bool {
        false
    }

    fn boxed_clone(&self) -> Box<dyn Validator>;
}

impl Clone for Box<dyn Validator> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Null, an empty string and an empty array or object count as empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Setters shared by all validators.
macro_rules! base_setters {
    () => {
        pub fn required(mut self, required: bool) -> Self {
            self.base.required = required;
            self
        }

        pub fn trim(mut self, trim: bool) -> Self {
            self.base.trim = trim;
            self
        }

        pub fn empty_value(mut self, value: serde_json::Value) -> Self {
            self.base.empty_value = value;
            self
        }

        pub fn message(mut self, code: &str, template: &str) -> Self {
            self.base.set_message(code, template);
            self
        }
    };
}

pub(crate) use base_setters;
