//! Validation of a mapping of named fields.

use crate::base::{BaseOptions, Validator, base_setters};
use crate::error::{ErrorSchema, ValidationError, ValidatorError};
use indexmap::IndexMap;
use log::debug;
use serde_json::{Map, Value};

/// Parse a size such as `8M`, `512k` or `1g` into bytes (powers of 1024).
///
/// A leading number without suffix is bytes; text without a leading number
/// is `0`.
pub fn parse_size(value: &str) -> f64 {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|(index, ch)| !(ch.is_ascii_digit() || *ch == '.' || (*index == 0 && (*ch == '-' || *ch == '+'))))
        .map(|(index, _)| index)
        .unwrap_or(value.len());
    let number: f64 = value[..end].parse().unwrap_or(0.0);
    let exponent = match value.chars().last().map(|ch| ch.to_ascii_lowercase()) {
        Some('k') => 1,
        Some('m') => 2,
        Some('g') => 3,
        _ => 0,
    };
    number * 1024f64.powi(exponent)
}

/// Ordered field validators with optional pre and post validators.
///
/// `clean` is total over the declared fields: every field yields a cleaned
/// value or an error, and all errors are returned together.
#[derive(Debug, Clone)]
pub struct ValidatorSchema {
    base: BaseOptions,
    fields: IndexMap<String, Box<dyn Validator>>,
    pre_validator: Option<Box<dyn Validator>>,
    post_validator: Option<Box<dyn Validator>>,
    allow_extra_fields: bool,
    filter_extra_fields: bool,
    post_max_size: Option<String>,
}

impl Default for ValidatorSchema {
    fn default() -> Self {
        let mut base = BaseOptions::default();
        base.add_message("extra_fields", "Unexpected extra form field named \"%field%\".");
        base.add_message(
            "post_max_size",
            "The form submission cannot be processed. It probably means that you have uploaded a file that is too big.",
        );
        Self {
            base,
            fields: IndexMap::new(),
            pre_validator: None,
            post_validator: None,
            allow_extra_fields: false,
            filter_extra_fields: true,
            post_max_size: None,
        }
    }
}

impl ValidatorSchema {
    pub fn new() -> Self {
        Self::default()
    }

    base_setters!();

    pub fn with_field(mut self, name: &str, validator: impl Validator + 'static) -> Self {
        self.set_field(name, Box::new(validator));
        self
    }

    /// Set a field validator.
    ///
    /// When a string or number validator is replaced, length or range limits
    /// the new validator leaves unset are copied from the old one.
    pub fn set_field(&mut self, name: &str, mut validator: Box<dyn Validator>) {
        if let Some(limits) = self.fields.get(name).and_then(|previous| previous.limits()) {
            if validator.inherit_limits(&limits) {
                debug!("inherited validator limits (field={name}, limits={limits:?})");
            }
        }
        self.fields.insert(name.to_string(), validator);
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Box<dyn Validator>> {
        self.fields.shift_remove(name)
    }

    pub fn field(&self, name: &str) -> Option<&dyn Validator> {
        self.fields.get(name).map(|validator| &**validator)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &dyn Validator)> {
        self.fields
            .iter()
            .map(|(name, validator)| (name.as_str(), &**validator))
    }

    pub fn pre_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.pre_validator = Some(Box::new(validator));
        self
    }

    pub fn post_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.post_validator = Some(Box::new(validator));
        self
    }

    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = allow;
        self
    }

    pub fn filter_extra_fields(mut self, filter: bool) -> Self {
        self.filter_extra_fields = filter;
        self
    }

    /// Maximum request body size, e.g. `8M`; `0` disables the check.
    pub fn post_max_size(mut self, size: &str) -> Self {
        self.post_max_size = Some(size.to_string());
        self
    }

    /// Clean `values` for a request whose body is `content_length` bytes.
    ///
    /// An oversized request fails with a single `post_max_size` error and
    /// no field is validated.
    pub fn clean_request(
        &self,
        values: &Value,
        content_length: Option<u64>,
    ) -> Result<Value, ValidationError> {
        if let (Some(length), Some(limit)) = (content_length, self.post_max_size.as_deref()) {
            let limit = parse_size(limit);
            if limit != 0.0 && length as f64 > limit {
                debug!("request exceeds post_max_size (length={length}, limit={limit})");
                let mut errors = ErrorSchema::new();
                errors.add_error(self.base.error("post_max_size"));
                return Err(errors.into());
            }
        }
        self.clean_values(values)
    }

    fn clean_values(&self, values: &Value) -> Result<Value, ValidationError> {
        let mut errors = ErrorSchema::new();
        let mut values = match values {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => values.clone(),
            other => {
                errors.add_error(self.base.error("invalid").with_value(other));
                return Err(errors.into());
            }
        };

        if let Some(pre) = &self.pre_validator {
            match pre.clean(&values) {
                Ok(cleaned @ Value::Object(_)) => values = cleaned,
                Ok(_) => {}
                Err(error) => errors.add(error, None),
            }
        }

        let mut clean = Map::new();
        let input = values.as_object().cloned().unwrap_or_default();
        for (name, validator) in &self.fields {
            let value = input.get(name).unwrap_or(&Value::Null);
            self.clean_field(name, &**validator, value, &mut clean, &mut errors);
        }

        for (name, value) in input.iter().filter(|(name, _)| !self.fields.contains_key(*name)) {
            if !self.allow_extra_fields {
                errors.add_error(
                    ValidatorError::new("extra_fields", self.base.message("extra_fields"))
                        .with_argument("field", name.as_str()),
                );
            } else if !self.filter_extra_fields {
                clean.insert(name.clone(), value.clone());
            }
        }

        let mut clean = Value::Object(clean);
        if let Some(post) = &self.post_validator {
            match post.clean(&clean) {
                Ok(cleaned) => clean = cleaned,
                Err(error) => errors.add(error, None),
            }
        }

        if errors.is_empty() {
            Ok(clean)
        } else {
            debug!("schema validation failed (errors={})", errors.len());
            Err(errors.into())
        }
    }

    fn clean_field(
        &self,
        name: &str,
        validator: &dyn Validator,
        value: &Value,
        clean: &mut Map<String, Value>,
        errors: &mut ErrorSchema,
    ) {
        match validator.clean(value) {
            Ok(value) => {
                clean.insert(name.to_string(), value);
            }
            Err(error) => {
                clean.insert(name.to_string(), Value::Null);
                errors.add(error, Some(name));
            }
        }
    }
}

impl Validator for ValidatorSchema {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, values: &Value) -> Result<Value, ValidationError> {
        self.clean_values(values)
    }

    /// Schemas skip the required check: absent input is an empty mapping.
    fn clean(&self, values: &Value) -> Result<Value, ValidationError> {
        self.clean_values(values)
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("8M"), 8.0 * 1024.0 * 1024.0);
        assert_eq!(parse_size(" 512k "), 512.0 * 1024.0);
        assert_eq!(parse_size("1G"), 1024.0 * 1024.0 * 1024.0);
        assert_eq!(parse_size("100"), 100.0);
        assert_eq!(parse_size("0"), 0.0);
        assert_eq!(parse_size("abc"), 0.0);
    }
}
