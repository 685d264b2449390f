//! Validation errors and their aggregation.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// One failed check: an error code, its message template and the
/// arguments substituted into `%name%` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorError {
    code: String,
    template: String,
    arguments: IndexMap<String, String>,
}

impl ValidatorError {
    pub fn new(code: &str, template: &str) -> Self {
        Self {
            code: code.to_string(),
            template: template.to_string(),
            arguments: IndexMap::new(),
        }
    }

    pub fn with_argument(mut self, name: &str, value: impl Into<String>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }

    /// Attach the offending value as `%value%`.
    pub fn with_value(self, value: &Value) -> Self {
        self.with_argument("value", display_value(value))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn arguments(&self) -> &IndexMap<String, String> {
        &self.arguments
    }

    /// Template with every known placeholder replaced.
    pub fn message(&self) -> String {
        let mut message = self.template.clone();
        for (name, value) in &self.arguments {
            message = message.replace(&format!("%{name}%"), value);
        }
        message
    }
}

impl fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidatorError {}

/// Render a value the way it is shown inside messages.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(value) => value.clone(),
        Value::Array(_) => "Array".to_string(),
        Value::Object(_) => "Object".to_string(),
        other => other.to_string(),
    }
}

/// Errors of one `clean()` call: global errors plus errors per field.
///
/// Field entries are either a single error or a nested schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorSchema {
    global: Vec<ValidatorError>,
    named: IndexMap<String, ValidationError>,
}

impl ErrorSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error, globally when `name` is `None`.
    ///
    /// A nested schema without a name is merged in place. Several errors for
    /// the same field are grouped into a nested schema.
    pub fn add(&mut self, error: ValidationError, name: Option<&str>) {
        let Some(name) = name else {
            match error {
                ValidationError::Error(error) => self.global.push(error),
                ValidationError::Schema(schema) => self.merge(schema),
            }
            return;
        };

        match self.named.get_mut(name) {
            None => {
                self.named.insert(name.to_string(), error);
            }
            Some(ValidationError::Schema(existing)) => existing.add(error, None),
            Some(existing) => {
                let mut grouped = ErrorSchema::new();
                grouped.add(existing.clone(), None);
                grouped.add(error, None);
                *existing = ValidationError::Schema(grouped);
            }
        }
    }

    pub fn add_error(&mut self, error: ValidatorError) {
        self.global.push(error);
    }

    /// Merge another schema: global errors stay global, field errors are
    /// added under their names.
    pub fn merge(&mut self, other: ErrorSchema) {
        self.global.extend(other.global);
        for (name, error) in other.named {
            self.add(error, Some(&name));
        }
    }

    pub fn global_errors(&self) -> &[ValidatorError] {
        &self.global
    }

    pub fn named_errors(&self) -> &IndexMap<String, ValidationError> {
        &self.named
    }

    pub fn get(&self, name: &str) -> Option<&ValidationError> {
        self.named.get(name)
    }

    /// Number of global errors plus failed fields.
    pub fn len(&self) -> usize {
        self.global.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every message with its field path (`""` for global errors,
    /// `address[city]` for nested fields).
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for error in &self.global {
            out.push((prefix.to_string(), error.message()));
        }
        for (name, error) in &self.named {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}[{name}]")
            };
            match error {
                ValidationError::Error(error) => out.push((path, error.message())),
                ValidationError::Schema(schema) => schema.flatten_into(&path, out),
            }
        }
    }
}

impl fmt::Display for ErrorSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.global.iter().map(ValidatorError::message).collect();
        for (name, error) in &self.named {
            parts.push(format!("{name} [{error}]"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

impl std::error::Error for ErrorSchema {}

/// Failure of a validator: a single error or an aggregate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Error(#[from] ValidatorError),
    #[error(transparent)]
    Schema(#[from] ErrorSchema),
}

impl ValidationError {
    /// Code of a single error; `None` for aggregates.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Error(error) => Some(error.code()),
            Self::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&ErrorSchema> {
        match self {
            Self::Schema(schema) => Some(schema),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replaces_placeholders() {
        let error = ValidatorError::new("extra_fields", "Unexpected extra form field named \"%field%\".")
            .with_argument("field", "foo");
        assert_eq!(error.message(), "Unexpected extra form field named \"foo\".");
        assert_eq!(error.to_string(), error.message());
    }

    #[test]
    fn groups_repeated_field_errors() {
        let mut schema = ErrorSchema::new();
        schema.add(ValidatorError::new("required", "Required.").into(), Some("name"));
        schema.add(ValidatorError::new("invalid", "Invalid.").into(), Some("name"));
        schema.add(ValidatorError::new("invalid", "Broken.").into(), None);
        assert_eq!(schema.len(), 2);
        assert_eq!(
            schema.flatten(),
            vec![
                (String::new(), "Broken.".to_string()),
                ("name".to_string(), "Required.".to_string()),
                ("name".to_string(), "Invalid.".to_string()),
            ]
        );
        assert_eq!(schema.to_string(), "Broken. name [Required. Invalid.]");
    }

    #[test]
    fn flattens_nested_paths() {
        let mut inner = ErrorSchema::new();
        inner.add(ValidatorError::new("required", "Required.").into(), Some("city"));
        let mut outer = ErrorSchema::new();
        outer.add(inner.into(), Some("address"));
        assert_eq!(
            outer.flatten(),
            vec![("address[city]".to_string(), "Required.".to_string())]
        );
    }
}
