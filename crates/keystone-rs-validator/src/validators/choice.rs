use crate::base::{BaseOptions, Validator, base_setters};
use crate::error::{ValidationError, ValidatorError};
use serde_json::Value;

/// Accepts one of a fixed set of values, or a list of them when `multiple`.
///
/// Values compare as text, so `1` matches the choice `"1"`.
#[derive(Debug, Clone)]
pub struct ChoiceValidator {
    base: BaseOptions,
    choices: Vec<Value>,
    multiple: bool,
    min: Option<usize>,
    max: Option<usize>,
}

impl ChoiceValidator {
    pub fn new(choices: Vec<Value>) -> Self {
        let mut base = BaseOptions::default();
        base.add_message("min", "At least %min% values must be selected (%count% values selected).");
        base.add_message("max", "At most %max% values must be selected (%count% values selected).");
        Self {
            base,
            choices,
            multiple: false,
            min: None,
            max: None,
        }
    }

    base_setters!();

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Selection bounds, only checked when `multiple`.
    pub fn selection(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn is_choice(&self, value: &Value) -> bool {
        let needle = as_key(value);
        self.choices.iter().any(|choice| as_key(choice) == needle)
    }
}

fn as_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Validator for ChoiceValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        if !self.multiple {
            if !self.is_choice(value) {
                return Err(self.base.error("invalid").with_value(value).into());
            }
            return Ok(value.clone());
        }

        let selected = match value {
            Value::Array(items) => items.clone(),
            single => vec![single.clone()],
        };
        if let Some(invalid) = selected.iter().find(|item| !self.is_choice(item)) {
            return Err(self.base.error("invalid").with_value(invalid).into());
        }
        let count = selected.len();
        let bound = |code: &str, limit: usize| -> ValidationError {
            ValidatorError::new(code, self.base.message(code))
                .with_argument(code, limit.to_string())
                .with_argument("count", count.to_string())
                .into()
        };
        if let Some(min) = self.min.filter(|min| count < *min) {
            return Err(bound("min", min));
        }
        if let Some(max) = self.max.filter(|max| count > *max) {
            return Err(bound("max", max));
        }
        Ok(Value::Array(selected))
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}
