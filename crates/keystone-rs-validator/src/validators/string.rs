use crate::base::{BaseOptions, Limits, Validator, base_setters};
use crate::error::{ValidationError, ValidatorError};
use serde_json::Value;

/// Accepts scalars as text, optionally bounded in length (in characters).
#[derive(Debug, Clone)]
pub struct StringValidator {
    base: BaseOptions,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Default for StringValidator {
    fn default() -> Self {
        let mut base = BaseOptions::default();
        base.add_message(
            "max_length",
            "\"%value%\" is too long (%max_length% characters max).",
        );
        base.add_message(
            "min_length",
            "\"%value%\" is too short (%min_length% characters min).",
        );
        Self {
            base,
            min_length: None,
            max_length: None,
        }
    }
}

impl StringValidator {
    pub fn new() -> Self {
        Self::default()
    }

    base_setters!();

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

impl Validator for StringValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            _ => return Err(self.base.error("invalid").with_value(value).into()),
        };
        let length = text.chars().count();
        if let Some(max) = self.max_length.filter(|max| length > *max) {
            return Err(too(&self.base, "max_length", &text, max));
        }
        if let Some(min) = self.min_length.filter(|min| length < *min) {
            return Err(too(&self.base, "min_length", &text, min));
        }
        Ok(Value::String(text))
    }

    fn limits(&self) -> Option<Limits> {
        Some(Limits::Length {
            min: self.min_length,
            max: self.max_length,
        })
    }

    fn inherit_limits(&mut self, limits: &Limits) -> bool {
        let Limits::Length { min, max } = limits else {
            return false;
        };
        self.min_length = self.min_length.or(*min);
        self.max_length = self.max_length.or(*max);
        true
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}

fn too(base: &BaseOptions, code: &str, text: &str, limit: usize) -> ValidationError {
    ValidatorError::new(code, base.message(code))
        .with_argument("value", text)
        .with_argument(code, limit.to_string())
        .into()
}
