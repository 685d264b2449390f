use crate::base::{BaseOptions, Limits, Validator, base_setters};
use crate::error::{ValidationError, ValidatorError, display_value};
use serde_json::{Number, Value};

/// Accepts numbers and numeric strings, optionally bounded.
#[derive(Debug, Clone)]
pub struct NumberValidator {
    base: BaseOptions,
    min: Option<f64>,
    max: Option<f64>,
}

impl Default for NumberValidator {
    fn default() -> Self {
        let mut base = BaseOptions::default();
        base.set_message("invalid", "\"%value%\" is not a number.");
        base.add_message("max", "\"%value%\" must be at most %max%.");
        base.add_message("min", "\"%value%\" must be at least %min%.");
        Self {
            base,
            min: None,
            max: None,
        }
    }
}

impl NumberValidator {
    pub fn new() -> Self {
        Self::default()
    }

    base_setters!();

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

impl Validator for NumberValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        };
        let Some(number) = number else {
            return Err(self.base.error("invalid").with_value(value).into());
        };
        if let Some(max) = self.max.filter(|max| number > *max) {
            return Err(out_of_range(&self.base, "max", value, max));
        }
        if let Some(min) = self.min.filter(|min| number < *min) {
            return Err(out_of_range(&self.base, "min", value, min));
        }
        Ok(to_json(number))
    }

    fn limits(&self) -> Option<Limits> {
        Some(Limits::Range {
            min: self.min,
            max: self.max,
        })
    }

    fn inherit_limits(&mut self, limits: &Limits) -> bool {
        let Limits::Range { min, max } = limits else {
            return false;
        };
        self.min = self.min.or(*min);
        self.max = self.max.or(*max);
        true
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}

/// Whole numbers are returned as integers.
fn to_json(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::Number(Number::from(number as i64))
    } else {
        Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn out_of_range(base: &BaseOptions, code: &str, value: &Value, limit: f64) -> ValidationError {
    ValidatorError::new(code, base.message(code))
        .with_argument("value", display_value(value))
        .with_argument(code, display_value(&to_json(limit)))
        .into()
}
