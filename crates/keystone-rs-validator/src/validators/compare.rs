use crate::base::{BaseOptions, Validator, base_setters};
use crate::error::{ErrorSchema, ValidationError};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison applied by [`SchemaCompareValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Identical => "===",
            Self::NotIdentical => "!==",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        }
    }

    fn holds(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Identical => left == right,
            Self::NotIdentical => left != right,
            Self::Equal => loose_cmp(left, right) == Some(Ordering::Equal),
            Self::NotEqual => loose_cmp(left, right) != Some(Ordering::Equal),
            Self::LessThan => loose_cmp(left, right) == Some(Ordering::Less),
            Self::LessThanEqual => matches!(
                loose_cmp(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::GreaterThan => loose_cmp(left, right) == Some(Ordering::Greater),
            Self::GreaterThanEqual => matches!(
                loose_cmp(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Numbers (and numeric strings) compare numerically, everything else as text.
fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (as_number(left), as_number(right)) {
        (Some(left), Some(right)) => left.partial_cmp(&right),
        _ => Some(as_text(left).cmp(&as_text(right))),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Post-validator comparing two fields of the cleaned values.
///
/// The error is attached to the left field unless `throw_global` is set.
#[derive(Debug, Clone)]
pub struct SchemaCompareValidator {
    base: BaseOptions,
    left_field: String,
    operator: CompareOperator,
    right_field: String,
    throw_global: bool,
}

impl SchemaCompareValidator {
    pub fn new(left_field: &str, operator: CompareOperator, right_field: &str) -> Self {
        let mut base = BaseOptions::default();
        base.set_message(
            "invalid",
            "\"%left_field%\" must be %operator% \"%right_field%\".",
        );
        Self {
            base,
            left_field: left_field.to_string(),
            operator,
            right_field: right_field.to_string(),
            throw_global: false,
        }
    }

    base_setters!();

    pub fn throw_global(mut self, global: bool) -> Self {
        self.throw_global = global;
        self
    }
}

impl Validator for SchemaCompareValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, values: &Value) -> Result<Value, ValidationError> {
        let Value::Object(map) = values else {
            return Err(self.base.error("invalid").with_value(values).into());
        };
        let left = map.get(&self.left_field).unwrap_or(&Value::Null);
        let right = map.get(&self.right_field).unwrap_or(&Value::Null);
        if self.operator.holds(left, right) {
            return Ok(values.clone());
        }

        let error = self
            .base
            .error("invalid")
            .with_argument("left_field", self.left_field.as_str())
            .with_argument("operator", self.operator.symbol())
            .with_argument("right_field", self.right_field.as_str())
            .with_argument("value", as_text(left));
        if self.throw_global {
            return Err(error.into());
        }
        let mut schema = ErrorSchema::new();
        schema.add(error.into(), Some(&self.left_field));
        Err(schema.into())
    }

    /// Runs on the whole cleaned mapping, which is never "empty".
    fn clean(&self, values: &Value) -> Result<Value, ValidationError> {
        let empty = Value::Object(Default::default());
        self.do_clean(if values.is_null() { &empty } else { values })
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}
