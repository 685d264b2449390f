//! Field validators and the schema engine that aggregates their errors.
//!
//! Values are [`serde_json::Value`]s. A [`ValidatorSchema`] cleans a mapping
//! field by field and reports every failure at once in an [`ErrorSchema`].

mod base;
mod error;
mod schema;
pub mod validators;

pub use base::{BaseOptions, Limits, Validator, is_empty};
pub use error::{ErrorSchema, ValidationError, ValidatorError, display_value};
pub use schema::{ValidatorSchema, parse_size};
pub use validators::{
    AndValidator, CallbackValidator, ChoiceValidator, CompareOperator, NumberValidator,
    PassValidator, SchemaCompareValidator, StringValidator,
};
