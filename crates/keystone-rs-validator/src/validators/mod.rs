//! Built-in field validators.

mod and;
mod choice;
mod compare;
mod number;
mod pass;
mod string;

pub use and::AndValidator;
pub use choice::ChoiceValidator;
pub use compare::{CompareOperator, SchemaCompareValidator};
pub use number::NumberValidator;
pub use pass::{CallbackValidator, PassValidator};
pub use string::StringValidator;
