use crate::base::{BaseOptions, Limits, Validator, base_setters};
use crate::error::{ErrorSchema, ValidationError};
use serde_json::Value;

/// Runs validators in sequence, feeding each the previous cleaned value.
///
/// Failures are collected as global errors; with `halt_on_error` the chain
/// stops at the first one. When the `invalid` message is customized, it
/// replaces the collected errors.
#[derive(Debug, Clone)]
pub struct AndValidator {
    base: BaseOptions,
    validators: Vec<Box<dyn Validator>>,
    halt_on_error: bool,
    custom_invalid: bool,
}

impl AndValidator {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self {
            base: BaseOptions::default(),
            validators,
            halt_on_error: false,
            custom_invalid: false,
        }
    }

    base_setters!();

    pub fn halt_on_error(mut self, halt: bool) -> Self {
        self.halt_on_error = halt;
        self
    }

    pub fn invalid_message(mut self, template: &str) -> Self {
        self.base.set_message("invalid", template);
        self.custom_invalid = true;
        self
    }

    pub fn add(mut self, validator: Box<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(&self) -> &[Box<dyn Validator>] {
        &self.validators
    }
}

impl Validator for AndValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut clean = value.clone();
        let mut errors = ErrorSchema::new();
        for validator in &self.validators {
            match validator.clean(&clean) {
                Ok(value) => clean = value,
                Err(error) => {
                    errors.add(error, None);
                    if self.halt_on_error {
                        break;
                    }
                }
            }
        }

        if errors.is_empty() {
            return Ok(clean);
        }
        if self.custom_invalid {
            return Err(self.base.error("invalid").with_value(value).into());
        }
        Err(errors.into())
    }

    fn inherit_limits(&mut self, limits: &Limits) -> bool {
        self.validators
            .iter_mut()
            .any(|validator| validator.inherit_limits(limits))
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}
