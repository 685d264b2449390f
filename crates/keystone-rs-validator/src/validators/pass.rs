use crate::base::{BaseOptions, Validator, base_setters};
use crate::error::ValidationError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Returns its input untouched; never fails.
#[derive(Debug, Clone)]
pub struct PassValidator {
    base: BaseOptions,
}

impl Default for PassValidator {
    fn default() -> Self {
        let mut base = BaseOptions::default();
        base.required = false;
        Self { base }
    }
}

impl PassValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Validator for PassValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        Ok(value.clone())
    }

    fn clean(&self, value: &Value) -> Result<Value, ValidationError> {
        self.do_clean(value)
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}

type Callback = dyn Fn(&BaseOptions, &Value) -> Result<Value, ValidationError> + Send + Sync;

/// Delegates cleaning to a closure, which receives the validator options
/// so it can build errors with the configured messages.
///
/// Empty values reach the closure too; it is not required by default.
#[derive(Clone)]
pub struct CallbackValidator {
    base: BaseOptions,
    callback: Arc<Callback>,
}

impl CallbackValidator {
    pub fn new(
        callback: impl Fn(&BaseOptions, &Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        let mut base = BaseOptions::default();
        base.required = false;
        Self {
            base,
            callback: Arc::new(callback),
        }
    }

    base_setters!();
}

impl fmt::Debug for CallbackValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackValidator")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl Validator for CallbackValidator {
    fn options(&self) -> &BaseOptions {
        &self.base
    }

    fn options_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }

    fn do_clean(&self, value: &Value) -> Result<Value, ValidationError> {
        (self.callback)(&self.base, value)
    }

    fn clean(&self, value: &Value) -> Result<Value, ValidationError> {
        if self.base.required && crate::base::is_empty(value) {
            return Err(self.base.error("required").into());
        }
        self.do_clean(value)
    }

    fn boxed_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}
