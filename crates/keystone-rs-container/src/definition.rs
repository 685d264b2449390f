//! Service definitions.

use crate::value::Value;

/// How the service instance is obtained.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BuildStep {
    /// `new Class(args)`.
    #[default]
    NewInstance,
    /// Static factory method on the class.
    StaticFactory { method: String },
    /// Factory method on another service.
    InstanceFactory { service: String, method: String },
}

/// Method invoked on the instance after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<Value>,
}

/// Callable receiving the instance once it is fully built.
#[derive(Debug, Clone, PartialEq)]
pub enum Configurator {
    /// Method on another service.
    Service { id: String, method: String },
    /// Static method on a class (literal or `%param%` expression).
    Static { class: String, method: String },
    /// Plain function.
    Function(String),
}

/// Recipe for building one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    class: String,
    arguments: Vec<Value>,
    calls: Vec<MethodCall>,
    configurator: Option<Configurator>,
    build: BuildStep,
    file: Option<String>,
    shared: bool,
}

impl ServiceDefinition {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            arguments: Vec::new(),
            calls: Vec::new(),
            configurator: None,
            build: BuildStep::NewInstance,
            file: None,
            shared: true,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn set_class(&mut self, class: &str) -> &mut Self {
        self.class = class.to_string();
        self
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn set_arguments(&mut self, arguments: Vec<Value>) -> &mut Self {
        self.arguments = arguments;
        self
    }

    pub fn add_argument(&mut self, argument: impl Into<Value>) -> &mut Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn method_calls(&self) -> &[MethodCall] {
        &self.calls
    }

    pub fn add_method_call(&mut self, method: &str, arguments: Vec<Value>) -> &mut Self {
        self.calls.push(MethodCall {
            method: method.to_string(),
            arguments,
        });
        self
    }

    pub fn set_method_calls(&mut self, calls: Vec<MethodCall>) -> &mut Self {
        self.calls = calls;
        self
    }

    pub fn configurator(&self) -> Option<&Configurator> {
        self.configurator.as_ref()
    }

    pub fn set_configurator(&mut self, configurator: Configurator) -> &mut Self {
        self.configurator = Some(configurator);
        self
    }

    pub fn build_step(&self) -> &BuildStep {
        &self.build
    }

    /// Build through a static factory method on the class.
    pub fn set_constructor(&mut self, method: &str) -> &mut Self {
        self.build = BuildStep::StaticFactory {
            method: method.to_string(),
        };
        self
    }

    /// Build through a factory method on another service.
    pub fn set_factory_service(&mut self, service: &str, method: &str) -> &mut Self {
        self.build = BuildStep::InstanceFactory {
            service: service.to_lowercase(),
            method: method.to_string(),
        };
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// File required before the service is built.
    pub fn set_file(&mut self, file: &str) -> &mut Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn set_shared(&mut self, shared: bool) -> &mut Self {
        self.shared = shared;
        self
    }
}
