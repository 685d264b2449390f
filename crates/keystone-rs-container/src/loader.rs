//! Populates a [`ContainerBuilder`] from `services.yml` documents.
//!
//! ```yaml
//! parameters:
//!   mailer.class: Mailer
//! services:
//!   mailer:
//!     class: '%mailer.class%'
//!     arguments: ['@logger', { transport: smtp }]
//!     calls:
//!       - [setDebug, [true]]
//!   mail: '@mailer'
//! ```

use crate::builder::ContainerBuilder;
use crate::definition::{Configurator, MethodCall, ServiceDefinition};
use crate::error::ContainerError;
use crate::value::Value;
use keystone_rs_config::{ConfigError, ConfigMap, ConfigValue, parse_yaml};
use log::debug;
use std::path::Path;

const KNOWN_KEYS: &[&str] = &[
    "class",
    "arguments",
    "calls",
    "configurator",
    "constructor",
    "factory_service",
    "factory_method",
    "file",
    "shared",
    "alias",
];

/// Reads `parameters` and `services` sections into a builder.
pub struct ServicesLoader<'a> {
    builder: &'a mut ContainerBuilder,
}

impl<'a> ServicesLoader<'a> {
    pub fn new(builder: &'a mut ContainerBuilder) -> Self {
        Self { builder }
    }

    /// Load one file; later files override earlier definitions.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ContainerError> {
        let config = parse_yaml(path)?;
        self.load_map(&config, path)
    }

    pub fn load_map(&mut self, config: &ConfigMap, file: &Path) -> Result<(), ContainerError> {
        for key in config.keys() {
            if key != "parameters" && key != "services" {
                return Err(ConfigError::parse(
                    file,
                    format!("contains an unsupported key \"{key}\" (expected \"parameters\" or \"services\")"),
                )
                .into());
            }
        }

        if let Some(parameters) = config.get("parameters").filter(|value| !value.is_null()) {
            let Some(parameters) = parameters.as_map() else {
                return Err(ConfigError::parse(file, "\"parameters\" must be a mapping").into());
            };
            for (name, value) in parameters {
                self.builder.set_parameter(name, literal(value));
            }
        }

        if let Some(services) = config.get("services").filter(|value| !value.is_null()) {
            let Some(services) = services.as_map() else {
                return Err(ConfigError::parse(file, "\"services\" must be a mapping").into());
            };
            for (id, entry) in services {
                self.load_service(id, entry)?;
            }
        }
        Ok(())
    }

    fn load_service(&mut self, id: &str, entry: &ConfigValue) -> Result<(), ContainerError> {
        if let ConfigValue::String(target) = entry {
            let Some(target) = target.strip_prefix('@') else {
                return Err(invalid(id, "a string entry must be an alias of the form \"@id\""));
            };
            self.builder.set_alias(id, target);
            return Ok(());
        }
        let Some(entry) = entry.as_map() else {
            return Err(invalid(id, "must be a mapping or an \"@id\" alias"));
        };
        if let Some(unknown) = entry.keys().find(|key| !KNOWN_KEYS.contains(&key.as_str())) {
            return Err(invalid(id, &format!("unsupported key \"{unknown}\"")));
        }
        if let Some(target) = entry.get("alias") {
            let Some(target) = target.as_str() else {
                return Err(invalid(id, "\"alias\" must be a string"));
            };
            self.builder.set_alias(id, target.trim_start_matches('@'));
            return Ok(());
        }

        let Some(class) = entry.get("class").and_then(ConfigValue::as_str) else {
            return Err(invalid(id, "missing \"class\" key"));
        };
        let mut definition = ServiceDefinition::new(class);

        if let Some(arguments) = entry.get("arguments") {
            let Some(arguments) = arguments.as_list() else {
                return Err(invalid(id, "\"arguments\" must be a list"));
            };
            definition.set_arguments(arguments.iter().map(Value::from_config).collect());
        }

        if let Some(calls) = entry.get("calls") {
            definition.set_method_calls(method_calls(id, calls)?);
        }

        if let Some(configurator) = entry.get("configurator") {
            definition.set_configurator(configurator_of(id, configurator)?);
        }

        if let Some(constructor) = entry.get("constructor") {
            let Some(method) = constructor.as_str() else {
                return Err(invalid(id, "\"constructor\" must be a method name"));
            };
            definition.set_constructor(method);
        }

        match (entry.get("factory_service"), entry.get("factory_method")) {
            (None, None) => {}
            (Some(service), Some(method)) => match (service.as_str(), method.as_str()) {
                (Some(service), Some(method)) => {
                    definition.set_factory_service(service.trim_start_matches('@'), method);
                }
                _ => return Err(invalid(id, "\"factory_service\" and \"factory_method\" must be strings")),
            },
            _ => {
                return Err(invalid(
                    id,
                    "\"factory_service\" and \"factory_method\" must be given together",
                ));
            }
        }

        if let Some(file) = entry.get("file") {
            let Some(file) = file.as_str() else {
                return Err(invalid(id, "\"file\" must be a path"));
            };
            definition.set_file(file);
        }

        if let Some(shared) = entry.get("shared") {
            let Some(shared) = shared.as_bool() else {
                return Err(invalid(id, "\"shared\" must be a boolean"));
            };
            definition.set_shared(shared);
        }

        debug!("loaded service (id={id}, class={class})");
        self.builder.set_definition(id, definition);
        Ok(())
    }
}

fn invalid(id: &str, message: &str) -> ContainerError {
    ContainerError::Invalid {
        id: id.to_string(),
        message: message.to_string(),
    }
}

/// Parameter values keep `@` strings as text.
fn literal(value: &ConfigValue) -> Value {
    match value {
        ConfigValue::Null => Value::Null,
        ConfigValue::Bool(value) => Value::Bool(*value),
        ConfigValue::Integer(value) => Value::Integer(*value),
        ConfigValue::Float(value) => Value::Float(*value),
        ConfigValue::String(value) => Value::String(value.clone()),
        ConfigValue::List(items) => Value::List(items.iter().map(literal).collect()),
        ConfigValue::Map(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), literal(value)))
                .collect(),
        ),
    }
}

fn method_calls(id: &str, calls: &ConfigValue) -> Result<Vec<MethodCall>, ContainerError> {
    let Some(calls) = calls.as_list() else {
        return Err(invalid(id, "\"calls\" must be a list of [method, arguments] pairs"));
    };
    let mut out = Vec::new();
    for call in calls {
        let parts = call.as_list().unwrap_or_default();
        let Some(method) = parts.first().and_then(ConfigValue::as_str) else {
            return Err(invalid(id, "each call must start with a method name"));
        };
        let arguments = match parts.get(1) {
            None | Some(ConfigValue::Null) => Vec::new(),
            Some(ConfigValue::List(arguments)) => arguments.iter().map(Value::from_config).collect(),
            Some(_) => {
                return Err(invalid(id, &format!("arguments of call \"{method}\" must be a list")));
            }
        };
        out.push(MethodCall {
            method: method.to_string(),
            arguments,
        });
    }
    Ok(out)
}

fn configurator_of(id: &str, configurator: &ConfigValue) -> Result<Configurator, ContainerError> {
    if let Some(function) = configurator.as_str() {
        return Ok(Configurator::Function(function.to_string()));
    }
    let pair = configurator
        .as_list()
        .filter(|pair| pair.len() == 2)
        .and_then(|pair| Some((pair[0].as_str()?, pair[1].as_str()?)));
    match pair {
        Some((target, method)) => match target.strip_prefix('@') {
            Some(service) if !service.starts_with('@') => Ok(Configurator::Service {
                id: service.to_lowercase(),
                method: method.to_string(),
            }),
            _ => Ok(Configurator::Static {
                class: target.strip_prefix('@').unwrap_or(target).to_string(),
                method: method.to_string(),
            }),
        },
        None => Err(invalid(
            id,
            "\"configurator\" must be a function name or a [class or @service, method] pair",
        )),
    }
}
