//! Compiles a [`ContainerBuilder`] into a container class.

mod graphviz;
pub mod ir;
mod php;

pub use graphviz::{GraphSection, GraphvizDumper, GraphvizOptions};
pub use ir::{ClassRef, ContainerUnit, Expr, Method, Stmt};
pub use php::PhpEmitter;

use crate::builder::ContainerBuilder;
use crate::definition::{BuildStep, Configurator, ServiceDefinition};
use crate::error::DumpError;
use crate::value::{SERVICE_CONTAINER_ID, Value};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Renders a lowered container.
pub trait Emitter {
    fn emit(&self, unit: &ContainerUnit) -> String;
}

/// Names of the generated class and its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    pub class: String,
    pub base_class: String,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            class: "ProjectServiceContainer".to_string(),
            base_class: "ServiceContainer".to_string(),
        }
    }
}

impl DumpOptions {
    pub fn with_class(mut self, class: &str) -> Self {
        self.class = class.to_string();
        self
    }

    pub fn with_base_class(mut self, base_class: &str) -> Self {
        self.base_class = base_class.to_string();
        self
    }
}

/// Accessor suffix for a service id: `foo_bar.baz` becomes `FooBar_Baz`.
pub fn camelize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut upper = true;
    for ch in id.chars() {
        match ch {
            '_' | '-' => upper = true,
            '.' => {
                out.push('_');
                upper = true;
            }
            _ if upper => {
                out.extend(ch.to_uppercase());
                upper = false;
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Accessor method name for a service id.
pub fn accessor_name(id: &str) -> String {
    format!("get{}Service", camelize(id))
}

fn check_accessor_names(methods: &[Method]) -> Result<(), DumpError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for method in methods {
        if let Some(first) = seen.insert(&method.name, &method.service) {
            return Err(DumpError::AccessorCollision {
                first: first.to_string(),
                second: method.service.clone(),
                accessor: method.name.clone(),
            });
        }
    }
    Ok(())
}

/// Lowers service definitions into a [`ContainerUnit`] and emits it.
pub struct ContainerDumper<'a> {
    builder: &'a ContainerBuilder,
}

impl<'a> ContainerDumper<'a> {
    pub fn new(builder: &'a ContainerBuilder) -> Self {
        Self { builder }
    }

    /// Dump as a PHP class.
    pub fn dump(&self, options: &DumpOptions) -> Result<String, DumpError> {
        self.dump_with(&PhpEmitter, options)
    }

    pub fn dump_with(
        &self,
        emitter: &dyn Emitter,
        options: &DumpOptions,
    ) -> Result<String, DumpError> {
        let unit = self.build_unit(options)?;
        let code = emitter.emit(&unit);
        info!(
            "dumped service container (class={}, services={}, aliases={})",
            options.class,
            self.builder.definitions().len(),
            self.builder.aliases().len()
        );
        Ok(code)
    }

    /// Lower the builder; no output is produced when any value is unrepresentable.
    pub fn build_unit(&self, options: &DumpOptions) -> Result<ContainerUnit, DumpError> {
        self.builder.check_circular_references()?;

        let mut default_parameters = Vec::new();
        for (name, value) in self.builder.parameters() {
            let exported = export_parameter(value, &format!("parameter \"{name}\""))?;
            default_parameters.push((name.clone(), exported));
        }

        let mut methods = Vec::new();
        for (id, definition) in self.builder.definitions() {
            methods.push(self.service_method(id, definition)?);
        }
        for (alias, target) in self.builder.aliases() {
            debug!("forwarding alias (alias={alias}, id={target})");
            methods.push(Method {
                name: accessor_name(alias),
                service: alias.clone(),
                body: vec![Stmt::Forward(self.service_call(target))],
            });
        }

        check_accessor_names(&methods)?;

        Ok(ContainerUnit {
            class: options.class.clone(),
            base_class: options.base_class.clone(),
            default_parameters,
            methods,
        })
    }

    fn service_method(&self, id: &str, definition: &ServiceDefinition) -> Result<Method, DumpError> {
        let mut body = Vec::new();

        if let Some(file) = definition.file() {
            body.push(Stmt::Require(Expr::interpolated(&file.replace('\\', "/"))));
        }
        if definition.is_shared() {
            body.push(Stmt::SharedGuard { id: id.to_string() });
        }

        let mut arguments = Vec::new();
        for (index, argument) in definition.arguments().iter().enumerate() {
            let location = format!("argument {index} of service \"{id}\"");
            arguments.push(self.value_expr(argument, &location)?);
        }

        let class = Expr::interpolated(definition.class());
        let instance = match definition.build_step() {
            BuildStep::NewInstance => match class {
                Expr::Str(ref name) if name == definition.class() => Expr::New {
                    class: ClassRef::Named(name.clone()),
                    arguments,
                },
                dynamic => {
                    body.push(Stmt::Assign {
                        var: "class".to_string(),
                        value: dynamic,
                    });
                    Expr::New {
                        class: ClassRef::Var("class".to_string()),
                        arguments,
                    }
                }
            },
            BuildStep::StaticFactory { method } => Expr::StaticCall {
                class: Box::new(class),
                method: method.clone(),
                arguments,
            },
            BuildStep::InstanceFactory { service, method } => Expr::MethodCall {
                target: Box::new(self.service_call(service)),
                method: method.clone(),
                arguments,
            },
        };
        body.push(Stmt::Assign {
            var: "instance".to_string(),
            value: instance,
        });

        for call in definition.method_calls() {
            let mut arguments = Vec::new();
            for (index, argument) in call.arguments.iter().enumerate() {
                let location = format!("argument {index} of {}() on service \"{id}\"", call.method);
                arguments.push(self.value_expr(argument, &location)?);
            }
            body.push(Stmt::Eval(Expr::MethodCall {
                target: Box::new(Expr::var("instance")),
                method: call.method.clone(),
                arguments,
            }));
        }

        if let Some(configurator) = definition.configurator() {
            let instance = vec![Expr::var("instance")];
            body.push(Stmt::Eval(match configurator {
                Configurator::Service { id, method } => Expr::MethodCall {
                    target: Box::new(self.service_call(id)),
                    method: method.clone(),
                    arguments: instance,
                },
                Configurator::Static { class, method } => Expr::StaticCall {
                    class: Box::new(Expr::interpolated(class)),
                    method: method.clone(),
                    arguments: instance,
                },
                Configurator::Function(name) => Expr::FunctionCall {
                    name: name.clone(),
                    arguments: instance,
                },
            }));
        }

        body.push(if definition.is_shared() {
            Stmt::ReturnShared {
                id: id.to_string(),
                value: Expr::var("instance"),
            }
        } else {
            Stmt::Return(Expr::var("instance"))
        });

        debug!(
            "lowered service (id={id}, class={}, shared={})",
            definition.class(),
            definition.is_shared()
        );
        Ok(Method {
            name: accessor_name(id),
            service: id.to_string(),
            body,
        })
    }

    fn service_call(&self, id: &str) -> Expr {
        if id == SERVICE_CONTAINER_ID {
            Expr::Container
        } else if self.builder.has_service(id) {
            Expr::Service(id.to_string())
        } else {
            Expr::MissingService(id.to_string())
        }
    }

    fn value_expr(&self, value: &Value, location: &str) -> Result<Expr, DumpError> {
        Ok(match value {
            Value::Null => Expr::Null,
            Value::Bool(value) => Expr::Bool(*value),
            Value::Integer(value) => Expr::Integer(*value),
            Value::Float(value) => Expr::Float(*value),
            Value::String(value) => Expr::interpolated(value),
            Value::List(items) => Expr::List(
                items
                    .iter()
                    .map(|item| self.value_expr(item, location))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => Expr::Map(
                map.iter()
                    .map(|(key, item)| Ok((key.clone(), self.value_expr(item, location)?)))
                    .collect::<Result<_, DumpError>>()?,
            ),
            Value::Service(id) => self.service_call(id),
            Value::Parameter(name) => Expr::Parameter(name.clone()),
            Value::Opaque { type_name } => {
                return Err(DumpError::Unrepresentable {
                    location: location.to_string(),
                    type_name: type_name.clone(),
                });
            }
        })
    }
}

/// Parameter values are exported as written; `%name%` tokens are resolved
/// by the container at runtime.
fn export_parameter(value: &Value, location: &str) -> Result<Expr, DumpError> {
    Ok(match value {
        Value::Null => Expr::Null,
        Value::Bool(value) => Expr::Bool(*value),
        Value::Integer(value) => Expr::Integer(*value),
        Value::Float(value) => Expr::Float(*value),
        Value::String(value) => Expr::Str(value.clone()),
        Value::List(items) => Expr::List(
            items
                .iter()
                .map(|item| export_parameter(item, location))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(map) => Expr::Map(
            map.iter()
                .map(|(key, item)| Ok((key.clone(), export_parameter(item, location)?)))
                .collect::<Result<_, DumpError>>()?,
        ),
        Value::Service(id) => Expr::ServiceReference(id.clone()),
        Value::Parameter(name) => Expr::Parameter(name.clone()),
        Value::Opaque { type_name } => {
            return Err(DumpError::Unrepresentable {
                location: location.to_string(),
                type_name: type_name.clone(),
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn camelizes_ids() {
        assert_eq!(camelize("foo"), "Foo");
        assert_eq!(camelize("foo_bar"), "FooBar");
        assert_eq!(camelize("method_call1"), "MethodCall1");
        assert_eq!(camelize("foo.bar-baz"), "Foo_BarBaz");
        assert_eq!(accessor_name("service_container"), "getServiceContainerService");
    }

    #[test]
    fn dynamic_class_goes_through_a_variable() {
        let mut builder = ContainerBuilder::new();
        builder.register("bar", "%foo_class%");
        let unit = ContainerDumper::new(&builder)
            .build_unit(&DumpOptions::default())
            .expect("unit");
        let body = &unit.method("getBarService").expect("method").body;
        assert_eq!(
            body[1],
            Stmt::Assign {
                var: "class".into(),
                value: Expr::Parameter("foo_class".into())
            }
        );
    }

    #[test]
    fn opaque_parameter_is_rejected() {
        let mut builder = ContainerBuilder::new();
        builder.set_parameter("handle", Value::opaque("resource"));
        let err = ContainerDumper::new(&builder)
            .dump(&DumpOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to dump parameter \"handle\": values of type resource are not representable"
        );
    }
}
