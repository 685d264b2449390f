//! Dependency-injection service definitions and their compilation to code.
//!
//! A [`ContainerBuilder`] collects services, aliases and parameters, either
//! from `services.yml` through [`ServicesLoader`] or programmatically. The
//! [`ContainerDumper`] lowers it into a [`ContainerUnit`] that an [`Emitter`]
//! renders; [`GraphvizDumper`] draws the same graph as a dot file.

mod builder;
mod definition;
pub mod dumper;
mod error;
mod handler;
mod loader;
mod value;

pub use builder::ContainerBuilder;
pub use definition::{BuildStep, Configurator, MethodCall, ServiceDefinition};
pub use dumper::{
    ContainerDumper, ContainerUnit, DumpOptions, Emitter, GraphSection, GraphvizDumper,
    GraphvizOptions, PhpEmitter, accessor_name, camelize,
};
/// Public error types for loading and dumping containers.
pub use error::{ContainerError, DumpError};
pub use handler::ServiceContainerConfigHandler;
pub use loader::ServicesLoader;
pub use value::{SERVICE_CONTAINER_ID, Value};
