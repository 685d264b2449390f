//! Container error types.

use keystone_rs_config::ConfigError;

/// Errors raised while compiling a container to code.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DumpError {
    /// A value captured a live host object that cannot be written as code.
    #[error("unable to dump {location}: values of type {type_name} are not representable")]
    Unrepresentable { location: String, type_name: String },
    /// Services depend on each other through constructors, factories or aliases.
    #[error("circular reference detected: {}", path.join(" -> "))]
    CircularReference { path: Vec<String> },
    /// Two ids camelize to the same accessor method.
    #[error("services \"{first}\" and \"{second}\" both map to accessor {accessor}()")]
    AccessorCollision {
        first: String,
        second: String,
        accessor: String,
    },
}

/// Errors raised while loading service definitions.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Underlying configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A service entry is malformed.
    #[error("invalid definition for service \"{id}\": {message}")]
    Invalid { id: String, message: String },
    /// Dumping the loaded container failed.
    #[error(transparent)]
    Dump(#[from] DumpError),
}
