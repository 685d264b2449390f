//! Public surface of Keystone.
//!
//! Re-exports the component crates and provides [`Project`], which wires
//! every configuration handler against a project layout.

mod project;

/// Re-export for convenience.
pub use keystone_rs_autoload as autoload;
pub use keystone_rs_cache as cache;
pub use keystone_rs_config as config;
/// Re-export for convenience.
pub use keystone_rs_container as container;
pub use keystone_rs_validator as validator;

pub use project::{Project, SERVICES_CONFIG};

#[inline]
/// Initialize logging through env_logger (`RUST_LOG` controls the level).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
