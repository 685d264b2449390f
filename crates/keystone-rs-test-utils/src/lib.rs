//! Test helpers shared across Keystone crates.

pub mod context;
pub mod fixture;
pub mod loader;

pub use context::RecordingContext;
pub use fixture::ProjectFixture;
pub use keystone_rs_cache::ManualClock;
pub use loader::FakeClassLoader;
