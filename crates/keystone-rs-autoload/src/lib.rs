//! Class name resolution through the compiled autoload table.
//!
//! An [`AutoloadResolver`] is an explicit object: it owns the active class
//! table, the tables of applications it has already served and the runtime
//! overrides. Tables come from an [`AutoloadSource`], loading goes through a
//! host [`ClassLoader`].

mod error;
mod resolver;
mod source;

pub use error::{AutoloadError, LoadFailure};
pub use resolver::{AutoloadResolver, ClassLoader, ResolveContext, STAMP_FILE};
pub use source::{AUTOLOAD_CONFIG, ArtifactSource, AutoloadSource, AutoloadTable, TableSource};
