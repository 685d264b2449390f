//! Key/value cache backends with per-entry expiry.
//!
//! Every backend implements [`Cache`]. [`MemoryCache`] keeps entries in the
//! process; [`SqliteCache`] persists them in a SQLite table. Both read the
//! time from an injectable [`Clock`].

mod backend;
mod clock;
mod error;
mod memory;
mod options;
mod sqlite;

pub use backend::Cache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use memory::MemoryCache;
pub use options::{CacheOptions, CleanMode, SEPARATOR, pattern_to_regex};
pub use sqlite::{IN_MEMORY, SqliteCache};
