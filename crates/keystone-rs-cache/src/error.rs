use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be set up from its options.
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    /// The operation needs a feature the backend was configured without.
    #[error("unsupported cache operation: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid cache key pattern: {0}")]
    Regex(#[from] regex::Error),
}
