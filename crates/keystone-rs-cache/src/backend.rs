//! The contract every cache backend implements.

use crate::options::{CacheOptions, CleanMode};
use crate::CacheError;
use indexmap::IndexMap;
use rand::Rng;
use std::fmt::Debug;

/// A key/value store with per-entry expiry.
///
/// Keys are given without the configured prefix. Timestamps are seconds
/// since the epoch as reported by the backend's clock.
pub trait Cache: Send + Sync + Debug {
    fn options(&self) -> &CacheOptions;

    /// Data stored under `key`, `None` when missing or expired.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn get_or(&self, key: &str, default: &str) -> Result<String, CacheError> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn has(&self, key: &str) -> Result<bool, CacheError>;

    /// Store `data`; `None` uses the configured lifetime.
    fn set(&self, key: &str, data: &str, lifetime: Option<u64>) -> Result<(), CacheError>;

    /// `true` when an entry was removed.
    fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key matching a pattern (see [`crate::pattern_to_regex`]).
    fn remove_pattern(&self, pattern: &str) -> Result<usize, CacheError>;

    fn clean(&self, mode: CleanMode) -> Result<usize, CacheError>;

    /// Expiry time of `key`, `0` when missing or expired.
    fn get_timeout(&self, key: &str) -> Result<i64, CacheError>;

    /// Last write time of `key`, `0` when missing or expired.
    fn get_last_modified(&self, key: &str) -> Result<i64, CacheError>;

    /// Values of the live keys among `keys`, in request order.
    fn get_many(&self, keys: &[&str]) -> Result<IndexMap<String, String>, CacheError> {
        let mut found = IndexMap::new();
        for key in keys {
            if let Some(data) = self.get(key)? {
                found.insert(key.to_string(), data);
            }
        }
        Ok(found)
    }
}

/// Roll the automatic cleaning dice for one write.
pub(crate) fn should_clean(factor: u32) -> bool {
    factor > 0 && rand::rng().random_range(1..=factor) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_factor_bounds() {
        assert!(!should_clean(0));
        assert!(should_clean(1));
    }
}
