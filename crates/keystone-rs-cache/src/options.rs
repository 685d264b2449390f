//! Backend options and key patterns.

use crate::CacheError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separator between the segments of a cache key.
pub const SEPARATOR: char = ':';

/// Options shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Default lifetime in seconds.
    pub lifetime: u64,
    /// Prepended to every key.
    pub prefix: String,
    /// One `set` in this many also removes expired entries; `0` disables it.
    pub automatic_cleaning_factor: u32,
    /// Keep an index of stored keys, needed by `remove_pattern` on
    /// backends that cannot enumerate their keys.
    pub store_cache_info: bool,
    /// Database location for the SQLite backend (`:memory:` allowed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            lifetime: 86400,
            prefix: String::new(),
            automatic_cleaning_factor: 1000,
            store_cache_info: false,
            database: None,
        }
    }
}

impl CacheOptions {
    pub fn with_lifetime(mut self, lifetime: u64) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_automatic_cleaning_factor(mut self, factor: u32) -> Self {
        self.automatic_cleaning_factor = factor;
        self
    }

    pub fn with_store_cache_info(mut self, store: bool) -> Self {
        self.store_cache_info = store;
        self
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// `lifetime` or the configured default.
    pub fn lifetime_or_default(&self, lifetime: Option<u64>) -> u64 {
        lifetime.unwrap_or(self.lifetime)
    }

    pub(crate) fn prefixed(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

/// Which entries `clean` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    All,
    /// Expired entries only.
    Old,
}

/// Compile a key pattern into an anchored regex.
///
/// `**` matches any run of characters, `*` any run without a `:` and `?` a
/// single character other than `:`. Everything else is literal.
pub fn pattern_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let separator = regex::escape(&SEPARATOR.to_string());
    let mut expression = String::from("^");
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        let token = match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                ".+?".to_string()
            }
            '*' => format!("[^{separator}]+"),
            '?' => format!("[^{separator}]"),
            other => {
                literal.push(other);
                continue;
            }
        };
        expression.push_str(&regex::escape(&literal));
        literal.clear();
        expression.push_str(&token);
    }
    expression.push_str(&regex::escape(&literal));
    expression.push('$');
    Ok(Regex::new(&expression)?)
}
