//! SQLite cache backend.

use crate::backend::{Cache, should_clean};
use crate::clock::{Clock, SystemClock};
use crate::options::{CacheOptions, CleanMode, pattern_to_regex};
use crate::CacheError;
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// In-memory database name accepted by the `database` option.
pub const IN_MEMORY: &str = ":memory:";

const SCHEMA: &str = "
CREATE TABLE cache (key VARCHAR(255), data LONGVARCHAR, timeout TIMESTAMP, last_modified TIMESTAMP);
CREATE UNIQUE INDEX cache_unique ON cache (key);
";

/// Cache stored in a single SQLite table.
///
/// Only rows whose timeout lies in the future are visible to reads.
#[derive(Debug)]
pub struct SqliteCache {
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    connection: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new(options: CacheOptions) -> Result<Self, CacheError> {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Open (or create) the database named by the `database` option.
    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let database = options
            .database
            .clone()
            .filter(|database| !database.is_empty())
            .ok_or_else(|| {
                CacheError::Initialization("the \"database\" option is required".to_string())
            })?;

        let (connection, fresh) = if database == IN_MEMORY {
            (Connection::open_in_memory()?, true)
        } else {
            let path = Path::new(&database);
            let fresh = !path.exists();
            if fresh {
                if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    fs::create_dir_all(dir).map_err(|err| {
                        CacheError::Initialization(format!(
                            "unable to create directory {}: {err}",
                            dir.display()
                        ))
                    })?;
                }
            }
            (Connection::open(path)?, fresh)
        };

        if fresh {
            connection.execute_batch(SCHEMA)?;
        }
        info!("opened sqlite cache (database={database}, created={fresh})");
        Ok(Self {
            options,
            clock,
            connection: Mutex::new(connection),
        })
    }

    fn live_column(&self, column: &str, key: &str) -> Result<Option<i64>, CacheError> {
        let sql = format!("SELECT {column} FROM cache WHERE key = ?1 AND timeout > ?2");
        let value = self
            .connection
            .lock()
            .query_row(&sql, params![self.options.prefixed(key), self.clock.now()], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }
}

impl Cache for SqliteCache {
    fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let data = self
            .connection
            .lock()
            .query_row(
                "SELECT data FROM cache WHERE key = ?1 AND timeout > ?2",
                params![self.options.prefixed(key), self.clock.now()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        let count: i64 = self.connection.lock().query_row(
            "SELECT COUNT(*) FROM cache WHERE key = ?1 AND timeout > ?2",
            params![self.options.prefixed(key), self.clock.now()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn set(&self, key: &str, data: &str, lifetime: Option<u64>) -> Result<(), CacheError> {
        if should_clean(self.options.automatic_cleaning_factor) {
            self.clean(CleanMode::Old)?;
        }
        let now = self.clock.now();
        let lifetime = i64::try_from(self.options.lifetime_or_default(lifetime)).unwrap_or(i64::MAX);
        self.connection.lock().execute(
            "INSERT OR REPLACE INTO cache (key, data, timeout, last_modified) VALUES (?1, ?2, ?3, ?4)",
            params![self.options.prefixed(key), data, now.saturating_add(lifetime), now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.connection.lock().execute(
            "DELETE FROM cache WHERE key = ?1",
            params![self.options.prefixed(key)],
        )?;
        Ok(removed > 0)
    }

    fn remove_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let regex = pattern_to_regex(&self.options.prefixed(pattern))?;
        let mut connection = self.connection.lock();
        let tx = connection.transaction()?;
        let keys: Vec<String> = {
            let mut statement = tx.prepare("SELECT key FROM cache")?;
            let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let mut removed = 0;
        for key in keys.iter().filter(|key| regex.is_match(key)) {
            removed += tx.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        debug!("removed cache keys by pattern (pattern={pattern}, removed={removed})");
        Ok(removed)
    }

    fn clean(&self, mode: CleanMode) -> Result<usize, CacheError> {
        let connection = self.connection.lock();
        let removed = match mode {
            CleanMode::All => connection.execute("DELETE FROM cache", [])?,
            CleanMode::Old => connection.execute(
                "DELETE FROM cache WHERE timeout <= ?1",
                params![self.clock.now()],
            )?,
        };
        debug!("cleaned sqlite cache (mode={mode:?}, removed={removed})");
        Ok(removed)
    }

    fn get_timeout(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.live_column("timeout", key)?.unwrap_or(0))
    }

    fn get_last_modified(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.live_column("last_modified", key)?.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn database_option_is_required() {
        let err = SqliteCache::new(CacheOptions::default()).unwrap_err();
        assert!(matches!(err, CacheError::Initialization(_)));
        let err = SqliteCache::new(CacheOptions::default().with_database("")).unwrap_err();
        assert!(matches!(err, CacheError::Initialization(_)));
    }

    #[test]
    fn file_database_is_created_and_reopened() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("nested/dir/cache.db");
        let options = CacheOptions::default()
            .with_database(&path.to_string_lossy())
            .with_automatic_cleaning_factor(0);

        let cache = SqliteCache::new(options.clone()).expect("open");
        cache.set("key", "data", None).expect("set");
        drop(cache);
        assert!(path.is_file());

        let cache = SqliteCache::new(options).expect("reopen");
        assert_eq!(cache.get("key").expect("get").as_deref(), Some("data"));
    }

    #[test]
    fn expired_rows_are_invisible_until_cleaned() {
        let clock = ManualClock::new(500);
        let cache = SqliteCache::with_clock(
            CacheOptions::default()
                .with_database(IN_MEMORY)
                .with_automatic_cleaning_factor(0),
            Arc::new(clock.clone()),
        )
        .expect("open");
        cache.set("short", "a", Some(5)).expect("set");
        cache.set("long", "b", Some(50)).expect("set");
        assert_eq!(cache.get_timeout("short").expect("timeout"), 505);

        clock.advance(5);
        assert!(!cache.has("short").expect("has"));
        assert_eq!(cache.get_last_modified("short").expect("modified"), 0);
        assert_eq!(cache.clean(CleanMode::Old).expect("clean"), 1);
        assert_eq!(cache.clean(CleanMode::All).expect("clean"), 1);
    }
}
