//! In-process cache backend.

use crate::backend::{Cache, should_clean};
use crate::clock::{Clock, SystemClock};
use crate::options::{CacheOptions, CleanMode, pattern_to_regex};
use crate::CacheError;
use indexmap::IndexSet;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Entry {
    data: String,
    timeout: i64,
    last_modified: i64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Stored keys (prefixed), kept only with `store_cache_info`.
    index: Option<IndexSet<String>>,
}

/// Cache held in a map guarded by a mutex.
///
/// Like a remote key/value store it cannot list its keys, so
/// `remove_pattern` works only when `store_cache_info` keeps a key index.
#[derive(Debug)]
pub struct MemoryCache {
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl MemoryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        let state = State {
            entries: HashMap::new(),
            index: options.store_cache_info.then(IndexSet::new),
        };
        Self {
            options,
            clock,
            state: Mutex::new(state),
        }
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let now = self.clock.now();
        self.state
            .lock()
            .entries
            .get(&self.options.prefixed(key))
            .filter(|entry| entry.timeout > now)
            .cloned()
    }
}

impl Cache for MemoryCache {
    fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live(key).map(|entry| entry.data))
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live(key).is_some())
    }

    fn set(&self, key: &str, data: &str, lifetime: Option<u64>) -> Result<(), CacheError> {
        if should_clean(self.options.automatic_cleaning_factor) {
            self.clean(CleanMode::Old)?;
        }
        let now = self.clock.now();
        let lifetime = self.options.lifetime_or_default(lifetime);
        let key = self.options.prefixed(key);
        let mut state = self.state.lock();
        if let Some(index) = state.index.as_mut() {
            index.insert(key.clone());
        }
        state.entries.insert(
            key,
            Entry {
                data: data.to_string(),
                timeout: now.saturating_add(i64::try_from(lifetime).unwrap_or(i64::MAX)),
                last_modified: now,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let key = self.options.prefixed(key);
        let mut state = self.state.lock();
        if let Some(index) = state.index.as_mut() {
            index.shift_remove(&key);
        }
        Ok(state.entries.remove(&key).is_some())
    }

    fn remove_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let regex = pattern_to_regex(&self.options.prefixed(pattern))?;
        let mut state = self.state.lock();
        let State { entries, index } = &mut *state;
        let Some(index) = index.as_mut() else {
            return Err(CacheError::Unsupported(
                "remove_pattern requires the store_cache_info option".to_string(),
            ));
        };
        let matching: Vec<String> = index.iter().filter(|key| regex.is_match(key)).cloned().collect();
        for key in &matching {
            index.shift_remove(key);
            entries.remove(key);
        }
        debug!("removed cache keys by pattern (pattern={pattern}, removed={})", matching.len());
        Ok(matching.len())
    }

    fn clean(&self, mode: CleanMode) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        match mode {
            CleanMode::All => state.entries.clear(),
            CleanMode::Old => state.entries.retain(|_, entry| entry.timeout > now),
        }
        let State { entries, index } = &mut *state;
        if let Some(index) = index.as_mut() {
            index.retain(|key| entries.contains_key(key));
        }
        let removed = before - entries.len();
        debug!("cleaned memory cache (mode={mode:?}, removed={removed})");
        Ok(removed)
    }

    fn get_timeout(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.live(key).map_or(0, |entry| entry.timeout))
    }

    fn get_last_modified(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.live(key).map_or(0, |entry| entry.last_modified))
    }
}
