//! Behaviour every backend shares, run against each of them.

use keystone_rs_cache::{
    Cache, CacheOptions, CleanMode, IN_MEMORY, ManualClock, MemoryCache, SqliteCache,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

fn options() -> CacheOptions {
    CacheOptions::default()
        .with_automatic_cleaning_factor(0)
        .with_store_cache_info(true)
        .with_database(IN_MEMORY)
}

fn backends() -> Vec<(Box<dyn Cache>, ManualClock)> {
    let memory_clock = ManualClock::new(NOW);
    let sqlite_clock = ManualClock::new(NOW);
    vec![
        (
            Box::new(MemoryCache::with_clock(options(), Arc::new(memory_clock.clone()))),
            memory_clock,
        ),
        (
            Box::new(
                SqliteCache::with_clock(options(), Arc::new(sqlite_clock.clone())).expect("sqlite"),
            ),
            sqlite_clock,
        ),
    ]
}

#[test]
fn set_get_and_remove() {
    for (cache, _) in backends() {
        assert_eq!(cache.get("test").expect("get"), None);
        assert_eq!(cache.get_or("test", "default").expect("get_or"), "default");
        assert!(!cache.has("test").expect("has"));

        cache.set("test", "foo", None).expect("set");
        assert_eq!(cache.get("test").expect("get").as_deref(), Some("foo"));
        assert!(cache.has("test").expect("has"));

        cache.set("test", "bar", None).expect("overwrite");
        assert_eq!(cache.get_or("test", "default").expect("get_or"), "bar");

        assert!(cache.remove("test").expect("remove"));
        assert!(!cache.has("test").expect("has"));
        assert!(!cache.remove("test").expect("remove again"));
    }
}

#[test]
fn lifetimes_and_metadata() {
    for (cache, clock) in backends() {
        cache.set("default", "a", None).expect("set");
        cache.set("short", "b", Some(10)).expect("set");
        assert_eq!(cache.get_timeout("default").expect("timeout"), NOW + 86400);
        assert_eq!(cache.get_timeout("short").expect("timeout"), NOW + 10);
        assert_eq!(cache.get_last_modified("short").expect("modified"), NOW);
        assert_eq!(cache.get_timeout("missing").expect("timeout"), 0);

        clock.advance(20);
        assert_eq!(cache.get("short").expect("get"), None);
        assert_eq!(cache.get_last_modified("short").expect("modified"), 0);
        assert_eq!(cache.get("default").expect("get").as_deref(), Some("a"));

        cache.set("default", "c", None).expect("rewrite");
        assert_eq!(cache.get_last_modified("default").expect("modified"), NOW + 20);
    }
}

#[test]
fn remove_pattern_matches_one_segment() {
    for (cache, _) in backends() {
        cache.set("test_1", "1", None).expect("set");
        cache.set("test_2", "2", None).expect("set");
        cache.set("test:nested", "3", None).expect("set");
        cache.set("foo_1", "4", None).expect("set");

        assert_eq!(cache.remove_pattern("test_*").expect("pattern"), 2);
        assert!(!cache.has("test_1").expect("has"));
        assert!(!cache.has("test_2").expect("has"));
        assert!(cache.has("test:nested").expect("has"));
        assert!(cache.has("foo_1").expect("has"));

        assert_eq!(cache.remove_pattern("**").expect("pattern"), 2);
        assert!(!cache.has("test:nested").expect("has"));
    }
}

#[test]
fn clean_old_keeps_live_entries() {
    for (cache, clock) in backends() {
        cache.set("old", "1", Some(1)).expect("set");
        cache.set("live", "2", Some(100)).expect("set");
        clock.advance(5);
        assert_eq!(cache.clean(CleanMode::Old).expect("clean"), 1);
        assert!(cache.has("live").expect("has"));
        assert_eq!(cache.clean(CleanMode::All).expect("clean"), 1);
        assert!(!cache.has("live").expect("has"));
    }
}

#[test]
fn get_many_returns_live_keys_in_request_order() {
    for (cache, _) in backends() {
        cache.set("b", "2", None).expect("set");
        cache.set("a", "1", None).expect("set");
        let values = cache.get_many(&["a", "missing", "b"]).expect("many");
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }
}
