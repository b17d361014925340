//! Unit tests for the LRU + TTL validation cache.

use std::time::Duration;

use repo_path_guard::models::{PathMetadata, ValidationResult};
use repo_path_guard::path::cache::cache_key;
use repo_path_guard::path::{CacheSettings, ValidationCache};
use repo_path_guard::{AppError, PlatformProfile};

fn result_for(normalized: &str) -> ValidationResult {
    ValidationResult::new(
        Some(normalized.to_owned()),
        Vec::new(),
        Vec::new(),
        PathMetadata::present(true, None),
    )
}

fn cache(max_entries: usize, ttl: Duration) -> ValidationCache {
    ValidationCache::new(CacheSettings {
        max_entries,
        ttl,
        refresh_on_read: false,
    })
}

fn refreshing_cache(ttl: Duration) -> ValidationCache {
    ValidationCache::new(CacheSettings {
        max_entries: 10,
        ttl,
        refresh_on_read: true,
    })
}

#[test]
fn miss_then_hit_is_counted() {
    let cache = cache(10, Duration::from_secs(60));
    assert!(cache.get("k").is_none());

    cache.set("k".into(), "/repo", result_for("/repo"));
    let hit = cache.get("k").expect("cached");
    assert_eq!(hit.normalized_path(), Some("/repo"));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[test]
fn least_recently_used_entry_is_evicted_first() {
    let cache = cache(2, Duration::from_secs(60));
    cache.set("a".into(), "/a", result_for("/a"));
    cache.set("b".into(), "/b", result_for("/b"));

    // Touch `a` so that `b` becomes the eviction candidate.
    assert!(cache.get("a").is_some());
    cache.set("c".into(), "/c", result_for("/c"));

    assert_eq!(cache.len(), 2);
    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
    assert!(cache.get("c").is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn overwriting_a_key_does_not_evict() {
    let cache = cache(1, Duration::from_secs(60));
    cache.set("a".into(), "/a", result_for("/a"));
    cache.set("a".into(), "/a", result_for("/a"));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn expired_entry_is_a_miss_and_removed() {
    let cache = cache(10, Duration::from_millis(20));
    cache.set("k".into(), "/repo", result_for("/repo"));
    std::thread::sleep(Duration::from_millis(40));

    assert!(cache.get("k").is_none());
    assert!(cache.is_empty());
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn reads_do_not_extend_expiry_by_default() {
    let cache = cache(10, Duration::from_millis(150));
    cache.set("k".into(), "/repo", result_for("/repo"));

    std::thread::sleep(Duration::from_millis(100));
    assert!(cache.get("k").is_some());

    // Past the original expiry, still inside a TTL measured from the read.
    std::thread::sleep(Duration::from_millis(100));
    assert!(cache.get("k").is_none());
    assert_eq!(cache.stats().expirations, 1);
}

#[test]
fn refresh_on_read_pushes_expiry_out() {
    let cache = refreshing_cache(Duration::from_millis(150));
    cache.set("k".into(), "/repo", result_for("/repo"));

    std::thread::sleep(Duration::from_millis(100));
    assert!(cache.get("k").is_some());

    std::thread::sleep(Duration::from_millis(100));
    assert!(cache.get("k").is_some());
    assert_eq!(cache.stats().expirations, 0);
}

#[test]
fn unbounded_ttl_is_accepted() {
    let cache = refreshing_cache(Duration::MAX);
    cache.set("k".into(), "/repo", result_for("/repo"));
    assert!(cache.get("k").is_some());
    assert!(cache.get("k").is_some());
}

#[test]
fn purge_expired_drops_only_stale_entries() {
    let cache = cache(10, Duration::from_millis(20));
    cache.set("old".into(), "/old", result_for("/old"));
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(cache.purge_expired(), 1);
    assert!(cache.is_empty());
}

#[test]
fn invalidate_path_matches_input_or_normalized_path() {
    let cache = cache(10, Duration::from_secs(60));
    cache.set("a".into(), "/repo/./a", result_for("/repo/a"));
    cache.set("b".into(), "/repo/b", result_for("/repo/b"));

    assert_eq!(cache.invalidate_path("/repo/a"), 1);
    assert_eq!(cache.invalidate_path("/repo/b"), 1);
    assert!(cache.is_empty());
}

#[test]
fn invalidate_pattern_uses_regex() {
    let cache = cache(10, Duration::from_secs(60));
    cache.set("a".into(), "/work/alpha", result_for("/work/alpha"));
    cache.set("b".into(), "/work/beta", result_for("/work/beta"));
    cache.set("c".into(), "/home/gamma", result_for("/home/gamma"));

    assert_eq!(cache.invalidate_pattern("^/work/").expect("pattern"), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn invalid_pattern_is_invalid_argument() {
    let cache = ValidationCache::default();
    let err = cache.invalidate_pattern("(unclosed").expect_err("bad regex");
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[test]
fn clear_keeps_counters() {
    let cache = cache(10, Duration::from_secs(60));
    cache.set("k".into(), "/repo", result_for("/repo"));
    assert!(cache.get("k").is_some());
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn stats_track_validation_time() {
    let cache = ValidationCache::default();
    cache.record_validation(Duration::from_millis(10));
    cache.record_validation(Duration::from_millis(30));
    let stats = cache.stats();
    assert_eq!(stats.validations, 2);
    assert!((stats.average_validation_time_ms - 20.0).abs() < 1e-6);
    assert_eq!(stats.max_entries, 1000);
}

#[test]
fn stats_serialize_in_camel_case() {
    let json = serde_json::to_value(ValidationCache::default().stats()).expect("serialize");
    assert!(json.get("hitRate").is_some());
    assert!(json.get("maxEntries").is_some());
    assert!(json.get("averageValidationTimeMs").is_some());
}

#[test]
fn key_is_stable_hex_digest() {
    let posix = PlatformProfile::posix();
    let key = cache_key("/repo", &posix, 30_000);
    assert_eq!(key, cache_key("/repo", &posix, 30_000));
    assert_ne!(key, cache_key("/repo2", &posix, 30_000));
    assert!(key.chars().all(|ch| ch.is_ascii_hexdigit()));
}
