//! Integration tests for result caching behind `PathHandler`.

use std::time::Duration;

use repo_path_guard::path::HandlerSettings;
use repo_path_guard::{GlobalConfig, PathHandler, PlatformProfile, ValidateOptions};

use super::test_helpers::{handler_with_cache, path_string, posix_handler};

#[tokio::test]
async fn second_validation_of_existing_path_is_a_hit() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let path = path_string(temp.path());

    let first = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("first");
    let second = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("second");

    assert_eq!(first, second);
    let stats = handler.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
    assert_eq!(stats.validations, 1);
}

#[tokio::test]
async fn nonexistent_paths_are_never_cached() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let missing = path_string(&temp.path().join("later"));

    for _ in 0..2 {
        handler
            .validate_path(&missing, &ValidateOptions::default())
            .await
            .expect("validate");
    }

    let stats = handler.cache_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn path_created_after_a_miss_is_seen() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let dir = temp.path().join("fresh");
    let path = path_string(&dir);

    let before = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("before");
    assert!(!before.metadata().exists());

    std::fs::create_dir(&dir).expect("mkdir");
    let after = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("after");
    assert!(after.metadata().exists());
}

#[tokio::test]
async fn format_failures_are_not_cached() {
    let handler = posix_handler();
    handler
        .validate_path("", &ValidateOptions::default())
        .await
        .expect("validate");
    assert_eq!(handler.cache_stats().size, 0);
}

#[tokio::test]
async fn timeout_is_part_of_the_key() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let path = path_string(temp.path());

    for secs in [5, 10] {
        handler
            .validate_path(&path, &ValidateOptions::with_timeout(Duration::from_secs(secs)))
            .await
            .expect("validate");
    }
    assert_eq!(handler.cache_stats().size, 2);
}

#[tokio::test]
async fn invalidate_path_accepts_raw_or_normalized_spelling() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let normalized = path_string(temp.path());
    let raw = format!("{normalized}/sub/..");

    handler
        .validate_path(&raw, &ValidateOptions::default())
        .await
        .expect("validate");
    assert_eq!(handler.cache_stats().size, 1);
    assert_eq!(handler.invalidate_path(&normalized), 1);
    assert_eq!(handler.cache_stats().size, 0);

    handler
        .validate_path(&raw, &ValidateOptions::default())
        .await
        .expect("validate");
    assert_eq!(handler.invalidate_path(&raw), 1);
}

#[tokio::test]
async fn invalidate_pattern_and_clear() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    for name in ["alpha", "beta", "gamma"] {
        let dir = temp.path().join(name);
        std::fs::create_dir(&dir).expect("mkdir");
        handler
            .validate_path(&path_string(&dir), &ValidateOptions::default())
            .await
            .expect("validate");
    }
    assert_eq!(handler.cache_stats().size, 3);

    assert_eq!(handler.invalidate_pattern("(alpha|beta)$").expect("pattern"), 2);
    assert_eq!(handler.cache_stats().size, 1);

    handler.clear_cache();
    assert_eq!(handler.cache_stats().size, 0);
    assert!(handler.invalidate_pattern("[").is_err());
}

#[tokio::test]
async fn disabled_cache_never_stores() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = PathHandler::new(
        PlatformProfile::posix(),
        HandlerSettings {
            cache_enabled: false,
            ..HandlerSettings::default()
        },
    );
    let path = path_string(temp.path());
    for _ in 0..2 {
        handler
            .validate_path(&path, &ValidateOptions::default())
            .await
            .expect("validate");
    }
    let stats = handler.cache_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hits + stats.misses, 0);
}

#[tokio::test]
async fn expired_entry_is_revalidated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = handler_with_cache(10, Duration::from_millis(30));
    let path = path_string(temp.path());

    handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("first");
    tokio::time::sleep(Duration::from_millis(60)).await;
    handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("second");

    let stats = handler.cache_stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.validations, 2);
}

#[tokio::test]
async fn capacity_pressure_evicts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = handler_with_cache(1, Duration::from_secs(60));
    for name in ["one", "two"] {
        let dir = temp.path().join(name);
        std::fs::create_dir(&dir).expect("mkdir");
        handler
            .validate_path(&path_string(&dir), &ValidateOptions::default())
            .await
            .expect("validate");
    }
    let stats = handler.cache_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.evictions, 1);
}

#[tokio::test]
async fn huge_configured_ttl_caches_without_expiring() {
    let config = GlobalConfig::from_toml_str("[cache]\nttl_seconds = 9223372036854775807")
        .expect("config accepted");
    let handler = PathHandler::from_config(&config).expect("handler");
    let temp = tempfile::tempdir().expect("tempdir");
    let path = path_string(temp.path());

    let first = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("first");
    let second = handler
        .validate_path(&path, &ValidateOptions::default())
        .await
        .expect("second");

    assert!(first.is_valid(), "{:?}", first.errors());
    assert_eq!(first, second);
    assert_eq!(handler.cache_stats().hits, 1);
}
