//! Integration tests for end-to-end path validation through `PathHandler`.

use std::sync::Arc;

use repo_path_guard::audit::{AuditLogger, JsonlAuditWriter};
use repo_path_guard::models::{ErrorCode, WarningCode};
use repo_path_guard::path::HandlerSettings;
use repo_path_guard::{AppError, GlobalConfig, PathHandler, PlatformProfile, ValidateOptions};

use super::test_helpers::{path_string, posix_handler};

#[tokio::test]
async fn existing_directory_is_valid_with_metadata() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = posix_handler();
    let raw = format!("{}/./", path_string(temp.path()));

    let result = handler
        .validate_path(&raw, &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(result.normalized_path(), Some(path_string(temp.path()).as_str()));
    let metadata = result.metadata();
    assert!(metadata.exists());
    assert!(metadata.is_directory());
    assert!(metadata.size().is_none());
    assert!(metadata.permissions().read);
}

#[tokio::test]
async fn existing_file_reports_size() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("README.md");
    std::fs::write(&file, b"hello").expect("write");

    let result = posix_handler()
        .validate_path(&path_string(&file), &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.is_valid());
    assert!(!result.metadata().is_directory());
    assert_eq!(result.metadata().size(), Some(5));
}

#[tokio::test]
async fn missing_path_is_still_valid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = path_string(&temp.path().join("not-yet-cloned"));

    let result = posix_handler()
        .validate_path(&missing, &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.is_valid());
    assert_eq!(result.normalized_path(), Some(missing.as_str()));
    assert!(!result.metadata().exists());
    assert!(!result.metadata().permissions().read);
}

#[tokio::test]
async fn format_errors_skip_normalization() {
    let result = posix_handler()
        .validate_path("/tmp/a\0b", &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(!result.is_valid());
    assert!(result.has_error(ErrorCode::NullByteInPath));
    assert!(result.normalized_path().is_none());
    assert!(!result.metadata().exists());
}

#[tokio::test]
async fn empty_path_is_invalid_input() {
    let result = posix_handler()
        .validate_path("", &ValidateOptions::default())
        .await
        .expect("validate");
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn windows_rules_report_reserved_names_and_characters() {
    let handler = PathHandler::new(PlatformProfile::windows(), HandlerSettings::default());
    let result = handler
        .validate_path(r"C:\Users\test\CON\a|b", &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.has_error(ErrorCode::ReservedName));
    assert!(result.has_error(ErrorCode::InvalidCharacters));
    assert!(result.normalized_path().is_none());
}

#[tokio::test]
async fn windows_path_is_normalized_and_probed_as_missing_here() {
    let handler = PathHandler::new(PlatformProfile::windows(), HandlerSettings::default());
    let result = handler
        .validate_path("c:/Users/test/./repo/../project", &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(result.normalized_path(), Some(r"C:\Users\test\project"));
    if cfg!(not(windows)) {
        assert!(!result.metadata().exists());
    }
}

#[tokio::test]
async fn very_long_posix_path_warns_but_stays_valid() {
    let long = format!("/{}", "d/".repeat(2100));
    let result = posix_handler()
        .validate_path(&long, &ValidateOptions::default())
        .await
        .expect("validate");

    assert!(result.is_valid());
    assert_eq!(result.warnings()[0].code, WarningCode::VeryLongPath);
}

// ── Repository root ──────────────────────────────────────────

#[tokio::test]
async fn repository_root_accepts_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = posix_handler()
        .validate_repository_root(&path_string(temp.path()), &ValidateOptions::default())
        .await
        .expect("validate");
    assert!(result.is_valid(), "{:?}", result.errors());
}

#[tokio::test]
async fn repository_root_rejects_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("Cargo.toml");
    std::fs::write(&file, b"[package]").expect("write");

    let result = posix_handler()
        .validate_repository_root(&path_string(&file), &ValidateOptions::default())
        .await
        .expect("validate");
    assert!(!result.is_valid());
    assert!(result.has_error(ErrorCode::NotDirectory));
}

#[tokio::test]
async fn repository_root_rejects_missing_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = posix_handler()
        .validate_repository_root(
            &path_string(&temp.path().join("missing")),
            &ValidateOptions::default(),
        )
        .await
        .expect("validate");
    assert!(result.has_error(ErrorCode::PathNotFound));
}

#[tokio::test]
async fn repository_root_does_not_stack_errors_on_format_failure() {
    let result = posix_handler()
        .validate_repository_root("", &ValidateOptions::default())
        .await
        .expect("validate");
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].code, ErrorCode::InvalidInput);
}

// ── Permissions, normalization, batch ────────────────────────

#[tokio::test]
async fn check_permissions_on_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = posix_handler()
        .check_permissions(&path_string(temp.path()), &ValidateOptions::default())
        .await
        .expect("check");
    assert!(result.can_read && result.can_write && result.can_execute);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn check_permissions_on_empty_path_is_invalid_input() {
    let result = posix_handler()
        .check_permissions("", &ValidateOptions::default())
        .await
        .expect("check");
    assert_eq!(result.errors[0].code, ErrorCode::InvalidInput);
    assert!(!result.can_read);
}

#[tokio::test]
async fn normalize_and_resolve_use_active_profile() {
    let handler = posix_handler();
    assert_eq!(handler.normalize_path(r"/a\b/../c").expect("normalize"), "/a/c");
    assert_eq!(
        handler
            .resolve_relative_path("x/../y", Some("/base"))
            .expect("resolve"),
        "/base/y"
    );
    assert!(matches!(
        handler.normalize_path(""),
        Err(AppError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn batch_preserves_input_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = vec![
        path_string(temp.path()),
        String::new(),
        path_string(&temp.path().join("missing")),
    ];

    let results = posix_handler()
        .validate_many(&paths, &ValidateOptions::default())
        .await;

    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().expect("first");
    assert!(first.metadata().exists());
    let second = results[1].as_ref().expect("second");
    assert!(second.has_error(ErrorCode::InvalidInput));
    let third = results[2].as_ref().expect("third");
    assert!(third.is_valid() && !third.metadata().exists());
}

// ── Configuration and audit ──────────────────────────────────

#[tokio::test]
async fn handler_from_config_writes_audit_entries() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_dir = temp.path().join("logs");
    let toml = format!(
        "platform = \"linux\"\n[audit]\nenabled = true\nlog_dir = '{}'\n",
        log_dir.display()
    );
    let config = GlobalConfig::from_toml_str(&toml).expect("config");
    let handler = PathHandler::from_config(&config).expect("handler");

    handler
        .validate_path(&path_string(temp.path()), &ValidateOptions::default())
        .await
        .expect("validate");
    handler.flush_audit().await.expect("flush");

    let files: Vec<_> = std::fs::read_dir(&log_dir)
        .expect("log dir")
        .map(|entry| entry.expect("entry").path())
        .collect();
    assert_eq!(files.len(), 1);
    let text = std::fs::read_to_string(&files[0]).expect("read");
    let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
    assert_eq!(value["operation"], "validate_path");
    assert_eq!(value["success"], true);
    assert!(value["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn caller_correlation_id_reaches_audit_trail() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer: Arc<dyn AuditLogger> =
        Arc::new(JsonlAuditWriter::new(temp.path().join("audit")).expect("writer"));
    let handler = posix_handler().with_audit_logger(writer);

    let options = ValidateOptions {
        correlation_id: Some("req-42".into()),
        ..ValidateOptions::default()
    };
    handler
        .check_permissions(&path_string(temp.path()), &options)
        .await
        .expect("check");
    handler.flush_audit().await.expect("flush");

    let dir = temp.path().join("audit");
    let file = std::fs::read_dir(&dir)
        .expect("audit dir")
        .next()
        .expect("one file")
        .expect("entry")
        .path();
    let text = std::fs::read_to_string(file).expect("read");
    assert!(text.contains("\"correlation_id\":\"req-42\""));
    assert!(text.contains("\"operation\":\"check_permissions\""));
}
