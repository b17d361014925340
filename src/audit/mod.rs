//! Structured audit trail of validation calls.
//!
//! Provides the [`AuditLogger`] trait and associated types. The primary
//! implementation, [`JsonlAuditWriter`], queues entries to a background task
//! that appends JSONL records to daily-rotating files. [`retention`] purges
//! files past their age limit.
//! Audit failures are logged and swallowed by callers; they never change a
//! validation outcome.

pub mod retention;
pub mod writer;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::models::{ErrorCode, PermissionResult, ValidationResult, WarningCode};

/// Engine operation that produced an audit entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    /// `validate_path`.
    ValidatePath,
    /// `validate_repository_root`.
    ValidateRepository,
    /// `check_permissions`.
    CheckPermissions,
}

/// A structured record of one engine call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Operation performed.
    pub operation: AuditOperation,
    /// Input path as supplied by the caller.
    pub path: String,
    /// Correlation identifier shared with the log span.
    pub correlation_id: Option<String>,
    /// Normalized path, when normalization ran.
    pub normalized_path: Option<String>,
    /// Overall outcome.
    pub success: Option<bool>,
    /// Error codes in the result.
    #[serde(default)]
    pub error_codes: Vec<ErrorCode>,
    /// Warning codes in the result.
    #[serde(default)]
    pub warning_codes: Vec<WarningCode>,
    /// Wall time of the call, in milliseconds.
    pub duration_ms: Option<u64>,
}

impl AuditEntry {
    /// Construct a minimal audit entry.
    #[must_use]
    pub fn new(operation: AuditOperation, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            path: path.into(),
            correlation_id: None,
            normalized_path: None,
            success: None,
            error_codes: Vec::new(),
            warning_codes: Vec::new(),
            duration_ms: None,
        }
    }

    /// Set the correlation identifier.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Copy outcome fields from a validation result.
    #[must_use]
    pub fn with_validation(mut self, result: &ValidationResult) -> Self {
        self.normalized_path = result.normalized_path().map(str::to_owned);
        self.success = Some(result.is_valid());
        self.error_codes = result.errors().iter().map(|err| err.code).collect();
        self.warning_codes = result.warnings().iter().map(|warn| warn.code).collect();
        self
    }

    /// Copy outcome fields from a permission result.
    #[must_use]
    pub fn with_permissions(mut self, result: &PermissionResult) -> Self {
        self.success = Some(result.errors.is_empty());
        self.error_codes = result.errors.iter().map(|err| err.code).collect();
        self
    }

    /// Set the call duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Sink for structured audit entries.
///
/// `log_entry` is called from async validation paths and must not block;
/// implementations hand slow I/O to a task of their own.
pub trait AuditLogger: Send + Sync {
    /// Queue a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry can no longer be accepted.
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()>;

    /// Resolve once every entry queued before this call is persisted.
    fn flush(&self) -> BoxFuture<'_, crate::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

pub use writer::JsonlAuditWriter;
