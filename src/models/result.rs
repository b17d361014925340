//! Validation and permission result value objects.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::codes::{ErrorCode, WarningCode};

/// A blocking problem found while validating a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathError {
    /// Stable identifier.
    pub code: ErrorCode,
    /// Human-readable summary.
    pub message: String,
    /// Extra context, such as the offending characters or measured length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Remediation hints for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl PathError {
    /// Construct an error with no details or suggestions.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            suggestions: None,
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach remediation suggestions.
    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = Some(suggestions.into_iter().map(Into::into).collect());
        self
    }
}

/// Errors reported by the permission resolver share the same shape.
pub type PermissionError = PathError;

/// A non-blocking advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathWarning {
    /// Stable identifier.
    pub code: WarningCode,
    /// Human-readable summary.
    pub message: String,
    /// Extra context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PathWarning {
    /// Construct a warning with details.
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }
}

/// Read/write/execute flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Readable by the current process.
    pub read: bool,
    /// Writable by the current process.
    pub write: bool,
    /// Executable (traversable for directories) by the current process.
    pub execute: bool,
}

/// Filesystem facts gathered about a path.
///
/// Constructors enforce the invariants: a missing path has no permissions
/// and no size, and a directory never reports a size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMetadata {
    exists: bool,
    is_directory: bool,
    permissions: Permissions,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl PathMetadata {
    /// Metadata for a path that does not exist.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            exists: false,
            is_directory: false,
            permissions: Permissions {
                read: false,
                write: false,
                execute: false,
            },
            size: None,
        }
    }

    /// Metadata for an existing path; `size` is dropped for directories.
    #[must_use]
    pub const fn present(is_directory: bool, size: Option<u64>) -> Self {
        Self {
            exists: true,
            is_directory,
            permissions: Permissions {
                read: false,
                write: false,
                execute: false,
            },
            size: if is_directory { None } else { size },
        }
    }

    /// Copy with the given permissions; ignored when the path is missing.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        if self.exists {
            self.permissions = permissions;
        }
        self
    }

    /// Whether the path exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    /// Whether the path is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Access flags.
    #[must_use]
    pub const fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// File size in bytes; absent for directories and missing paths.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Outcome of a single validation call.
///
/// Immutable once built; validity is always derived from `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    normalized_path: Option<String>,
    errors: Vec<PathError>,
    warnings: Vec<PathWarning>,
    metadata: PathMetadata,
}

impl ValidationResult {
    /// Assemble a result from its parts.
    #[must_use]
    pub fn new(
        normalized_path: Option<String>,
        errors: Vec<PathError>,
        warnings: Vec<PathWarning>,
        metadata: PathMetadata,
    ) -> Self {
        Self {
            normalized_path,
            errors,
            warnings,
            metadata,
        }
    }

    /// Result carrying a single error and nothing else.
    #[must_use]
    pub fn from_error(error: PathError) -> Self {
        Self::new(None, vec![error], Vec::new(), PathMetadata::missing())
    }

    /// In-band form of a cancelled validation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::from_error(
            PathError::new(ErrorCode::OperationCancelled, "Path validation was cancelled")
                .with_suggestions(["Retry the operation"]),
        )
    }

    /// In-band form of a validation that exceeded `timeout_ms`.
    #[must_use]
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self::from_error(
            PathError::new(ErrorCode::TimeoutError, "Path validation timed out")
                .with_details(format!("Operation exceeded {timeout_ms}ms"))
                .with_suggestions([
                    "Check whether the path is on a slow or disconnected network drive",
                    "Retry with a larger timeout",
                ]),
        )
    }

    /// Copy of this result with `extra` appended to the errors.
    #[must_use]
    pub fn with_additional_errors(mut self, extra: impl IntoIterator<Item = PathError>) -> Self {
        self.errors.extend(extra);
        self
    }

    /// True iff no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Normalized form of the input, once normalization succeeded.
    #[must_use]
    pub fn normalized_path(&self) -> Option<&str> {
        self.normalized_path.as_deref()
    }

    /// Errors in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[PathError] {
        &self.errors
    }

    /// Warnings in the order they were found.
    #[must_use]
    pub fn warnings(&self) -> &[PathWarning] {
        &self.warnings
    }

    /// Filesystem facts.
    #[must_use]
    pub const fn metadata(&self) -> &PathMetadata {
        &self.metadata
    }

    /// Whether any error carries `code`.
    #[must_use]
    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|err| err.code == code)
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 5)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.serialize_field("normalizedPath", &self.normalized_path)?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.end()
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResult {
    /// Readable by the current process.
    pub can_read: bool,
    /// Writable by the current process.
    pub can_write: bool,
    /// Executable by the current process.
    pub can_execute: bool,
    /// Owner identifier, or a placeholder where none is meaningful.
    pub owner: String,
    /// Group identifier, or a placeholder where none is meaningful.
    pub group: String,
    /// Problems found while resolving permissions.
    pub errors: Vec<PermissionError>,
}

impl PermissionResult {
    /// All-false result with `owner`/`group` placeholders and the given errors.
    #[must_use]
    pub fn denied(
        owner: impl Into<String>,
        group: impl Into<String>,
        errors: Vec<PermissionError>,
    ) -> Self {
        Self {
            can_read: false,
            can_write: false,
            can_execute: false,
            owner: owner.into(),
            group: group.into(),
            errors,
        }
    }

    /// In-band form of a cancelled permission check.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::denied(
            "unknown",
            "unknown",
            vec![PathError::new(
                ErrorCode::OperationCancelled,
                "Permission check was cancelled",
            )],
        )
    }

    /// In-band form of a permission check that exceeded `timeout_ms`.
    #[must_use]
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self::denied(
            "unknown",
            "unknown",
            vec![PathError::new(ErrorCode::TimeoutError, "Permission check timed out")
                .with_details(format!("Operation exceeded {timeout_ms}ms"))],
        )
    }

    /// Access flags as a [`Permissions`] value.
    #[must_use]
    pub const fn permissions(&self) -> Permissions {
        Permissions {
            read: self.can_read,
            write: self.can_write,
            execute: self.can_execute,
        }
    }
}
