//! Closed enumerations of error and warning codes.
//!
//! Codes serialize as `SCREAMING_SNAKE_CASE` strings and are consumed by
//! downstream message formatting, so the wire names are stable.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Every error code the engine may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Empty input.
    InvalidInput,
    /// `\0` somewhere in the path.
    NullByteInPath,
    /// Windows path longer than 260 characters.
    PathTooLong,
    /// Component is a Windows device name.
    ReservedName,
    /// Windows component ending in a space or dot.
    InvalidComponentEnding,
    /// Malformed drive-letter prefix.
    InvalidDriveLetter,
    /// Windows-forbidden punctuation.
    InvalidCharacters,
    /// ASCII control characters.
    ControlCharacters,
    /// `\\` prefix without server and share.
    InvalidUncPath,
    /// Nothing exists at the path.
    PathNotFound,
    /// Read access denied (Windows only).
    ReadPermissionDenied,
    /// Write access denied (Windows only).
    WritePermissionDenied,
    /// Path lies in a protected system directory.
    SystemPathAccess,
    /// Read-only attribute set.
    ReadOnlyFile,
    /// Ownership metadata unavailable.
    OwnershipInfoError,
    /// Permission resolver failed unexpectedly.
    PermissionCheckError,
    /// Windows-specific permission heuristics failed.
    WindowsPermissionCheckError,
    /// Caller cancelled the operation.
    OperationCancelled,
    /// Operation exceeded its deadline.
    TimeoutError,
    /// Orchestration failed unexpectedly.
    ValidationError,
    /// Path exists but is not a directory.
    NotDirectory,
}

impl ErrorCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NullByteInPath => "NULL_BYTE_IN_PATH",
            Self::PathTooLong => "PATH_TOO_LONG",
            Self::ReservedName => "RESERVED_NAME",
            Self::InvalidComponentEnding => "INVALID_COMPONENT_ENDING",
            Self::InvalidDriveLetter => "INVALID_DRIVE_LETTER",
            Self::InvalidCharacters => "INVALID_CHARACTERS",
            Self::ControlCharacters => "CONTROL_CHARACTERS",
            Self::InvalidUncPath => "INVALID_UNC_PATH",
            Self::PathNotFound => "PATH_NOT_FOUND",
            Self::ReadPermissionDenied => "READ_PERMISSION_DENIED",
            Self::WritePermissionDenied => "WRITE_PERMISSION_DENIED",
            Self::SystemPathAccess => "SYSTEM_PATH_ACCESS",
            Self::ReadOnlyFile => "READ_ONLY_FILE",
            Self::OwnershipInfoError => "OWNERSHIP_INFO_ERROR",
            Self::PermissionCheckError => "PERMISSION_CHECK_ERROR",
            Self::WindowsPermissionCheckError => "WINDOWS_PERMISSION_CHECK_ERROR",
            Self::OperationCancelled => "OPERATION_CANCELLED",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotDirectory => "NOT_DIRECTORY",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory codes that never affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// Windows component longer than 255 characters.
    ComponentTooLong,
    /// POSIX path longer than 4096 characters.
    VeryLongPath,
}

impl WarningCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComponentTooLong => "COMPONENT_TOO_LONG",
            Self::VeryLongPath => "VERY_LONG_PATH",
        }
    }
}

impl Display for WarningCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
