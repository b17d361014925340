//! Domain model module declarations.

pub mod codes;
pub mod progress;
pub mod result;

pub use codes::{ErrorCode, WarningCode};
pub use progress::{ProgressCallback, ProgressUpdate, ValidationStage};
pub use result::{
    PathError, PathMetadata, PathWarning, PermissionError, PermissionResult, Permissions,
    ValidationResult,
};
