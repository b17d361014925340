//! Progress reporting for a single validation run.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Pipeline stage a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// Syntax checks against the platform profile.
    FormatValidation,
    /// Separator and dot-segment canonicalization.
    Normalization,
    /// Single stat call.
    ExistenceCheck,
    /// Access probes (only when the path exists).
    PermissionCheck,
    /// Result assembly.
    Finalization,
    /// Run finished.
    Completed,
}

/// One progress event delivered to the caller's callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Stage the event belongs to.
    pub stage: ValidationStage,
    /// Overall completion, 0–100; non-decreasing within a run.
    pub percentage: u8,
    /// Short description.
    pub message: String,
}

/// Shared progress callback.
#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(&ProgressUpdate) + Send + Sync>);

impl ProgressCallback {
    /// Wrap a closure.
    #[must_use]
    pub fn new(callback: impl Fn(&ProgressUpdate) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Deliver an event.
    pub fn emit(&self, stage: ValidationStage, percentage: u8, message: &str) {
        (self.0)(&ProgressUpdate {
            stage,
            percentage,
            message: message.to_owned(),
        });
    }
}

impl Debug for ProgressCallback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressCallback")
    }
}
