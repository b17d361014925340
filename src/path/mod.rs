//! Path validation engine.
//!
//! Leaf-first: [`format`] and [`normalize`] are pure string logic,
//! [`probe`] and [`permissions`] touch the filesystem, [`orchestrator`]
//! sequences them with progress, cancellation, and timeout, [`cache`]
//! memoizes results, and [`handler`] is the service object handed to
//! collaborators.

pub mod cache;
pub mod format;
pub mod handler;
pub mod normalize;
pub mod orchestrator;
pub mod permissions;
pub mod probe;

pub use cache::{CacheSettings, CacheStats, ValidationCache};
pub use format::{validate_format, FormatReport};
pub use handler::{HandlerSettings, PathHandler};
pub use orchestrator::{ValidateOptions, ValidationOrchestrator};
pub use permissions::PermissionResolver;
pub use probe::{FileAttributes, HostFs, OsFs};
