#![forbid(unsafe_code)]

//! Cross-platform validation of repository root paths.
//!
//! Checks path syntax under Windows or POSIX rules, normalizes it, probes
//! existence and access permissions, and caches results. Collaborators talk
//! to a single shared [`PathHandler`].

pub mod audit;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod path;
pub mod platform;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use path::{PathHandler, ValidateOptions};
pub use platform::PlatformProfile;
