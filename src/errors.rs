//! Error types shared across the application.
//!
//! Expected user-input problems (bad syntax, missing paths, denied access)
//! are never reported through [`AppError`]; they travel in-band as
//! [`crate::models::PathError`] entries. `AppError` covers programmer errors,
//! timing conditions, and infrastructure failures.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Caller supplied an argument the operation cannot accept.
    InvalidArgument(String),
    /// Operation observed a signalled cancellation token.
    Cancelled(String),
    /// Operation did not settle before its deadline.
    Timeout(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// HTTP controller failure (bind, serve).
    Http(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidArgument(format!("invalid pattern: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
