//! Existence probe and the host filesystem port it stats through.
//!
//! [`HostFs`] holds the two blocking primitives the engine needs (stat and
//! access checks). [`OsFs`] backs them with the real filesystem; tests swap
//! in their own implementation. Both primitives are driven from
//! `spawn_blocking` so a slow disk suspends the calling task only.

use std::fmt::Debug;
use std::fs::Metadata;
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::models::{PathMetadata, Permissions};

/// Facts read by one stat call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileAttributes {
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Size in bytes.
    pub len: u64,
    /// Read-only attribute, when the host could report it.
    pub readonly: Option<bool>,
    /// Numeric `(uid, gid)`, when the host could report them.
    pub ownership: Option<(u32, u32)>,
}

impl FileAttributes {
    /// Extract the attributes the engine uses from `meta`.
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            len: meta.len(),
            readonly: Some(meta.permissions().readonly()),
            ownership: ownership(meta),
        }
    }

    /// Existence metadata for a path these attributes were read from.
    #[must_use]
    pub const fn path_metadata(&self) -> PathMetadata {
        PathMetadata::present(self.is_dir, Some(self.len))
    }
}

#[cfg(unix)]
fn ownership(meta: &Metadata) -> Option<(u32, u32)> {
    use std::os::unix::fs::MetadataExt;

    Some((meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
fn ownership(_meta: &Metadata) -> Option<(u32, u32)> {
    None
}

/// Blocking filesystem primitives used by the probe and the permission
/// resolver.
pub trait HostFs: Send + Sync + Debug {
    /// Stat `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when `path` cannot be stat'ed.
    fn stat(&self, path: &str) -> io::Result<FileAttributes>;

    /// Check read, write, and execute access for the current process.
    fn access(&self, path: &str) -> Permissions;
}

/// [`HostFs`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl HostFs for OsFs {
    fn stat(&self, path: &str) -> io::Result<FileAttributes> {
        std::fs::metadata(path).map(|meta| FileAttributes::from_metadata(&meta))
    }

    #[cfg(unix)]
    fn access(&self, path: &str) -> Permissions {
        use nix::unistd::{access, AccessFlags};

        Permissions {
            read: access(path, AccessFlags::R_OK).is_ok(),
            write: access(path, AccessFlags::W_OK).is_ok(),
            execute: access(path, AccessFlags::X_OK).is_ok(),
        }
    }

    /// Without `access(2)`: readable if it can be opened or listed, writable
    /// unless read-only, executable whenever it exists.
    #[cfg(not(unix))]
    fn access(&self, path: &str) -> Permissions {
        let Ok(meta) = std::fs::metadata(path) else {
            return Permissions::default();
        };
        let read = if meta.is_dir() {
            std::fs::read_dir(path).is_ok()
        } else {
            std::fs::File::open(path).is_ok()
        };
        Permissions {
            read,
            write: !meta.permissions().readonly(),
            execute: true,
        }
    }
}

/// Stat `path` once on a blocking worker.
///
/// Every failure (not found, access denied, I/O error, a lost worker)
/// collapses to `None`; distinguishing causes is the permission resolver's
/// job.
pub async fn probe(host: &Arc<dyn HostFs>, path: &str) -> Option<FileAttributes> {
    let host = Arc::clone(host);
    let owned = path.to_owned();
    match tokio::task::spawn_blocking(move || host.stat(&owned)).await {
        Ok(Ok(attributes)) => Some(attributes),
        Ok(Err(err)) => {
            debug!(path, %err, "stat failed, treating path as missing");
            None
        }
        Err(err) => {
            debug!(path, %err, "stat task failed, treating path as missing");
            None
        }
    }
}
