//! Permission resolution for an existing path.
//!
//! Access is probed with the host's access-check primitive (`access(2)` on
//! Unix hosts). Ownership and the Windows heuristics (system directory
//! prefixes, read-only attribute) come from the stat already taken for the
//! existence check, so a resolution costs at most one stat and one access
//! round-trip. Each step is independent: a failure in one is recorded and
//! the others still run.

use std::sync::Arc;

use tracing::{debug, warn};

use super::probe::{self, FileAttributes, HostFs, OsFs};
use crate::models::{ErrorCode, PathError, PermissionError, PermissionResult, Permissions};
use crate::platform::PlatformProfile;
use crate::{AppError, Result};

/// Owner/group placeholder when the platform has no meaningful value.
pub const WINDOWS_OWNER_PLACEHOLDER: &str = "N/A (Windows)";

/// Owner/group placeholder when the value could not be read.
pub const UNKNOWN_OWNER: &str = "unknown";

/// Resolves read/write/execute access, ownership, and platform flags.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    profile: PlatformProfile,
    host: Arc<dyn HostFs>,
}

impl PermissionResolver {
    /// Construct a resolver for `profile` over the real filesystem.
    #[must_use]
    pub fn new(profile: PlatformProfile) -> Self {
        Self::with_host(profile, Arc::new(OsFs))
    }

    /// Construct a resolver that stats and checks access through `host`.
    #[must_use]
    pub fn with_host(profile: PlatformProfile, host: Arc<dyn HostFs>) -> Self {
        Self { profile, host }
    }

    /// Filesystem port shared with the existence probe.
    #[must_use]
    pub const fn host(&self) -> &Arc<dyn HostFs> {
        &self.host
    }

    /// Stat `path`, then resolve its permissions.
    ///
    /// Never fails: a missing path yields `PATH_NOT_FOUND`, and unexpected
    /// internal errors become a single `PERMISSION_CHECK_ERROR` entry.
    pub async fn resolve(&self, path: &str) -> PermissionResult {
        match probe::probe(&self.host, path).await {
            Some(attributes) => self.resolve_existing(path, &attributes).await,
            None => PermissionResult::denied(
                self.placeholder(),
                self.placeholder(),
                vec![PathError::new(ErrorCode::PathNotFound, "Path does not exist")
                    .with_details(path.to_owned())
                    .with_suggestions([
                        "Check the path for typos",
                        "Create the directory before using it",
                    ])],
            ),
        }
    }

    /// Resolve permissions for a path already stat'ed as `attributes`.
    ///
    /// Only the access check touches the filesystem.
    pub async fn resolve_existing(
        &self,
        path: &str,
        attributes: &FileAttributes,
    ) -> PermissionResult {
        match self.try_resolve(path, attributes).await {
            Ok(result) => result,
            Err(err) => {
                warn!(path, %err, "permission check failed");
                PermissionResult::denied(
                    UNKNOWN_OWNER,
                    UNKNOWN_OWNER,
                    vec![PathError::new(
                        ErrorCode::PermissionCheckError,
                        "Failed to check path permissions",
                    )
                    .with_details(err.to_string())],
                )
            }
        }
    }

    async fn try_resolve(
        &self,
        path: &str,
        attributes: &FileAttributes,
    ) -> Result<PermissionResult> {
        let mut errors: Vec<PermissionError> = Vec::new();

        let access = self.check_access(path).await?;
        if self.profile.is_windows() {
            if !access.read {
                errors.push(
                    PathError::new(ErrorCode::ReadPermissionDenied, "Read access denied")
                        .with_suggestions(["Check the folder's security settings"]),
                );
            }
            if !access.write {
                errors.push(
                    PathError::new(ErrorCode::WritePermissionDenied, "Write access denied")
                        .with_suggestions(["Run with an account that can write to this folder"]),
                );
            }
        }

        let (owner, group) = self.ownership(path, attributes, &mut errors);

        let mut result = PermissionResult {
            can_read: access.read,
            can_write: access.write,
            can_execute: access.execute,
            owner,
            group,
            errors,
        };

        if self.profile.is_windows() {
            self.apply_windows_checks(path, attributes, &mut result);
        }

        Ok(result)
    }

    async fn check_access(&self, path: &str) -> Result<Permissions> {
        let host = Arc::clone(&self.host);
        let owned = path.to_owned();
        tokio::task::spawn_blocking(move || host.access(&owned))
            .await
            .map_err(|err| AppError::Io(format!("access check task failed: {err}")))
    }

    fn placeholder(&self) -> &'static str {
        if self.profile.is_windows() {
            WINDOWS_OWNER_PLACEHOLDER
        } else {
            UNKNOWN_OWNER
        }
    }

    fn ownership(
        &self,
        path: &str,
        attributes: &FileAttributes,
        errors: &mut Vec<PermissionError>,
    ) -> (String, String) {
        if self.profile.is_windows() {
            return (
                WINDOWS_OWNER_PLACEHOLDER.to_owned(),
                WINDOWS_OWNER_PLACEHOLDER.to_owned(),
            );
        }
        if let Some((uid, gid)) = attributes.ownership {
            return (uid.to_string(), gid.to_string());
        }

        debug!(path, "ownership not reported by stat");
        errors.push(
            PathError::new(
                ErrorCode::OwnershipInfoError,
                "Could not read ownership information",
            )
            .with_details(path.to_owned()),
        );
        (UNKNOWN_OWNER.to_owned(), UNKNOWN_OWNER.to_owned())
    }

    fn apply_windows_checks(
        &self,
        path: &str,
        attributes: &FileAttributes,
        result: &mut PermissionResult,
    ) {
        if self.profile.is_system_path(path) {
            result.errors.push(
                PathError::new(
                    ErrorCode::SystemPathAccess,
                    "Path is inside a protected system directory",
                )
                .with_details(path.to_owned())
                .with_suggestions(["Choose a folder under your user profile instead"]),
            );
        }

        match attributes.readonly {
            Some(true) => {
                result.can_write = false;
                result.errors.push(
                    PathError::new(ErrorCode::ReadOnlyFile, "Path is marked read-only")
                        .with_suggestions([
                            "Clear the read-only attribute in the file properties",
                        ]),
                );
            }
            Some(false) => {}
            None => result.errors.push(
                PathError::new(
                    ErrorCode::WindowsPermissionCheckError,
                    "Could not read file attributes",
                )
                .with_details(path.to_owned()),
            ),
        }
    }
}
