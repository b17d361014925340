//! Service object exposing the path engine to collaborators.
//!
//! One [`PathHandler`] is built at process startup and shared by handle
//! (`Arc<PathHandler>`) with the HTTP controller and the CLI, so every
//! consumer sees the same cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use super::cache::{CacheSettings, CacheStats, ValidationCache};
use super::format::{validate_format, FormatReport};
use super::normalize::{normalize, resolve_relative};
use super::orchestrator::{ValidateOptions, ValidationOrchestrator};
use super::probe::{HostFs, OsFs};
use crate::audit::{AuditEntry, AuditLogger, AuditOperation, JsonlAuditWriter};
use crate::config::GlobalConfig;
use crate::models::{ErrorCode, PathError, PermissionResult, ValidationResult};
use crate::platform::PlatformProfile;
use crate::Result;

/// Construction parameters for [`PathHandler`].
#[derive(Debug, Clone, Copy)]
pub struct HandlerSettings {
    /// Timeout applied when a call does not supply one.
    pub default_timeout: Duration,
    /// Whether results are cached.
    pub cache_enabled: bool,
    /// Cache tuning.
    pub cache: CacheSettings,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            cache_enabled: true,
            cache: CacheSettings::default(),
        }
    }
}

/// Path validation and permission-resolution service.
pub struct PathHandler {
    orchestrator: ValidationOrchestrator,
    cache: Arc<ValidationCache>,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl PathHandler {
    /// Build a handler for `profile`.
    #[must_use]
    pub fn new(profile: PlatformProfile, settings: HandlerSettings) -> Self {
        Self::with_host(profile, settings, Arc::new(OsFs))
    }

    /// Build a handler whose stat and access checks go through `host`.
    #[must_use]
    pub fn with_host(
        profile: PlatformProfile,
        settings: HandlerSettings,
        host: Arc<dyn HostFs>,
    ) -> Self {
        let cache = Arc::new(ValidationCache::new(settings.cache));
        let orchestrator = ValidationOrchestrator::with_host(
            profile,
            settings.cache_enabled.then(|| Arc::clone(&cache)),
            settings.default_timeout,
            host,
        );
        Self {
            orchestrator,
            cache,
            audit: None,
        }
    }

    /// Build a handler from configuration, opening the audit writer when
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an unusable platform name or when the
    /// audit writer is enabled outside a Tokio runtime, or `AppError::Io` if
    /// the audit directory cannot be created.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        let settings = HandlerSettings {
            default_timeout: config.default_timeout(),
            cache_enabled: config.cache.enabled,
            cache: config.cache_settings(),
        };
        let handler = Self::new(config.platform_profile()?, settings);

        if config.audit.enabled {
            let writer = JsonlAuditWriter::new(config.audit.log_dir.clone())?;
            Ok(handler.with_audit_logger(Arc::new(writer)))
        } else {
            Ok(handler)
        }
    }

    /// Attach an audit logger.
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Platform rules in effect.
    #[must_use]
    pub const fn profile(&self) -> &PlatformProfile {
        self.orchestrator.profile()
    }

    /// Timeout applied when a call does not supply one.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.orchestrator.default_timeout()
    }

    /// Run only the syntax checks.
    #[must_use]
    pub fn validate_format(&self, path: &str) -> FormatReport {
        validate_format(path, self.profile())
    }

    /// Validate `path`, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the run exceeds its deadline.
    pub async fn validate_path(
        &self,
        path: &str,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        let options = with_correlation_id(options);
        let started = Instant::now();
        let result = self.orchestrator.validate(path, &options).await?;
        self.audit(
            AuditEntry::new(AuditOperation::ValidatePath, path).with_validation(&result),
            &options,
            started,
        );
        Ok(result)
    }

    /// Validate `path` as a repository root: on top of
    /// [`Self::validate_path`], the path must exist and be a directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the run exceeds its deadline.
    pub async fn validate_repository_root(
        &self,
        path: &str,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        let options = with_correlation_id(options);
        let started = Instant::now();
        let result = self.orchestrator.validate(path, &options).await?;

        let checked = result.normalized_path().is_some()
            && !result.has_error(ErrorCode::OperationCancelled);
        let metadata = *result.metadata();
        let extra = if !checked {
            None
        } else if !metadata.exists() {
            Some(
                PathError::new(ErrorCode::PathNotFound, "Repository path does not exist")
                    .with_details(path.to_owned())
                    .with_suggestions([
                        "Check the path for typos",
                        "Clone or create the repository first",
                    ]),
            )
        } else if !metadata.is_directory() {
            Some(
                PathError::new(ErrorCode::NotDirectory, "Repository path is not a directory")
                    .with_details(path.to_owned())
                    .with_suggestions(["Select the folder that contains the repository"]),
            )
        } else {
            None
        };
        let result = match extra {
            Some(error) => result.with_additional_errors([error]),
            None => result,
        };

        self.audit(
            AuditEntry::new(AuditOperation::ValidateRepository, path).with_validation(&result),
            &options,
            started,
        );
        Ok(result)
    }

    /// Validate several paths concurrently, returning results in input order.
    pub async fn validate_many(
        &self,
        paths: &[String],
        options: &ValidateOptions,
    ) -> Vec<Result<ValidationResult>> {
        info!(count = paths.len(), "validating batch");
        join_all(paths.iter().map(|path| {
            let per_path = ValidateOptions {
                correlation_id: None,
                ..options.clone()
            };
            async move { self.validate_path(path, &per_path).await }
        }))
        .await
    }

    /// Resolve permissions for `path`. Never cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the check exceeds its deadline.
    pub async fn check_permissions(
        &self,
        path: &str,
        options: &ValidateOptions,
    ) -> Result<PermissionResult> {
        let options = with_correlation_id(options);
        let started = Instant::now();
        let result = self.orchestrator.check_permissions(path, &options).await?;
        self.audit(
            AuditEntry::new(AuditOperation::CheckPermissions, path).with_permissions(&result),
            &options,
            started,
        );
        Ok(result)
    }

    /// Normalize `path` under the active platform rules.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if `path` is empty.
    pub fn normalize_path(&self, path: &str) -> Result<String> {
        normalize(path, self.profile())
    }

    /// Resolve `path` against `base` (or the current directory).
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if `path` is empty.
    pub fn resolve_relative_path(&self, path: &str, base: Option<&str>) -> Result<String> {
        resolve_relative(path, base, self.profile())
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("validation cache cleared");
    }

    /// Drop cached results for `path`, matching both the raw and the
    /// normalized spelling. Returns the number of entries removed.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let mut removed = self.cache.invalidate_path(path);
        if let Ok(normalized) = self.normalize_path(path) {
            if normalized != path {
                removed += self.cache.invalidate_path(&normalized);
            }
        }
        info!(path, removed, "invalidated cached path");
        removed
    }

    /// Drop cached results whose path matches the regex `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if `pattern` is not a valid regex.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let removed = self.cache.invalidate_pattern(pattern)?;
        info!(pattern, removed, "invalidated cached pattern");
        Ok(removed)
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wait until every audit entry queued so far is on disk.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the audit writer has stopped or cannot sync.
    pub async fn flush_audit(&self) -> Result<()> {
        match &self.audit {
            Some(audit) => audit.flush().await,
            None => Ok(()),
        }
    }

    fn audit(&self, entry: AuditEntry, options: &ValidateOptions, started: Instant) {
        let Some(audit) = &self.audit else {
            return;
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut entry = entry.with_duration_ms(elapsed_ms);
        if let Some(id) = &options.correlation_id {
            entry = entry.with_correlation_id(id.clone());
        }
        if let Err(err) = audit.log_entry(entry) {
            warn!(%err, "failed to write audit entry");
        }
    }
}

/// Copy of `options` with a correlation id guaranteed to be present.
fn with_correlation_id(options: &ValidateOptions) -> ValidateOptions {
    let mut options = options.clone();
    if options.correlation_id.is_none() {
        options.correlation_id = Some(Uuid::new_v4().to_string());
    }
    options
}
