//! Staged validation pipeline with progress, cancellation, and timeout.
//!
//! Stages run in order: format validation, normalization, existence check,
//! permission check (only when the path exists), finalization. The whole
//! run races a deadline; because the pipeline future is dropped when the
//! deadline fires, an abandoned run can never reach the cache write, which
//! only happens in the governing call after the race resolves.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::cache::{cache_key, ValidationCache};
use super::format::{validate_format, FormatReport};
use super::normalize::normalize;
use super::permissions::PermissionResolver;
use super::probe::{self, HostFs, OsFs};
use crate::models::{
    ErrorCode, PathError, PathMetadata, PermissionResult, ProgressCallback, ValidationResult,
    ValidationStage,
};
use crate::platform::PlatformProfile;
use crate::{AppError, Result};

/// Per-call options for validation and permission checks.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Deadline for the whole run; falls back to the orchestrator default.
    pub timeout: Option<Duration>,
    /// Receives stage-boundary progress events.
    pub on_progress: Option<ProgressCallback>,
    /// Cooperative cancellation signal.
    pub cancellation: Option<CancellationToken>,
    /// Identifier attached to log spans; generated when absent.
    pub correlation_id: Option<String>,
}

impl ValidateOptions {
    /// Options with only a timeout set.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

/// Delivers progress events, never letting the percentage go backwards.
struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: AtomicU8,
}

impl ProgressReporter {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
        }
    }

    fn emit(&self, stage: ValidationStage, percentage: u8, message: &str) {
        let previous = self.last.fetch_max(percentage, Ordering::SeqCst);
        let percentage = previous.max(percentage);
        debug!(?stage, percentage, message, "validation progress");
        if let Some(callback) = &self.callback {
            callback.emit(stage, percentage, message);
        }
    }
}

/// Fail the current stage if cancellation was requested.
fn checkpoint(token: &CancellationToken, stage: ValidationStage) -> Result<()> {
    if token.is_cancelled() {
        Err(AppError::Cancelled(format!("cancelled before {stage:?}")))
    } else {
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Sequences the validation stages and consults the cache.
#[derive(Debug, Clone)]
pub struct ValidationOrchestrator {
    profile: PlatformProfile,
    resolver: PermissionResolver,
    cache: Option<Arc<ValidationCache>>,
    default_timeout: Duration,
}

impl ValidationOrchestrator {
    /// Construct an orchestrator. Pass `None` for `cache` to disable caching.
    #[must_use]
    pub fn new(
        profile: PlatformProfile,
        cache: Option<Arc<ValidationCache>>,
        default_timeout: Duration,
    ) -> Self {
        Self::with_host(profile, cache, default_timeout, Arc::new(OsFs))
    }

    /// Construct an orchestrator that reaches the filesystem through `host`.
    #[must_use]
    pub fn with_host(
        profile: PlatformProfile,
        cache: Option<Arc<ValidationCache>>,
        default_timeout: Duration,
        host: Arc<dyn HostFs>,
    ) -> Self {
        Self {
            profile,
            resolver: PermissionResolver::with_host(profile, host),
            cache,
            default_timeout,
        }
    }

    /// Platform rules in effect.
    #[must_use]
    pub const fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Deadline used when a call does not supply one.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Validate `path`.
    ///
    /// Expected problems (bad syntax, denied access) and cancellation are
    /// reported inside the returned result; a path that merely does not
    /// exist is still valid, with `metadata.exists == false`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the run does not finish within the
    /// effective timeout.
    pub async fn validate(&self, path: &str, options: &ValidateOptions) -> Result<ValidationResult> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let correlation_id = options
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!(
            "validate_path",
            correlation_id = %correlation_id,
            path = %path,
            platform = self.profile.tag(),
        );

        self.validate_inner(path, options, timeout)
            .instrument(span)
            .await
    }

    async fn validate_inner(
        &self,
        path: &str,
        options: &ValidateOptions,
        timeout: Duration,
    ) -> Result<ValidationResult> {
        let token = options.cancellation.clone().unwrap_or_default();
        let progress = ProgressReporter::new(options.on_progress.clone());

        if token.is_cancelled() {
            info!("validation cancelled before start");
            return Ok(ValidationResult::cancelled());
        }

        let timeout_ms = millis(timeout);
        let key = cache_key(path, &self.profile, timeout_ms);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!("validation served from cache");
                progress.emit(ValidationStage::Completed, 100, "Validation result served from cache");
                return Ok(hit);
            }
        }

        let started = Instant::now();
        let pipeline = async {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(AppError::Cancelled("cancelled mid-run".into())),
                result = self.run_stages(path, &progress, &token) => result,
            }
        };

        let outcome = match tokio::time::timeout(timeout, pipeline).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms, "validation timed out");
                return Err(AppError::Timeout(format!(
                    "path validation exceeded {timeout_ms}ms"
                )));
            }
        };

        match outcome {
            Ok(result) => {
                if let Some(cache) = &self.cache {
                    cache.record_validation(started.elapsed());
                    if result.normalized_path().is_some() && result.metadata().exists() {
                        cache.set(key, path, result.clone());
                    }
                }
                info!(
                    is_valid = result.is_valid(),
                    exists = result.metadata().exists(),
                    errors = result.errors().len(),
                    "validation finished"
                );
                Ok(result)
            }
            Err(AppError::Cancelled(reason)) => {
                info!(%reason, "validation cancelled");
                Ok(ValidationResult::cancelled())
            }
            Err(err) => {
                warn!(%err, "validation failed unexpectedly");
                Ok(ValidationResult::from_error(
                    PathError::new(ErrorCode::ValidationError, "Path validation failed")
                        .with_details(err.to_string()),
                ))
            }
        }
    }

    async fn run_stages(
        &self,
        path: &str,
        progress: &ProgressReporter,
        token: &CancellationToken,
    ) -> Result<ValidationResult> {
        checkpoint(token, ValidationStage::FormatValidation)?;
        progress.emit(ValidationStage::FormatValidation, 10, "Validating path format");
        let FormatReport {
            mut errors,
            warnings,
        } = validate_format(path, &self.profile);
        progress.emit(ValidationStage::FormatValidation, 20, "Path format checked");

        if !errors.is_empty() {
            debug!(errors = errors.len(), "format validation failed");
            progress.emit(ValidationStage::Completed, 100, "Validation finished with format errors");
            return Ok(ValidationResult::new(
                None,
                errors,
                warnings,
                PathMetadata::missing(),
            ));
        }

        checkpoint(token, ValidationStage::Normalization)?;
        progress.emit(ValidationStage::Normalization, 30, "Normalizing path");
        let normalized = normalize(path, &self.profile)?;
        progress.emit(ValidationStage::Normalization, 40, "Path normalized");

        checkpoint(token, ValidationStage::ExistenceCheck)?;
        progress.emit(ValidationStage::ExistenceCheck, 50, "Checking whether path exists");
        let attributes = probe::probe(self.resolver.host(), &normalized).await;
        let mut metadata = attributes
            .as_ref()
            .map_or_else(PathMetadata::missing, probe::FileAttributes::path_metadata);
        progress.emit(ValidationStage::ExistenceCheck, 60, "Existence checked");

        if let Some(attributes) = &attributes {
            checkpoint(token, ValidationStage::PermissionCheck)?;
            progress.emit(ValidationStage::PermissionCheck, 70, "Checking permissions");
            let permissions = self.resolver.resolve_existing(&normalized, attributes).await;
            metadata = metadata.with_permissions(permissions.permissions());
            errors.extend(permissions.errors);
            progress.emit(ValidationStage::PermissionCheck, 80, "Permissions checked");
        }

        checkpoint(token, ValidationStage::Finalization)?;
        progress.emit(ValidationStage::Finalization, 90, "Finalizing result");
        let result = ValidationResult::new(Some(normalized), errors, warnings, metadata);
        progress.emit(ValidationStage::Completed, 100, "Validation complete");
        Ok(result)
    }

    /// Resolve permissions for `path` under the same cancellation and
    /// timeout rules as [`Self::validate`]. Results are never cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the check does not finish in time.
    pub async fn check_permissions(
        &self,
        path: &str,
        options: &ValidateOptions,
    ) -> Result<PermissionResult> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let token = options.cancellation.clone().unwrap_or_default();
        let correlation_id = options
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!(
            "check_permissions",
            correlation_id = %correlation_id,
            path = %path,
            platform = self.profile.tag(),
        );

        async move {
            if token.is_cancelled() {
                return Ok(PermissionResult::cancelled());
            }

            let normalized = match normalize(path, &self.profile) {
                Ok(normalized) => normalized,
                Err(err) => {
                    return Ok(PermissionResult::denied(
                        "unknown",
                        "unknown",
                        vec![PathError::new(ErrorCode::InvalidInput, "Path must be a non-empty string")
                            .with_details(err.to_string())],
                    ));
                }
            };

            let check = async {
                tokio::select! {
                    biased;
                    () = token.cancelled() => PermissionResult::cancelled(),
                    result = self.resolver.resolve(&normalized) => result,
                }
            };

            match tokio::time::timeout(timeout, check).await {
                Ok(result) => {
                    info!(
                        can_read = result.can_read,
                        can_write = result.can_write,
                        errors = result.errors.len(),
                        "permission check finished"
                    );
                    Ok(result)
                }
                Err(_) => {
                    let timeout_ms = millis(timeout);
                    warn!(timeout_ms, "permission check timed out");
                    Err(AppError::Timeout(format!(
                        "permission check exceeded {timeout_ms}ms"
                    )))
                }
            }
        }
        .instrument(span)
        .await
    }
}
