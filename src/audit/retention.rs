//! Retention service for audit log files.
//!
//! Runs as a background task deleting `audit-YYYY-MM-DD.jsonl` files whose
//! date is older than `retention_days`. Files that do not follow the naming
//! scheme are never touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::writer::{FILE_PREFIX, FILE_SUFFIX};
use crate::{AppError, Result};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly, starting immediately, until `cancel` fires.
#[must_use]
pub fn spawn_retention_task(
    log_dir: PathBuf,
    retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let cutoff = cutoff_date(retention_days);
                    match purge_before(&log_dir, cutoff).await {
                        Ok(removed) => info!(removed, retention_days, "retention purge completed"),
                        Err(err) => error!(%err, "retention purge failed"),
                    }
                }
            }
        }
    })
}

/// First date that is still retained.
#[must_use]
pub fn cutoff_date(retention_days: u32) -> NaiveDate {
    Utc::now().date_naive() - chrono::Duration::days(i64::from(retention_days))
}

/// Date encoded in an audit file name, if it follows the naming scheme.
fn file_date(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Delete audit files dated strictly before `cutoff`. Returns how many
/// were removed. A missing directory counts as nothing to purge.
///
/// # Errors
///
/// Returns `AppError::Io` if the directory cannot be listed.
pub async fn purge_before(log_dir: &Path, cutoff: NaiveDate) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(log_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => {
            return Err(AppError::Io(format!(
                "cannot list audit directory {}: {err}",
                log_dir.display()
            )))
        }
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(file_date) else {
            continue;
        };
        if date >= cutoff {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(file = %entry.path().display(), "removed expired audit log");
                removed += 1;
            }
            Err(err) => error!(file = %entry.path().display(), %err, "failed to remove audit log"),
        }
    }
    Ok(removed)
}
