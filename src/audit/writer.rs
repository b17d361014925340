//! Channel-fed JSONL audit writer with daily file rotation.
//!
//! [`JsonlAuditWriter`] is a cheap handle: `log_entry` only enqueues. A
//! single background task owns the open file, appends one JSON object per
//! line to `<log_dir>/audit-YYYY-MM-DD.jsonl` through `tokio::fs`, and
//! switches files when an entry's date differs from the open file's.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{AuditEntry, AuditLogger};
use crate::{AppError, Result};

/// File name prefix shared with the retention task.
pub(crate) const FILE_PREFIX: &str = "audit-";
/// File name suffix shared with the retention task.
pub(crate) const FILE_SUFFIX: &str = ".jsonl";

enum Command {
    Append(Box<AuditEntry>),
    Flush(oneshot::Sender<Result<()>>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append(entry) => f.debug_tuple("Append").field(&entry.path).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Handle to the background audit writer.
#[derive(Debug, Clone)]
pub struct JsonlAuditWriter {
    log_dir: PathBuf,
    tx: mpsc::UnboundedSender<Command>,
}

impl JsonlAuditWriter {
    /// Create `log_dir` if needed and start the writer task.
    ///
    /// The task stops once every handle is dropped and the queue drains.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created, or
    /// [`AppError::Config`] when called outside a Tokio runtime.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| AppError::Config(format!("audit writer needs a tokio runtime: {err}")))?;
        std::fs::create_dir_all(&log_dir).map_err(|err| {
            AppError::Io(format!(
                "failed to create audit log directory {}: {err}",
                log_dir.display()
            ))
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run(rx, DailyFile::new(log_dir.clone())));
        Ok(Self { log_dir, tx })
    }

    /// Directory the writer appends to.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the file used for `date`.
    #[must_use]
    pub fn file_for_date(log_dir: &Path, date: NaiveDate) -> PathBuf {
        log_dir.join(format!("{FILE_PREFIX}{date}{FILE_SUFFIX}"))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| AppError::Io("audit writer task has stopped".into()))
    }
}

impl AuditLogger for JsonlAuditWriter {
    fn log_entry(&self, entry: AuditEntry) -> Result<()> {
        self.send(Command::Append(Box::new(entry)))
    }

    fn flush(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let (ack, done) = oneshot::channel();
            self.send(Command::Flush(ack))?;
            done.await
                .map_err(|_| AppError::Io("audit writer task has stopped".into()))?
        })
    }
}

/// The file currently being appended to, opened lazily per date.
struct DailyFile {
    log_dir: PathBuf,
    open: Option<(NaiveDate, File)>,
}

impl DailyFile {
    const fn new(log_dir: PathBuf) -> Self {
        Self { log_dir, open: None }
    }

    async fn append(&mut self, entry: &AuditEntry) -> Result<()> {
        let date = entry.timestamp.date_naive();
        let mut line = serde_json::to_vec(entry)
            .map_err(|err| AppError::Io(format!("failed to serialize audit entry: {err}")))?;
        line.push(b'\n');

        let file = self.file_for(date).await?;
        file.write_all(&line)
            .await
            .map_err(|err| AppError::Io(format!("audit write failed: {err}")))?;
        file.flush()
            .await
            .map_err(|err| AppError::Io(format!("audit flush failed: {err}")))
    }

    async fn file_for(&mut self, date: NaiveDate) -> Result<&mut File> {
        if self.open.as_ref().is_none_or(|(open_date, _)| *open_date != date) {
            let path = JsonlAuditWriter::file_for_date(&self.log_dir, date);
            debug!(path = %path.display(), "opening audit log");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|err| {
                    AppError::Io(format!("failed to open audit log {}: {err}", path.display()))
                })?;
            self.open = Some((date, file));
        }
        match self.open.as_mut() {
            Some((_, file)) => Ok(file),
            None => Err(AppError::Io("audit log is not open".into())),
        }
    }

    async fn sync(&mut self) -> Result<()> {
        if let Some((_, file)) = self.open.as_mut() {
            file.sync_data()
                .await
                .map_err(|err| AppError::Io(format!("audit sync failed: {err}")))?;
        }
        Ok(())
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>, mut sink: DailyFile) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Append(entry) => {
                if let Err(err) = sink.append(&entry).await {
                    warn!(%err, path = %entry.path, "failed to write audit entry");
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(sink.sync().await);
            }
        }
    }
    debug!("audit writer stopped");
}
