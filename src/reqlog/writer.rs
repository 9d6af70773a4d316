//! Queued JSONL request log with daily files.
//!
//! Request handlers only enqueue entries. A single background task drains
//! the queue in batches and performs the blocking file I/O on the
//! blocking pool, so a slow disk never stalls a webhook response.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    mem,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, Utc};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use super::{RequestLogEntry, RequestLogger};
use crate::{AppError, Result};

/// Entries that may wait for the writer before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Most entries written per flush.
const BATCH_LIMIT: usize = 64;

/// File holding the entries received on `date`.
#[must_use]
pub fn log_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("requests-{date}.jsonl"))
}

/// Handle for queueing request entries to `<log_dir>/requests-YYYY-MM-DD.jsonl`.
///
/// The background writer stops once every handle is dropped and the queue
/// is drained; await the [`JoinHandle`] returned by [`Self::spawn`] to know
/// all accepted entries are on disk.
#[derive(Debug, Clone)]
pub struct JsonlRequestWriter {
    queue: mpsc::Sender<RequestLogEntry>,
}

impl JsonlRequestWriter {
    /// Create `log_dir` and start the background writer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn spawn(log_dir: PathBuf) -> Result<(Self, JoinHandle<()>)> {
        Self::spawn_with_capacity(log_dir, DEFAULT_QUEUE_CAPACITY)
    }

    /// Like [`Self::spawn`] with an explicit queue bound (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn spawn_with_capacity(
        log_dir: PathBuf,
        capacity: usize,
    ) -> Result<(Self, JoinHandle<()>)> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            AppError::Io(format!(
                "failed to create request log directory {}: {e}",
                log_dir.display()
            ))
        })?;
        let (queue, pending) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(drain(pending, DailyFile::new(log_dir)));
        Ok((Self { queue }, task))
    }
}

impl RequestLogger for JsonlRequestWriter {
    fn log_entry(&self, entry: RequestLogEntry) -> Result<()> {
        self.queue.try_send(entry).map_err(|err| match err {
            TrySendError::Full(_) => AppError::Io("request log queue is full; entry dropped".into()),
            TrySendError::Closed(_) => AppError::Io("request log writer has stopped".into()),
        })
    }
}

async fn drain(mut pending: mpsc::Receiver<RequestLogEntry>, mut file: DailyFile) {
    let mut batch = Vec::with_capacity(BATCH_LIMIT);
    while pending.recv_many(&mut batch, BATCH_LIMIT).await > 0 {
        let entries = mem::take(&mut batch);
        let written = tokio::task::spawn_blocking(move || {
            let result = file.append(&entries);
            (file, result)
        })
        .await;

        match written {
            Ok((returned, result)) => {
                file = returned;
                if let Err(err) = result {
                    warn!(%err, "failed to append request log batch");
                }
            }
            Err(err) => {
                error!(%err, "request log writer aborted");
                return;
            }
        }
    }
    debug!("request log writer stopped");
}

/// The open file for the current day.
struct DailyFile {
    log_dir: PathBuf,
    open: Option<(NaiveDate, BufWriter<File>)>,
}

impl DailyFile {
    fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            open: None,
        }
    }

    fn append(&mut self, entries: &[RequestLogEntry]) -> Result<()> {
        let today = Utc::now().date_naive();
        if self.open.as_ref().is_none_or(|(date, _)| *date != today) {
            // Drop the old handle first so its buffer is flushed.
            self.open = None;
            self.open = Some((today, self.open_for(today)?));
        }
        let Some((_, out)) = self.open.as_mut() else {
            return Ok(());
        };

        for entry in entries {
            serde_json::to_writer(&mut *out, entry)
                .map_err(|e| AppError::Io(format!("failed to encode request entry: {e}")))?;
            out.write_all(b"\n")
                .map_err(|e| AppError::Io(format!("request log write failed: {e}")))?;
        }
        out.flush()
            .map_err(|e| AppError::Io(format!("request log flush failed: {e}")))
    }

    fn open_for(&self, date: NaiveDate) -> Result<BufWriter<File>> {
        let path = log_path(&self.log_dir, date);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map(BufWriter::new)
            .map_err(|e| AppError::Io(format!("failed to open request log {}: {e}", path.display())))
    }
}
