//! Serialized CSV sink.
//!
//! One task owns the destination file for the whole invocation. Workers hand
//! batches to it through a bounded channel and never touch the file. Batches
//! are written in the order they are received; a full channel makes senders
//! wait (backpressure) instead of buffering without bound.
//!
//! If a write fails the task stops and drops its receiver, so every later
//! `send` fails and the remaining batches are discarded.

use crate::error::{NewsError, Result};
use crate::models::News;
use crate::outputs::csv::create_destination;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Items forwarded by a worker in one hand-off.
pub type Batch = Vec<News>;

/// What the sink wrote before it closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    /// Batches received and written.
    pub batches: usize,
    /// CSV lines written across all batches.
    pub lines: usize,
}

/// Producer handle given to each worker.
#[derive(Debug, Clone)]
pub struct BatchSender {
    tx: mpsc::Sender<Batch>,
}

impl BatchSender {
    /// Queue a batch, waiting while the hand-off queue is full.
    ///
    /// # Errors
    ///
    /// [`NewsError::Destination`] once the sink task has stopped, for example
    /// after a failed write. The batch is dropped.
    pub async fn send(&self, batch: Batch) -> Result<()> {
        self.tx
            .send(batch)
            .await
            .map_err(|_| NewsError::destination("sink stopped accepting batches"))
    }
}

/// Handle to the running sink task.
#[derive(Debug)]
pub struct CsvSink {
    tx: mpsc::Sender<Batch>,
    task: JoinHandle<Result<SinkSummary>>,
    path: PathBuf,
}

impl CsvSink {
    /// Create the destination and start the writer task.
    ///
    /// Fails before anything is spawned when the path does not end in `.csv`
    /// or already exists. An existing file is left untouched.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination of the CSV file, created by this call
    /// * `capacity` - Number of batches the hand-off queue holds
    ///
    /// # Returns
    ///
    /// A running sink. Use [`CsvSink::sender`] to feed it and
    /// [`CsvSink::close`] to finish it.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), capacity = capacity))]
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(NewsError::Config("queue_capacity must be positive".to_string()));
        }
        let path = path.as_ref().to_path_buf();
        let file = create_destination(&path).await?;
        let sink = Self::spawn(file, path, capacity);
        info!("Sink opened");
        Ok(sink)
    }

    /// Start the writer task on an already opened file.
    pub(super) fn spawn(file: File, path: PathBuf, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(write_batches(rx, file, path.clone()));
        Self { tx, task, path }
    }

    /// A new producer handle for one worker.
    ///
    /// # Returns
    ///
    /// A [`BatchSender`] sharing this sink's queue. The sink stays open
    /// while any handle is alive.
    pub fn sender(&self) -> BatchSender {
        BatchSender {
            tx: self.tx.clone(),
        }
    }

    /// Stop accepting batches, wait for the writer to drain and flush.
    ///
    /// Outstanding [`BatchSender`] clones keep the sink open; callers drop
    /// them (by joining the workers) before closing.
    ///
    /// # Errors
    ///
    /// The first write, flush or sync failure of the writer task, as
    /// [`NewsError::Destination`].
    pub async fn close(self) -> Result<SinkSummary> {
        drop(self.tx);
        let summary = self.task.await??;
        info!(path = %self.path.display(), batches = summary.batches, lines = summary.lines, "Sink closed");
        Ok(summary)
    }
}

async fn write_batches(
    mut rx: mpsc::Receiver<Batch>,
    file: File,
    path: PathBuf,
) -> Result<SinkSummary> {
    let mut writer = BufWriter::new(file);
    let mut summary = SinkSummary::default();
    let write_failed = |e: std::io::Error| {
        error!(path = %path.display(), error = %e, "Sink write failed");
        NewsError::destination(format!("write to {} failed: {e}", path.display()))
    };

    while let Some(batch) = rx.recv().await {
        for news in &batch {
            let mut line = news.to_csv_line();
            line.push('\n');
            writer.write_all(line.as_bytes()).await.map_err(write_failed)?;
        }
        summary.batches += 1;
        summary.lines += batch.len();
        debug!(batch_len = batch.len(), lines = summary.lines, "Batch written");
    }

    writer.flush().await.map_err(write_failed)?;
    writer.into_inner().sync_all().await.map_err(write_failed)?;
    Ok(summary)
}
