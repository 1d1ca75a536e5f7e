//! Bulk fetch worker.
//!
//! A worker walks its [`WorkerAssignment`] page by page, truncates each batch
//! to the assignment quota and forwards it to the sink. Its own batches reach
//! the sink in fetch order. The first failure ends the worker; remaining pages
//! are not attempted and siblings are not told.

use super::plan::WorkerAssignment;
use super::sink::BatchSender;
use crate::api::PageSource;
use crate::error::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// One logical fetcher, run as its own task.
#[derive(Debug)]
pub struct Worker<S> {
    id: usize,
    assignment: WorkerAssignment,
    page_size: u32,
    source: Arc<S>,
    sink: BatchSender,
}

impl<S: PageSource> Worker<S> {
    /// Prepare a worker; nothing is fetched until [`Worker::run`].
    ///
    /// # Arguments
    ///
    /// * `id` - 1-based worker number, used in logs
    /// * `assignment` - Pages to visit and the per-batch quota
    /// * `page_size` - Items requested per page
    /// * `source` - Upstream shared with sibling workers
    /// * `sink` - Hand-off to the CSV sink
    pub fn new(
        id: usize,
        assignment: WorkerAssignment,
        page_size: u32,
        source: Arc<S>,
        sink: BatchSender,
    ) -> Self {
        Self {
            id,
            assignment,
            page_size,
            source,
            sink,
        }
    }

    /// Fetch every assigned page.
    ///
    /// # Returns
    ///
    /// The number of items forwarded, or the first fetch or send failure.
    #[instrument(level = "info", skip_all, fields(worker = self.id))]
    pub async fn run(self) -> Result<usize> {
        let t0 = Instant::now();
        let WorkerAssignment {
            start_page,
            end_page,
            stride,
            quota,
        } = self.assignment;
        info!(start_page, end_page, stride, quota, "Worker started");

        let mut forwarded = 0usize;
        for page in self.assignment.pages() {
            let fetched = match self.source.fetch_page(page, self.page_size).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(page, error = %e, "Worker aborting after failed fetch");
                    return Err(e);
                }
            };
            if fetched.len() < quota {
                debug!(page, fetched = fetched.len(), quota, "Short page");
            }
            let mut items = fetched.items;
            items.truncate(quota);
            let len = items.len();
            self.sink.send(items).await?;
            forwarded += len;
            debug!(page, batch_len = len, "Batch forwarded");
        }

        info!(
            forwarded,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Worker finished"
        );
        Ok(forwarded)
    }
}
