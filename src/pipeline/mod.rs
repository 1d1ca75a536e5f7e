//! Concurrent bulk fetch pipeline.
//!
//! # Architecture
//!
//! ```text
//!            ┌─ Worker 1 ─┐
//! Plan ──────┼─ Worker 2 ─┼──► bounded queue ──► CsvSink task ──► file.csv
//!            └─ Worker n ─┘
//!                 │
//!            RequestGate (shared permits)
//! ```
//!
//! 1. [`PartitionPlan`] splits the requested count into strided page ranges
//! 2. The [`CsvSink`] creates the destination before any worker starts
//! 3. Every [`Worker`] runs as its own task and fetches through the shared source
//! 4. The orchestrator joins all workers, then closes the sink
//!
//! # Failure policy
//!
//! A failing worker stops itself only. Siblings are not cancelled and keep
//! writing; the orchestrator waits for all of them, closes the sink and then
//! returns the first failure it observed. A sink failure takes precedence,
//! since it makes every later send fail. Completed writes are not rolled back,
//! so a failed run can leave a partial file behind.

pub mod plan;
pub mod sink;
pub mod worker;

use crate::api::PageSource;
use crate::config::PAGE_SIZE;
use crate::error::{NewsError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use plan::PartitionPlan;
use sink::CsvSink;
use worker::Worker;

/// Outcome of a successful bulk fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Number of headlines asked for.
    pub requested: usize,
    /// Workers spawned, including the remainder worker.
    pub workers: usize,
    /// Batches the sink wrote.
    pub batches: usize,
    /// CSV lines in the destination file.
    pub written: usize,
}

/// Fetch orchestrator.
#[derive(Debug)]
pub struct BulkFetcher<S> {
    source: Arc<S>,
    pool_size: usize,
    queue_capacity: usize,
    page_size: u32,
}

impl<S> BulkFetcher<S>
where
    S: PageSource + Send + Sync + 'static,
{
    /// Orchestrator over a shared page source.
    ///
    /// # Arguments
    ///
    /// * `source` - Upstream shared by every worker, usually gated
    /// * `pool_size` - Upper bound on full-page workers
    /// * `queue_capacity` - Batches buffered between workers and the sink
    ///
    /// # Errors
    ///
    /// [`NewsError::Config`] when `pool_size` or `queue_capacity` is zero.
    pub fn new(source: Arc<S>, pool_size: usize, queue_capacity: usize) -> Result<Self> {
        if pool_size == 0 {
            return Err(NewsError::Config("pool_size must be positive".to_string()));
        }
        if queue_capacity == 0 {
            return Err(NewsError::Config(
                "queue_capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            source,
            pool_size,
            queue_capacity,
            page_size: PAGE_SIZE,
        })
    }

    /// Partition `total` headlines over this fetcher's pool.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of headlines to fetch
    ///
    /// # Returns
    ///
    /// The plan [`BulkFetcher::run`] would execute, or [`NewsError::Config`]
    /// when `total` needs more pages than can be addressed.
    pub fn plan(&self, total: usize) -> Result<PartitionPlan> {
        PartitionPlan::new(total, self.pool_size, self.page_size)
    }

    /// Fetch `total` headlines into a new CSV file at `destination`.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of headlines to fetch
    /// * `destination` - Path of the CSV file; must end in `.csv` and not exist
    ///
    /// # Returns
    ///
    /// A [`FetchReport`] once every worker has finished and the file is flushed.
    ///
    /// # Errors
    ///
    /// A destination error before any request is made, a sink write failure,
    /// or else the first worker failure observed.
    #[instrument(level = "info", skip_all, fields(total = total, destination = %destination.as_ref().display()))]
    pub async fn run(&self, total: usize, destination: impl AsRef<Path>) -> Result<FetchReport> {
        let plan = self.plan(total)?;
        info!(
            full_pages = plan.full_pages,
            remainder = plan.remainder,
            workers = plan.worker_count(),
            full_page_workers = plan.full_page_workers(),
            expected = plan.expected_items(),
            pool_size = self.pool_size,
            "Partition plan computed"
        );

        let sink = CsvSink::open(destination, self.queue_capacity).await?;
        self.execute(&plan, sink).await
    }

    /// Spawn one task per assignment, join them all, then close `sink`.
    async fn execute(&self, plan: &PartitionPlan, sink: CsvSink) -> Result<FetchReport> {
        let t0 = Instant::now();
        let mut workers: FuturesUnordered<_> = plan
            .assignments()
            .iter()
            .enumerate()
            .map(|(i, assignment)| {
                let worker = Worker::new(
                    i + 1,
                    *assignment,
                    self.page_size,
                    Arc::clone(&self.source),
                    sink.sender(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        let mut first_failure: Option<NewsError> = None;
        let mut failed = 0usize;
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined.map_err(NewsError::from).and_then(|outcome| outcome) {
                failed += 1;
                error!(page = ?e.page(), error = %e, "Worker failed");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }

        let closed = sink.close().await;
        let summary = match (closed, first_failure) {
            (Err(sink_error), _) => {
                error!(failed, error = %sink_error, "Bulk fetch failed in the sink");
                return Err(sink_error);
            }
            (Ok(_), Some(worker_error)) => {
                error!(failed, error = %worker_error, "Bulk fetch failed");
                return Err(worker_error);
            }
            (Ok(summary), None) => summary,
        };

        info!(
            written = summary.lines,
            batches = summary.batches,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Bulk fetch complete"
        );
        Ok(FetchReport {
            requested: plan.total,
            workers: plan.worker_count(),
            batches: summary.batches,
            written: summary.lines,
        })
    }
}
