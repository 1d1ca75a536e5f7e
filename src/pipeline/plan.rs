//! Partition plan for a bulk fetch.
//!
//! `total` items are split into `total / page_size` full pages plus an
//! optional remainder page. Full pages are dealt round-robin to at most
//! `pool_size` workers: worker `i` (1-based) visits pages `i, i + n, i + 2n, ...`
//! up to the last full page, where `n` is the number of full-page workers.
//! The remainder, if any, gets one extra worker on page `full_pages + 1`
//! whose batch is truncated to `remainder` items.

use crate::error::{NewsError, Result};
use std::iter::StepBy;
use std::ops::RangeInclusive;

/// Page range owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    /// First page fetched (1-based).
    pub start_page: u32,
    /// Last page that may be fetched, inclusive.
    pub end_page: u32,
    /// Distance between two consecutive pages of this worker.
    pub stride: u32,
    /// Maximum items forwarded per batch.
    pub quota: usize,
}

impl WorkerAssignment {
    /// Pages this worker visits, in fetch order.
    pub fn pages(&self) -> StepBy<RangeInclusive<u32>> {
        (self.start_page..=self.end_page).step_by(self.stride.max(1) as usize)
    }

    /// Items this worker forwards when every page is full.
    pub fn expected_items(&self) -> usize {
        self.pages().count() * self.quota
    }
}

/// All worker assignments for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    /// Number of items requested.
    pub total: usize,
    /// Items per requested page.
    pub page_size: u32,
    /// Pages fetched in full.
    pub full_pages: u32,
    /// Items taken from the page after the last full one.
    pub remainder: usize,
    assignments: Vec<WorkerAssignment>,
}

impl PartitionPlan {
    /// Build the plan for one bulk fetch.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of headlines to fetch
    /// * `pool_size` - Upper bound on full-page workers, assumed positive
    /// * `page_size` - Items per page, assumed positive
    ///
    /// # Returns
    ///
    /// The assignments, one per worker. Pools larger than the number of full
    /// pages are clamped to it.
    ///
    /// # Errors
    ///
    /// [`NewsError::Config`] when `total` needs more pages than a `u32` page
    /// number can address.
    pub fn new(total: usize, pool_size: usize, page_size: u32) -> Result<Self> {
        let per_page = page_size.max(1) as usize;
        let pages_needed = total.div_ceil(per_page);
        if u32::try_from(pages_needed).is_err() {
            return Err(NewsError::Config(format!(
                "cannot fetch {total} items: {pages_needed} pages exceed the addressable page range"
            )));
        }
        let full_pages = u32::try_from(total / per_page).unwrap_or(u32::MAX);
        let remainder = total % per_page;
        let workers = u32::try_from(pool_size).unwrap_or(u32::MAX).min(full_pages);

        let mut assignments: Vec<WorkerAssignment> = (1..=workers)
            .map(|i| WorkerAssignment {
                start_page: i,
                end_page: full_pages,
                stride: workers,
                quota: per_page,
            })
            .collect();

        if remainder > 0 {
            assignments.push(WorkerAssignment {
                start_page: full_pages + 1,
                end_page: full_pages + 1,
                stride: 1,
                quota: remainder,
            });
        }

        Ok(Self {
            total,
            page_size,
            full_pages,
            remainder,
            assignments,
        })
    }

    pub fn assignments(&self) -> &[WorkerAssignment] {
        &self.assignments
    }

    pub fn worker_count(&self) -> usize {
        self.assignments.len()
    }

    /// Workers that fetch full pages, excluding the remainder worker.
    pub fn full_page_workers(&self) -> usize {
        self.assignments.len() - usize::from(self.remainder > 0)
    }

    /// Items the plan forwards when the upstream has enough headlines.
    pub fn expected_items(&self) -> usize {
        self.assignments.iter().map(WorkerAssignment::expected_items).sum()
    }
}
