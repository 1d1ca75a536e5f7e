//! Bounded request gate.
//!
//! A counting semaphore that caps in-flight upstream requests independently of
//! how many workers are running. Workers queue on the gate, not on the network.
//!
//! [`Gated`] wraps any [`PageSource`] so that every fetch holds a permit for
//! exactly the duration of the request. The permit is a guard: it is returned
//! when the fetch future completes, fails or is dropped.

use crate::api::PageSource;
use crate::error::{NewsError, Result};
use crate::models::Page;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::trace;

/// Admission gate limiting concurrent upstream requests.
#[derive(Debug)]
pub struct RequestGate {
    semaphore: Semaphore,
    permits: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl RequestGate {
    /// Gate with `permits` slots.
    ///
    /// # Arguments
    ///
    /// * `permits` - Maximum number of requests in flight at once
    ///
    /// # Errors
    ///
    /// [`NewsError::Config`] when `permits` is zero.
    pub fn new(permits: usize) -> Result<Self> {
        if permits == 0 {
            return Err(NewsError::Config(
                "max_in_flight_requests must be positive".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Semaphore::new(permits),
            permits,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Wait for a free slot.
    ///
    /// # Returns
    ///
    /// A [`GatePermit`] that holds the slot until it is dropped, or
    /// [`NewsError::GateClosed`] if the semaphore was closed.
    pub async fn acquire(&self) -> Result<GatePermit<'_>> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| NewsError::GateClosed)?;

        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::AcqRel);
        trace!(
            in_flight = current,
            available = self.available(),
            permits = self.permits,
            "Gate permit acquired"
        );

        Ok(GatePermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Configured number of slots.
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneously held permits so far.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

/// A held gate slot, released on drop.
#[derive(Debug)]
pub struct GatePermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A [`PageSource`] whose fetches are admitted through a shared [`RequestGate`].
#[derive(Debug)]
pub struct Gated<S> {
    inner: S,
    gate: Arc<RequestGate>,
}

impl<S> Gated<S> {
    /// Wrap `inner` so each fetch first takes a slot of `gate`.
    ///
    /// # Arguments
    ///
    /// * `inner` - The source doing the actual requests
    /// * `gate` - Gate shared by every caller that must be bounded together
    pub fn new(inner: S, gate: Arc<RequestGate>) -> Self {
        Self { inner, gate }
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> PageSource for Gated<S>
where
    S: PageSource + Sync,
{
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page> {
        let _permit = self.gate.acquire().await?;
        self.inner.fetch_page(page, page_size).await
    }
}
