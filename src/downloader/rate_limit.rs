//! Dispatch throttling
//!
//! [`DispatchThrottle`] limits how fast requests are *launched*: after every
//! `batch_size`-th dispatch the dispatcher sleeps for the cooldown. Tasks that
//! were already launched keep running, so this is not a bound on in-flight
//! requests. [`InFlightLimit`] is the separate, opt-in bound for that.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Cooldown after every N dispatched requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchThrottle {
    batch_size: usize,
    cooldown: Duration,
}

impl DispatchThrottle {
    /// Create a throttle; a batch size of 0 is treated as 1
    pub fn new(batch_size: usize, cooldown: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cooldown,
        }
    }

    /// Requests per cooldown cycle
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause length
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether to pause right after the `dispatched`-th of `total` requests
    ///
    /// Never pauses after the final dispatch.
    pub fn should_pause(&self, dispatched: usize, total: usize) -> bool {
        dispatched > 0 && dispatched < total && dispatched % self.batch_size == 0
    }

    /// Number of pauses a run of `total` requests takes
    pub fn pauses_for(&self, total: usize) -> usize {
        total.saturating_sub(1) / self.batch_size
    }
}

/// Upper bound on concurrently running requests
#[derive(Debug, Clone)]
pub struct InFlightLimit {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl InFlightLimit {
    /// Allow at most `max` requests at once (minimum 1)
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Configured bound
    pub fn max(&self) -> usize {
        self.max
    }

    /// Wait for a slot; the slot is released when the permit drops
    ///
    /// Returns `None` only if the semaphore was closed, which never happens
    /// for limits built here.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
