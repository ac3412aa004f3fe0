//! Admission control for in-flight datagram handling.
//!
//! A counting semaphore caps how many datagrams are being handled at
//! once. The dispatch loop acquires a permit *before* reading from the
//! socket, so when every permit is taken, unread datagrams wait in the
//! kernel receive buffer instead of growing an unbounded task queue.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permit held for the lifetime of one handler task.
///
/// Dropping it returns the slot, so a task releases capacity on every
/// exit path, including send failures and panics.
pub type HandlerPermit = OwnedSemaphorePermit;

/// Caps concurrent datagram handling at a fixed number of tasks.
#[derive(Clone)]
pub struct AdmissionControl {
    permits: Arc<Semaphore>,
}

impl AdmissionControl {
    /// Creates a controller admitting at most `max_in_flight` tasks.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Waits until a handler slot is free and claims it.
    pub async fn admit(&self) -> HandlerPermit {
        // The semaphore is never closed, so acquisition cannot fail.
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("admission semaphore closed")
    }

    /// Number of handler slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
