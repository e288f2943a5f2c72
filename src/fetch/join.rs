//! Join-counter for tracking in-flight exchanges
//!
//! The counter is the crawl's only termination signal: every scheduled fetch
//! increments it before any asynchronous work starts and decrements it when
//! the exchange's full lifecycle has finished, including fetches scheduled
//! recursively from inside another fetch's response callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Atomic count of not-yet-completed exchanges.
///
/// Invariant: the count is >= 0 at all times and reaches 0 if and only if no
/// exchange, including recursively spawned ones, is still pending. `add` must
/// be called on the scheduling thread before control returns to the caller,
/// so `wait` can never observe a false zero between "decided to schedule" and
/// "counter incremented".
#[derive(Debug, Default)]
pub struct JoinCounter {
    count: AtomicUsize,
    drained: Notify,
}

impl JoinCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one newly scheduled exchange.
    pub fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Records one completed exchange, waking waiters on the 1 -> 0 edge.
    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Current number of outstanding exchanges.
    pub fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Blocks until the count reaches 0.
    ///
    /// Registration for the notification happens before the count is
    /// re-checked, so a `done` racing with this call cannot be missed.
    pub async fn wait(&self) {
        loop {
            let notified = self.drained.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}
