//! Pending event counter
//!
//! Tracks events handed to a sink and not yet acknowledged or dropped, so the
//! shutdown path can wait for them to drain.

use crate::sink::InFlightCounter;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Wait-group style counter with an async drain wait
#[derive(Debug, Default)]
pub struct PendingCounter {
    pending: AtomicI64,
    drained: Notify,
}

impl PendingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of pending events
    pub fn pending(&self) -> i64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Mark one pending event as finished (acked or dropped)
    pub fn done(&self) {
        self.add(-1);
    }

    /// Wait until no events are pending
    pub async fn wait(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent drain cannot be missed
            notified.as_mut().enable();

            if self.pending() <= 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait for the drain with a deadline. Returns false on timeout.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

impl InFlightCounter for PendingCounter {
    fn add(&self, delta: i64) {
        let now = self.pending.fetch_add(delta, Ordering::SeqCst) + delta;
        if now <= 0 {
            self.drained.notify_waiters();
        }
    }
}
