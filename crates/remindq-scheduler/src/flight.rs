//! In-flight worker accounting.
//!
//! An explicit counter over the pool's spawned workers: the poll loop reads
//! it to decide whether to take on more work, tests read it to pin the
//! concurrency bound, and `wait_idle` gives a join point. The count is
//! immediately stale the moment it is read — good enough for throttling,
//! not a lock.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Notify;

pub struct FlightCounter {
    count: AtomicI64,
    idle: Notify,
}

impl FlightCounter {
    pub fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            idle: Notify::new(),
        }
    }

    /// Account for `n` workers about to start.
    pub fn add(&self, n: i64) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Account for one worker exiting. Wakes `wait_idle` callers when the
    /// count reaches zero.
    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Current in-flight count.
    pub fn current(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until every accounted worker has called `done`.
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking, so a done() between the check and
            // the await is not missed
            let notified = self.idle.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for FlightCounter {
    fn default() -> Self {
        Self::new()
    }
}
