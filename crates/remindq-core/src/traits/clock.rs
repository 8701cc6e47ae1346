//! Wall-clock seam.

use std::sync::atomic::{AtomicI64, Ordering};

/// Provides the current time. Behind a trait so scheduling decisions can be
/// pinned to a fixed instant in tests.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_secs(&self) -> i64;
}

/// The system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock set by hand. Starts at a chosen instant and only moves when told
/// to — tests use it to make due times land exactly where they want.
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_secs: i64) -> Self {
        Self {
            now: AtomicI64::new(now_secs),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now_secs: i64) {
        self.now.store(now_secs, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
