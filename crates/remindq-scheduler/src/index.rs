//! Ready index — the time-ordered view of pending task ids.
//!
//! Read-only: the index never removes or marks what it hands out, so an id
//! stays visible until its worker gets the delete through the task store.

use std::sync::Arc;

use remindq_core::error::Result;
use remindq_core::traits::clock::Clock;
use remindq_core::traits::store::KeyValueStore;

use crate::store::READY_INDEX_KEY;

pub struct ReadyIndex {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    include_future: bool,
}

impl ReadyIndex {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            include_future: false,
        }
    }

    /// Widen the scan to the whole index: "oldest N pending, due or not"
    /// instead of "due now". Off by default.
    pub fn include_future(mut self, yes: bool) -> Self {
        self.include_future = yes;
        self
    }

    /// Up to `limit` due task ids, soonest first. A fresh call re-scans
    /// current state; nothing is consumed or claimed by reading.
    pub async fn query_batch(&self, limit: usize) -> Result<Vec<String>> {
        let max = if self.include_future {
            f64::INFINITY
        } else {
            self.clock.now_secs() as f64
        };
        self.store
            .zset_range_by_score(READY_INDEX_KEY, max, limit)
            .await
    }
}
