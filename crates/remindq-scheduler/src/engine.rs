//! Dispatch engine — the poll loop and its worker pool.
//!
//! Every poll interval the engine asks the ready index for due ids and
//! spawns one independent worker per id, keeping the in-flight count under
//! `max_workers` (the fetch is clamped to the free budget so the bound
//! holds). The loop never blocks on worker completion and never exits on a
//! per-task or per-batch error.
//!
//! Reading the index claims nothing: an id whose worker has not finished
//! deleting by the next poll is handed to a second worker. Dispatch is
//! at-least-once; duplicate sends for the same id are the accepted cost of
//! running without a lease step. A worker that cannot even read its task
//! leaves every structure untouched, so the next poll retries it — there is
//! no retry cap for a permanently unreadable id.

use std::sync::Arc;
use std::time::Duration;

use remindq_core::config::SchedulerConfig;
use remindq_core::traits::notifier::Notifier;

use crate::flight::FlightCounter;
use crate::index::ReadyIndex;
use crate::store::TaskStore;

pub struct DispatchEngine {
    tasks: Arc<TaskStore>,
    index: Arc<ReadyIndex>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<FlightCounter>,
    max_workers: usize,
    poll_interval: Duration,
}

impl DispatchEngine {
    pub fn new(
        tasks: Arc<TaskStore>,
        index: Arc<ReadyIndex>,
        notifier: Arc<dyn Notifier>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            tasks,
            index,
            notifier,
            in_flight: Arc::new(FlightCounter::new()),
            max_workers: config.max_workers,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }

    /// Current number of running workers.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.current()
    }

    /// Wait until every spawned worker has exited.
    pub async fn wait_idle(&self) {
        self.in_flight.wait_idle().await;
    }

    /// One poll iteration: fetch due ids if the worker budget allows, spawn
    /// one worker per id. Returns how many workers were started.
    pub async fn poll_once(&self) -> usize {
        let current = self.in_flight.current();
        let budget = self.max_workers.saturating_sub(current.max(0) as usize);
        if budget == 0 {
            tracing::warn!(
                "⏸️ All {} worker slots busy, taking no new work this iteration",
                self.max_workers
            );
            return 0;
        }

        let batch = match self.index.query_batch(budget).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!("⚠️ Ready index query failed: {e}");
                return 0;
            }
        };

        let started = batch.len();
        for id in batch {
            self.in_flight.add(1);
            let tasks = Arc::clone(&self.tasks);
            let notifier = Arc::clone(&self.notifier);
            let in_flight = Arc::clone(&self.in_flight);
            tokio::spawn(async move {
                handle_task(&tasks, notifier.as_ref(), &id).await;
                in_flight.done();
            });
        }

        if started > 0 {
            tracing::debug!(
                "🔄 Dispatched {started} task(s), {} in flight",
                self.in_flight.current()
            );
        }
        started
    }

    /// Run the poll loop forever. Exits only with the process.
    pub async fn run(&self) {
        tracing::info!(
            "⏰ Dispatch loop started (poll every {:?}, {} workers max, notify via {})",
            self.poll_interval,
            self.max_workers,
            self.notifier.name()
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }
}

/// One worker: resolve the task and dispatch it — read, notify, delete.
///
/// A failed read exits early without deleting, leaving the index entry for
/// a future poll. The notifier has no error channel, so cleanup runs
/// whatever happened on the wire.
async fn handle_task(tasks: &TaskStore, notifier: &dyn Notifier, id: &str) {
    let task = match tasks.read(id).await {
        Ok(task) => task,
        Err(e) => {
            tracing::warn!("⚠️ Could not load task {id}: {e}");
            return;
        }
    };

    notifier
        .notify(&task.username, &task.email, &task.message, &task.id)
        .await;

    if let Err(e) = tasks.delete(&task).await {
        tracing::warn!("⚠️ Cleanup left stray state for task {}: {e}", task.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use remindq_core::error::{RemindqError, Result};
    use remindq_core::traits::clock::{Clock, ManualClock};
    use remindq_core::traits::store::KeyValueStore;
    use remindq_memory::MemoryStore;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::store::{READY_INDEX_KEY, user_list_key};
    use crate::tasks::User;

    const T0: i64 = 1_700_000_000;

    /// Records every delivery; optionally parks each call on a semaphore so
    /// tests can hold workers mid-dispatch.
    struct TestNotifier {
        calls: Mutex<Vec<(String, String, String, String)>>,
        gate: Option<Semaphore>,
    }

    impl TestNotifier {
        fn recording() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                gate: Some(Semaphore::new(0)),
            }
        }

        fn release(&self, n: usize) {
            self.gate.as_ref().unwrap().add_permits(n);
        }

        fn calls(&self) -> Vec<(String, String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl remindq_core::traits::notifier::Notifier for TestNotifier {
        fn name(&self) -> &str {
            "test"
        }

        async fn notify(&self, username: &str, email: &str, message: &str, task_id: &str) {
            self.calls.lock().unwrap().push((
                username.to_string(),
                email.to_string(),
                message.to_string(),
                task_id.to_string(),
            ));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }
    }

    /// Poll `cond` until it holds or a second passes.
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within 1s");
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        tasks: Arc<TaskStore>,
        notifier: Arc<TestNotifier>,
        engine: DispatchEngine,
    }

    /// Engine over a memory store with a manual clock pinned to T0. Tasks
    /// are created with lead 0 / window 1, so every due time is exactly T0.
    fn fixture(max_workers: usize, notifier: TestNotifier) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let kv = Arc::clone(&store) as Arc<dyn KeyValueStore>;
        let clk = Arc::clone(&clock) as Arc<dyn Clock>;

        let tasks = Arc::new(TaskStore::new(Arc::clone(&kv), Arc::clone(&clk), 0, 1));
        let index = Arc::new(ReadyIndex::new(kv, clk));
        let notifier = Arc::new(notifier);
        let config = SchedulerConfig {
            max_workers,
            ..SchedulerConfig::default()
        };
        let engine = DispatchEngine::new(
            Arc::clone(&tasks),
            index,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            &config,
        );

        Fixture {
            store,
            clock,
            tasks,
            notifier,
            engine,
        }
    }

    #[tokio::test]
    async fn test_due_task_is_notified_and_fully_pruned() {
        let f = fixture(50, TestNotifier::recording());
        let dave = User::new("dave", "dave@example.org");
        let id = f.tasks.create(&dave, "hello").await.unwrap();

        // Clock already sits at the due time; one poll does the whole job
        assert_eq!(f.engine.poll_once().await, 1);
        f.engine.wait_idle().await;

        assert_eq!(
            f.notifier.calls(),
            vec![(
                "dave".to_string(),
                "dave@example.org".to_string(),
                "hello".to_string(),
                id.clone()
            )]
        );
        assert!(f.store.hash_get_all(&id).await.unwrap().is_empty());
        assert_eq!(f.store.zset_len(READY_INDEX_KEY), 0);
        assert!(!f.store.key_exists(&user_list_key("dave")));
    }

    #[tokio::test]
    async fn test_future_task_is_left_alone() {
        let f = fixture(50, TestNotifier::recording());
        // A second store handle with a one-hour lead: this task is not due
        let future_tasks = TaskStore::new(
            Arc::clone(&f.store) as Arc<dyn KeyValueStore>,
            Arc::clone(&f.clock) as Arc<dyn Clock>,
            3_600,
            1,
        );
        let id = future_tasks
            .create(&User::new("dave", "dave@example.org"), "later")
            .await
            .unwrap();

        assert_eq!(f.engine.poll_once().await, 0);
        assert!(f.notifier.calls().is_empty());
        assert!(!f.store.hash_get_all(&id).await.unwrap().is_empty());

        // Once its hour arrives it dispatches normally
        f.clock.advance(3_600);
        assert_eq!(f.engine.poll_once().await, 1);
        f.engine.wait_idle().await;
        assert_eq!(f.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_max_workers() {
        let f = fixture(3, TestNotifier::gated());
        let user = User::new("dave", "dave@example.org");
        for i in 0..10 {
            f.tasks.create(&user, &format!("task {i}")).await.unwrap();
        }

        // First poll fills the pool and no further
        assert_eq!(f.engine.poll_once().await, 3);
        assert_eq!(f.engine.in_flight(), 3);

        // Budget exhausted: the next poll takes nothing
        assert_eq!(f.engine.poll_once().await, 0);
        assert_eq!(f.engine.in_flight(), 3);

        // Drain the pool, then the next poll refills up to the bound
        f.notifier.release(3);
        f.engine.wait_idle().await;
        assert_eq!(f.engine.poll_once().await, 3);
        assert!(f.engine.in_flight() <= 3);

        f.notifier.release(3);
        f.engine.wait_idle().await;
    }

    #[tokio::test]
    async fn test_unclaimed_id_is_dispatched_twice() {
        let f = fixture(50, TestNotifier::gated());
        let id = f
            .tasks
            .create(&User::new("dave", "dave@example.org"), "hello")
            .await
            .unwrap();

        // First worker starts and parks inside the notifier — the id is
        // still in the ready index because nothing claims on read
        assert_eq!(f.engine.poll_once().await, 1);
        wait_until(|| f.notifier.calls().len() == 1).await;

        // Second poll re-dispatches the same id while the first worker is
        // still in flight
        assert_eq!(f.engine.poll_once().await, 1);
        wait_until(|| f.notifier.calls().len() == 2).await;
        assert_eq!(f.engine.in_flight(), 2);

        let calls = f.notifier.calls();
        assert_eq!(calls[0].3, id);
        assert_eq!(calls[1].3, id);

        // Both workers finish; the second delete finds nothing left to
        // remove and that is fine
        f.notifier.release(2);
        f.engine.wait_idle().await;
        assert_eq!(f.store.zset_len(READY_INDEX_KEY), 0);
    }

    /// Store wrapper whose reads can be switched off, to drive the
    /// read-failure path through a worker.
    struct FlakyReadStore {
        inner: MemoryStore,
        fail_reads: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyReadStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }

        async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
            self.inner.hash_set(key, fields).await
        }

        async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(RemindqError::StoreRead("connection reset".to_string()));
            }
            self.inner.hash_get_all(key).await
        }

        async fn delete_key(&self, key: &str) -> Result<()> {
            self.inner.delete_key(key).await
        }

        async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
            self.inner.zset_add(key, member, score).await
        }

        async fn zset_range_by_score(
            &self,
            key: &str,
            max: f64,
            limit: usize,
        ) -> Result<Vec<String>> {
            self.inner.zset_range_by_score(key, max, limit).await
        }

        async fn zset_remove(&self, key: &str, member: &str) -> Result<()> {
            self.inner.zset_remove(key, member).await
        }

        async fn list_push(&self, key: &str, value: &str) -> Result<()> {
            self.inner.list_push(key, value).await
        }

        async fn list_remove(&self, key: &str, value: &str) -> Result<()> {
            self.inner.list_remove(key, value).await
        }

        async fn list_len(&self, key: &str) -> Result<usize> {
            self.inner.list_len(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_read_leaves_task_for_next_poll() {
        let store = Arc::new(FlakyReadStore {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
        });
        let clock = Arc::new(ManualClock::new(T0));
        let kv = Arc::clone(&store) as Arc<dyn KeyValueStore>;
        let clk = Arc::clone(&clock) as Arc<dyn Clock>;
        let tasks = Arc::new(TaskStore::new(Arc::clone(&kv), Arc::clone(&clk), 0, 1));
        let index = Arc::new(ReadyIndex::new(kv, clk));
        let notifier = Arc::new(TestNotifier::recording());
        let engine = DispatchEngine::new(
            Arc::clone(&tasks),
            index,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            &SchedulerConfig::default(),
        );

        let id = tasks
            .create(&User::new("dave", "dave@example.org"), "hello")
            .await
            .unwrap();

        // Reads down: the worker gives up without deleting anything
        store.fail_reads.store(true, Ordering::SeqCst);
        assert_eq!(engine.poll_once().await, 1);
        engine.wait_idle().await;
        assert!(notifier.calls().is_empty());
        assert_eq!(
            store
                .inner
                .zset_range_by_score(READY_INDEX_KEY, f64::INFINITY, 10)
                .await
                .unwrap(),
            vec![id.clone()]
        );

        // Reads back: the retained entry goes through on the next poll
        store.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(engine.poll_once().await, 1);
        engine.wait_idle().await;
        assert_eq!(notifier.calls().len(), 1);
        assert_eq!(store.inner.zset_len(READY_INDEX_KEY), 0);
    }
}
