//! Task store — the three linked structures that represent a pending task.
//!
//! - detail hash keyed by the task id: everything needed to run the task
//! - `"tasks"` sorted set: ids scored by due time, scanned by the ready index
//! - `"{username}_tasks"` list: that user's pending ids
//!
//! This component is the sole writer and deleter of all three. The dispatch
//! engine only reads, and requests deletion through here.
//!
//! Create is not transactional: the store offers no multi-key transaction,
//! so a failed write surfaces to the caller and any earlier writes in the
//! same call stay behind.

use std::sync::Arc;

use rand::Rng;
use remindq_core::config::SchedulerConfig;
use remindq_core::error::{RemindqError, Result};
use remindq_core::traits::clock::Clock;
use remindq_core::traits::store::KeyValueStore;

use crate::identity;
use crate::tasks::{Task, User};

/// Key of the global ready index.
pub const READY_INDEX_KEY: &str = "tasks";

const FIELD_ID: &str = "id";
const FIELD_SCHEDULED_TIME: &str = "scheduled_time";
const FIELD_USERNAME: &str = "username";
const FIELD_EMAIL: &str = "email";
const FIELD_MESSAGE: &str = "message";

/// Key of a user's pending list.
pub fn user_list_key(username: &str) -> String {
    format!("{username}_tasks")
}

pub struct TaskStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Minimum distance into the future for a new due time.
    lead_secs: i64,
    /// Width of the scheduling window beyond the lead.
    window_secs: i64,
}

impl TaskStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        lead_secs: i64,
        window_secs: i64,
    ) -> Self {
        Self {
            store,
            clock,
            lead_secs,
            window_secs,
        }
    }

    pub fn from_config(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(store, clock, config.lead_time_secs, config.window_secs)
    }

    /// Pick a due time uniformly from [now + lead, now + lead + window).
    /// The lead keeps fresh tasks from firing near-immediately.
    fn draw_scheduled_time(&self) -> i64 {
        let min = self.clock.now_secs() + self.lead_secs;
        min + rand::thread_rng().gen_range(0..self.window_secs.max(1))
    }

    /// Create a task for `user` and link it into all three structures.
    /// Returns the derived task id.
    pub async fn create(&self, user: &User, message: &str) -> Result<String> {
        let scheduled_time = self.draw_scheduled_time();
        let id = identity::task_id(scheduled_time, &user.name, message);

        let fields = [
            (FIELD_ID.to_string(), id.clone()),
            (FIELD_SCHEDULED_TIME.to_string(), scheduled_time.to_string()),
            (FIELD_USERNAME.to_string(), user.name.clone()),
            (FIELD_EMAIL.to_string(), user.email.clone()),
            (FIELD_MESSAGE.to_string(), message.to_string()),
        ];
        self.store.hash_set(&id, &fields).await?;
        self.store
            .zset_add(READY_INDEX_KEY, &id, scheduled_time as f64)
            .await?;
        self.store.list_push(&user_list_key(&user.name), &id).await?;

        tracing::debug!(
            "📝 Task {} created for {} (due {})",
            &id[..8],
            user.name,
            scheduled_time
        );
        Ok(id)
    }

    /// Resolve a task id to its full details.
    pub async fn read(&self, id: &str) -> Result<Task> {
        let fields = self.store.hash_get_all(id).await?;
        if fields.is_empty() {
            return Err(RemindqError::NotFound(id.to_string()));
        }

        let scheduled_time = fields
            .get(FIELD_SCHEDULED_TIME)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Ok(Task {
            id: fields
                .get(FIELD_ID)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            scheduled_time,
            username: fields.get(FIELD_USERNAME).cloned().unwrap_or_default(),
            email: fields.get(FIELD_EMAIL).cloned().unwrap_or_default(),
            message: fields.get(FIELD_MESSAGE).cloned().unwrap_or_default(),
        })
    }

    /// Remove every representation of `task`, best effort: each sub-removal
    /// is attempted even when an earlier one failed, and failures come back
    /// aggregated as one `PartialCleanup`.
    pub async fn delete(&self, task: &Task) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        if let Err(e) = self.store.delete_key(&task.id).await {
            failures.push(format!("details: {e}"));
        }
        if let Err(e) = self.store.zset_remove(READY_INDEX_KEY, &task.id).await {
            failures.push(format!("ready index: {e}"));
        }

        let list_key = user_list_key(&task.username);
        if let Err(e) = self.store.list_remove(&list_key, &task.id).await {
            failures.push(format!("user list: {e}"));
        }

        // An emptied pending list is removed outright so the store does not
        // accumulate one dead key per user ever seen.
        match self.store.list_len(&list_key).await {
            Ok(0) => {
                if let Err(e) = self.store.delete_key(&list_key).await {
                    failures.push(format!("user list key: {e}"));
                } else {
                    tracing::debug!("🧹 Removed empty pending list {list_key}");
                }
            }
            Ok(_) => {}
            Err(e) => failures.push(format!("user list length: {e}")),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RemindqError::PartialCleanup(failures.join("; ")))
        }
    }
}
