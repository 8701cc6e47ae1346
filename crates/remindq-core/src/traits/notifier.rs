//! Notification sink seam.

use async_trait::async_trait;

/// Fire-and-forget notification sink. The dispatcher consumes no result from
/// a send — implementations log their own failures and the task is cleaned
/// up either way.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sink name for logs.
    fn name(&self) -> &str;

    /// Deliver one task's message to its recipient.
    async fn notify(&self, username: &str, email: &str, message: &str, task_id: &str);
}
