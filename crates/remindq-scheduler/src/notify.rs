//! Bundled notifier implementations.
//!
//! The engine treats every sink as fire-and-forget: implementations log
//! their own failures and surface nothing. A task whose send failed is still
//! cleaned up — if that is not acceptable for a deployment, it needs a sink
//! that retries internally.

use async_trait::async_trait;
use remindq_core::config::NotifyConfig;
use remindq_core::traits::notifier::Notifier;

/// Structured-log delivery. Stands in for a real mail/push integration in
/// standalone runs and demos.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, username: &str, email: &str, message: &str, task_id: &str) {
        tracing::info!(
            "📧 Task {} for {username}: sending to {email} with message: {message}",
            &task_id[..task_id.len().min(8)]
        );
    }
}

/// POSTs each dispatched task as JSON to a configured URL.
pub struct WebhookNotifier {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            headers: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            url: config.webhook_url.clone(),
            headers: config.webhook_headers.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, username: &str, email: &str, message: &str, task_id: &str) {
        let mut req = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "task_id": task_id,
                "username": username,
                "email": email,
                "message": message,
                "sent_at": chrono::Utc::now().to_rfc3339(),
            }))
            .timeout(std::time::Duration::from_secs(10));

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("✅ Webhook delivered task {task_id} for {username}");
            }
            Ok(resp) => {
                tracing::warn!("⚠️ Webhook returned {} for task {task_id}", resp.status());
            }
            Err(e) => {
                tracing::warn!("⚠️ Webhook send failed for task {task_id}: {e}");
            }
        }
    }
}
