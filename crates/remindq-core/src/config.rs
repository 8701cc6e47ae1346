//! remindq configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindqConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for RemindqConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl RemindqConfig {
    /// Load config from the default path (~/.remindq/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::RemindqError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::RemindqError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RemindqError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".remindq")
            .join("config.toml")
    }

    /// Get the remindq home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".remindq")
    }
}

/// Scheduling and dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently running workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Seconds between poll iterations.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum distance into the future for a new task's due time.
    /// Keeps freshly created tasks from firing near-immediately.
    #[serde(default = "default_lead_time_secs")]
    pub lead_time_secs: i64,
    /// Width of the scheduling window beyond the lead time. Due times are
    /// drawn uniformly from [now + lead, now + lead + window).
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// When true, the ready index hands out the oldest pending ids whether
    /// or not they are due yet, instead of bounding the scan to now.
    #[serde(default)]
    pub include_future: bool,
}

fn default_max_workers() -> usize { 50 }
fn default_poll_interval_secs() -> u64 { 5 }
fn default_lead_time_secs() -> i64 { 60 * 60 * 24 }
fn default_window_secs() -> i64 { 60 * 60 * 24 * 14 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            poll_interval_secs: default_poll_interval_secs(),
            lead_time_secs: default_lead_time_secs(),
            window_secs: default_window_secs(),
            include_future: false,
        }
    }
}

/// Notification sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook URL to POST dispatched tasks to. Empty = log-only delivery.
    #[serde(default)]
    pub webhook_url: String,
    /// Extra headers for webhook requests.
    #[serde(default)]
    pub webhook_headers: Vec<(String, String)>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            webhook_headers: Vec::new(),
        }
    }
}
