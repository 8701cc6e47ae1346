//! # remindq — scheduled notification runner
//!
//! Schedules per-user tasks in the backing store and runs the bounded
//! worker-pool dispatch loop until the process is stopped.
//!
//! Usage:
//!   remindq                         # Run the dispatch loop
//!   remindq --demo                  # Seed a sample task, exercise the
//!                                   # round trip, then run the loop
//!   remindq --config path.toml      # Explicit config file

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use remindq_core::RemindqConfig;
use remindq_core::traits::clock::{Clock, SystemClock};
use remindq_core::traits::notifier::Notifier;
use remindq_core::traits::store::KeyValueStore;
use remindq_memory::MemoryStore;
use remindq_scheduler::{DispatchEngine, LogNotifier, ReadyIndex, TaskStore, User, WebhookNotifier};

#[derive(Parser)]
#[command(
    name = "remindq",
    version,
    about = "⏰ remindq — per-user scheduled notifications"
)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "~/.remindq/config.toml")]
    config: String,

    /// Seed a sample task and exercise create/read/notify before the loop
    #[arg(long)]
    demo: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "remindq=debug"
    } else {
        "remindq=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Load config
    let config_path = shellexpand::tilde(&cli.config).to_string();
    let config = if Path::new(&config_path).exists() {
        RemindqConfig::load_from(Path::new(&config_path))?
    } else {
        RemindqConfig::default()
    };

    // Connect the store and check it answers
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.ping().await?;
    tracing::info!("🔌 Store '{}' is up", store.name());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tasks = Arc::new(TaskStore::from_config(
        Arc::clone(&store),
        Arc::clone(&clock),
        &config.scheduler,
    ));
    let index = Arc::new(
        ReadyIndex::new(Arc::clone(&store), Arc::clone(&clock))
            .include_future(config.scheduler.include_future),
    );

    let notifier: Arc<dyn Notifier> = if config.notify.webhook_url.is_empty() {
        Arc::new(LogNotifier)
    } else {
        Arc::new(WebhookNotifier::from_config(&config.notify))
    };

    if cli.demo {
        let dave = User::new("dave", "dave@example.org");
        let id = tasks
            .create(
                &dave,
                "This is a task message! Woohoo! Test all kinds of symbols and stuff in here.",
            )
            .await?;
        tracing::info!("🧪 Demo task created: {id}");

        let task = tasks.read(&id).await?;
        tracing::info!("🧪 Demo task reads back: due {} for {}", task.scheduled_time, task.username);
        notifier
            .notify(&task.username, &task.email, &task.message, &task.id)
            .await;
    }

    let engine = DispatchEngine::new(tasks, index, notifier, &config.scheduler);
    engine.run().await;
    Ok(())
}
