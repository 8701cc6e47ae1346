//! remindq error taxonomy.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RemindqError>;

/// Every error the system can surface.
#[derive(Debug, Error)]
pub enum RemindqError {
    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// A write against the backing store failed.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// A read against the backing store failed (transport, not absence).
    #[error("Store read failed: {0}")]
    StoreRead(String),

    /// No task exists under the given id.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// One or more of the removals in a task delete failed. The remaining
    /// removals were still attempted; the message lists what was left behind.
    #[error("Partial cleanup: {0}")]
    PartialCleanup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
