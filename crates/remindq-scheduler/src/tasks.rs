//! Task model — the unit of schedulable work.

use serde::{Deserialize, Serialize};

/// A user who can own pending tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

/// A scheduled unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Derived id — primary key of the detail record and the member
    /// identity in the ready index and the owner's pending list.
    pub id: String,
    /// Earliest instant (unix seconds) the task may be dispatched.
    pub scheduled_time: i64,
    /// Owner. Namespaces the pending list.
    pub username: String,
    /// Delivery address.
    pub email: String,
    /// Payload handed to the notifier.
    pub message: String,
}
