//! # remindq Scheduler
//!
//! Schedules per-user tasks for future delivery and dispatches them with a
//! bounded worker pool once they come due.
//!
//! ## Architecture
//! ```text
//! TaskStore::create
//!   ├── detail hash        (key = task id)      what to deliver, to whom
//!   ├── "tasks" sorted set (score = due time)   what is due next
//!   └── "{user}_tasks" list                     what user X still has pending
//!
//! DispatchEngine (tokio interval, every 5s)
//!   ├── ReadyIndex::query_batch → due task ids, soonest first
//!   └── per id: spawn worker (FlightCounter-bounded)
//!         read details → Notifier::notify → TaskStore::delete
//! ```
//!
//! A task id still sitting in the ready index when the next poll fires is
//! handed to a second worker — dispatch is at-least-once, and there is no
//! claim/lease step narrowing that window. See `engine` for the exact
//! contract.

pub mod engine;
pub mod flight;
pub mod identity;
pub mod index;
pub mod notify;
pub mod store;
pub mod tasks;

pub use engine::DispatchEngine;
pub use flight::FlightCounter;
pub use identity::task_id;
pub use index::ReadyIndex;
pub use notify::{LogNotifier, WebhookNotifier};
pub use store::TaskStore;
pub use tasks::{Task, User};
