//! Trait seams — implemented by backend crates, consumed by the scheduler.
//! Every component takes its collaborators through these, never through
//! process-global state.

pub mod clock;
pub mod notifier;
pub mod store;
