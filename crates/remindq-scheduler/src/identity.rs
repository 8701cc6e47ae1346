//! Deterministic task identity.

use sha2::{Digest, Sha256};

/// Derive the stable id for a task from its due time, owner, and message.
///
/// The id doubles as the detail-record key and as the member identity in the
/// ready index and the user's pending list, so it must be a pure function of
/// its inputs. Two creations with identical inputs land on the same id and
/// overwrite each other — that is the intended primary-key behavior.
pub fn task_id(scheduled_time: i64, username: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{scheduled_time}-{username}-{message}").as_bytes());
    hex::encode(hasher.finalize())
}
