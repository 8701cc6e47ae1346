//! Key-value store seam.
//!
//! The scheduler reaches its backing store only through this trait. Three
//! capabilities are required: hash records (task details), one score-sorted
//! set (due-time index), and per-user lists (pending ids). Each operation is
//! atomic on its own; no multi-key transaction is assumed anywhere.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Connectivity check.
    async fn ping(&self) -> Result<()>;

    /// Set named fields under a hash key, creating the key if needed.
    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// All fields under a hash key. Empty map when the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Delete a key of any kind. Deleting an absent key is not an error.
    async fn delete_key(&self, key: &str) -> Result<()>;

    /// Add a member to a sorted set with the given score, replacing the
    /// member's previous score if it was already present.
    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Up to `limit` members with score <= `max`, in ascending score order.
    /// Pass `f64::INFINITY` for an unbounded scan.
    async fn zset_range_by_score(&self, key: &str, max: f64, limit: usize) -> Result<Vec<String>>;

    /// Remove a member from a sorted set. Absent members are ignored.
    async fn zset_remove(&self, key: &str, member: &str) -> Result<()>;

    /// Push a value onto the head of a list, creating the key if needed.
    async fn list_push(&self, key: &str, value: &str) -> Result<()>;

    /// Remove one occurrence of `value` from a list. Absent values are
    /// ignored.
    async fn list_remove(&self, key: &str, value: &str) -> Result<()>;

    /// Number of elements in a list. Zero when the key is absent.
    async fn list_len(&self, key: &str) -> Result<usize>;
}
