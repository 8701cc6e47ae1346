//! In-memory key-value store with hash, sorted-set, and list structures.
//! One mutex around the whole state: each trait operation locks, mutates,
//! and unlocks — nothing is held across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use remindq_core::error::Result;
use remindq_core::traits::store::KeyValueStore;

#[derive(Default)]
struct State {
    hashes: HashMap<String, HashMap<String, String>>,
    /// Sorted sets, kept ordered by (score, member).
    zsets: HashMap<String, Vec<(f64, String)>>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-memory store. Cheap to clone state assertions off of in tests, and
/// good enough to run the whole system standalone.
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Whether any structure exists under `key`. Test helper: an emptied
    /// list key must disappear, and this is how tests tell "empty" from
    /// "gone".
    pub fn key_exists(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.hashes.contains_key(key)
            || state.zsets.contains_key(key)
            || state.lists.contains_key(key)
    }

    /// Number of members in a sorted set. Zero when the key is absent.
    pub fn zset_len(&self, key: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.zsets.get(key).map(|z| z.len()).unwrap_or(0)
    }

    /// Snapshot of a list, head first. Empty when the key is absent.
    pub fn list_snapshot(&self, key: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .lists
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (name, value) in fields {
            hash.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().unwrap();
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn delete_key(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.hashes.remove(key);
        state.zsets.remove(key);
        state.lists.remove(key);
        Ok(())
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let zset = state.zsets.entry(key.to_string()).or_default();
        zset.retain(|(_, m)| m != member);
        zset.push((score, member.to_string()));
        zset.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then_with(|| a.1.cmp(&b.1)));
        Ok(())
    }

    async fn zset_range_by_score(&self, key: &str, max: f64, limit: usize) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let members = state
            .zsets
            .get(key)
            .map(|zset| {
                zset.iter()
                    .filter(|(score, _)| *score <= max)
                    .take(limit)
                    .map(|(_, member)| member.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(members)
    }

    async fn zset_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(zset) = state.zsets.get_mut(key) {
            zset.retain(|(_, m)| m != member);
        }
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(list) = state.lists.get_mut(key) {
            if let Some(pos) = list.iter().position(|v| v == value) {
                list.remove(pos);
            }
        }
        Ok(())
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let state = self.state.lock().unwrap();
        Ok(state.lists.get(key).map(|l| l.len()).unwrap_or(0))
    }
}
