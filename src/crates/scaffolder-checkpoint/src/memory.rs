//! In-memory checkpoint storage
//!
//! [`InMemoryCheckpointStore`] keeps every run's records in a
//! `Arc<RwLock<HashMap>>`. Records survive as long as the process does, which
//! is enough for a single CLI invocation, for hosts that keep the store alive
//! between retries, and for tests. Cloning the store shares the same map.

use crate::{
    error::Result,
    key::{CheckpointKey, RunId},
    record::CheckpointRecord,
    store::CheckpointStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe map of run id to that run's records in insertion order
type RunStorage = Arc<RwLock<HashMap<RunId, Vec<CheckpointRecord>>>>;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    storage: RunStorage,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs holding at least one record
    pub async fn run_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Total number of records across all runs
    pub async fn record_count(&self) -> usize {
        self.storage
            .read()
            .await
            .values()
            .map(|records| records.len())
            .sum()
    }

    /// Clear all runs (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, run_id: &RunId, key: &CheckpointKey) -> Result<Option<serde_json::Value>> {
        let storage = self.storage.read().await;

        Ok(storage
            .get(run_id)
            .and_then(|records| records.iter().find(|r| &r.key == key))
            .map(|record| record.value.clone()))
    }

    async fn put(&self, run_id: &RunId, key: &CheckpointKey, value: serde_json::Value) -> Result<()> {
        let mut storage = self.storage.write().await;
        let records = storage.entry(run_id.clone()).or_default();

        match records.iter_mut().find(|r| &r.key == key) {
            Some(existing) => existing.value = value,
            None => records.push(CheckpointRecord::new(key.clone(), value)),
        }

        Ok(())
    }

    async fn list(&self, run_id: &RunId) -> Result<Vec<CheckpointRecord>> {
        Ok(self
            .storage
            .read()
            .await
            .get(run_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_run(&self, run_id: &RunId) -> Result<()> {
        self.storage.write().await.remove(run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(id: &str) -> RunId {
        RunId::new(id).unwrap()
    }

    fn key(k: &str) -> CheckpointKey {
        CheckpointKey::new(k).unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_none() {
        let store = InMemoryCheckpointStore::new();
        let value = store.get(&run("run-1"), &key("missing")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_read_your_writes() {
        let store = InMemoryCheckpointStore::new();
        store
            .put(&run("run-1"), &key("create.repo"), json!({"url": "https://x.git"}))
            .await
            .unwrap();

        let value = store.get(&run("run-1"), &key("create.repo")).await.unwrap();
        assert_eq!(value, Some(json!({"url": "https://x.git"})));
        assert!(store.contains(&run("run-1"), &key("create.repo")).await.unwrap());
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        store.put(&run("run-1"), &key("step"), json!(1)).await.unwrap();

        assert!(store.get(&run("run-2"), &key("step")).await.unwrap().is_none());
        assert_eq!(store.run_count().await, 1);
    }

    #[tokio::test]
    async fn test_put_same_key_keeps_single_record() {
        let store = InMemoryCheckpointStore::new();
        store.put(&run("run-1"), &key("step"), json!(1)).await.unwrap();
        store.put(&run("run-1"), &key("step"), json!(2)).await.unwrap();

        assert_eq!(store.record_count().await, 1);
        assert_eq!(store.get(&run("run-1"), &key("step")).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = InMemoryCheckpointStore::new();
        store.put(&run("run-1"), &key("b"), json!("second")).await.unwrap();
        store.put(&run("run-1"), &key("a"), json!("third")).await.unwrap();

        let records = store.list(&run("run-1")).await.unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_delete_run() {
        let store = InMemoryCheckpointStore::new();
        store.put(&run("run-1"), &key("step"), json!(null)).await.unwrap();
        store.put(&run("run-2"), &key("step"), json!(null)).await.unwrap();

        store.delete_run(&run("run-1")).await.unwrap();

        assert_eq!(store.run_count().await, 1);
        assert!(store.list(&run("run-1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = InMemoryCheckpointStore::new();
        let other = store.clone();
        store.put(&run("run-1"), &key("step"), json!(true)).await.unwrap();

        assert_eq!(other.get(&run("run-1"), &key("step")).await.unwrap(), Some(json!(true)));

        other.clear().await;
        assert_eq!(store.record_count().await, 0);
    }
}
