//! Persistence contract for checkpoint records
//!
//! A [`CheckpointStore`] maps `(run_id, key)` to the JSON value a step
//! produced. The medium is up to the host: [`InMemoryCheckpointStore`] for
//! short-lived runs and tests, [`SqliteCheckpointStore`] for runs that must
//! survive a process restart.
//!
//! Implementations must provide:
//!
//! - **`get()`** - pure lookup; `Ok(None)` for unknown keys, never a
//!   partially written value
//! - **`put()`** - atomic with respect to concurrent readers; once it returns,
//!   a `get()` for the same run and key observes the new value
//! - **`list()`** - the run's records in insertion order
//! - **`delete_run()`** - drop every record of a run
//!
//! Errors must be reported as [`CheckpointError::Store`]. The executor treats
//! them as fatal; a store must never report a failed read as `Ok(None)`.
//!
//! [`InMemoryCheckpointStore`]: crate::memory::InMemoryCheckpointStore
//! [`SqliteCheckpointStore`]: crate::sqlite::SqliteCheckpointStore
//! [`CheckpointError::Store`]: crate::error::CheckpointError::Store

use crate::error::Result;
use crate::key::{CheckpointKey, RunId};
use crate::record::CheckpointRecord;
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Fetch the value recorded for `key` in `run_id`
    async fn get(&self, run_id: &RunId, key: &CheckpointKey) -> Result<Option<serde_json::Value>>;

    /// Record `value` for `key` in `run_id`, replacing any previous value
    async fn put(&self, run_id: &RunId, key: &CheckpointKey, value: serde_json::Value) -> Result<()>;

    /// All records of a run, oldest first
    async fn list(&self, run_id: &RunId) -> Result<Vec<CheckpointRecord>>;

    /// Remove every record of a run
    async fn delete_run(&self, run_id: &RunId) -> Result<()>;

    /// Check whether a step of the run has completed
    async fn contains(&self, run_id: &RunId, key: &CheckpointKey) -> Result<bool> {
        Ok(self.get(run_id, key).await?.is_some())
    }
}
