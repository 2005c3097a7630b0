//! Checkpointed step execution
//!
//! [`CheckpointExecutor::checkpoint`] brackets one step of a run:
//!
//! 1. look the key up in the store;
//! 2. on a hit, decode and return the recorded value without calling the step;
//! 3. on a miss, call the step once, record its result, return it;
//! 4. if the step fails, return its error untouched and record nothing.
//!
//! A retry of the same run therefore skips every step that already succeeded,
//! network calls included, and resumes at the first step without a record.
//!
//! ```rust,ignore
//! let executor = CheckpointExecutor::new(store, RunId::new("github.com/acme/widget")?);
//!
//! let created: CreatedRepo = executor
//!     .checkpoint("create.repo.github.com.widget", || async {
//!         client.create_repository(&request).await
//!     })
//!     .await?;
//! ```
//!
//! The step's error type `E` passes through unchanged; it only has to accept
//! [`CheckpointError`] via `From` so that store failures and key misuse can be
//! reported on the same channel. Those are fatal: a failed read is never
//! treated as "not done yet" and a failed write is never treated as "done".

use crate::{
    error::CheckpointError,
    key::{CheckpointKey, RunId},
    store::CheckpointStore,
};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the steps of one workflow run through a [`CheckpointStore`]
pub struct CheckpointExecutor {
    store: Arc<dyn CheckpointStore>,
    run_id: RunId,
    in_flight: Mutex<HashSet<CheckpointKey>>,
}

impl CheckpointExecutor {
    pub fn new(store: Arc<dyn CheckpointStore>, run_id: RunId) -> Self {
        Self {
            store,
            run_id,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Run `step` at most once per successful completion of `key` in this run.
    ///
    /// # Errors
    /// - whatever `step` returns, verbatim
    /// - [`CheckpointError::InvalidKey`] for an empty key
    /// - [`CheckpointError::KeyInFlight`] if the key is already executing
    /// - [`CheckpointError::Store`] / [`CheckpointError::Serialization`] when
    ///   the record cannot be read, decoded, encoded or written
    pub async fn checkpoint<T, E, F, Fut>(&self, key: impl Into<String>, step: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CheckpointError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = CheckpointKey::new(key)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.run_id, &key)?;

        if let Some(value) = self.store.get(&self.run_id, &key).await? {
            debug!(run_id = %self.run_id, key = %key, "Checkpoint hit, skipping step");
            return serde_json::from_value(value).map_err(|e| E::from(CheckpointError::from(e)));
        }

        info!(run_id = %self.run_id, key = %key, "Executing checkpointed step");
        let result = match step().await {
            Ok(result) => result,
            Err(err) => {
                warn!(run_id = %self.run_id, key = %key, "Checkpointed step failed, nothing recorded");
                return Err(err);
            }
        };

        let value = serde_json::to_value(&result).map_err(|e| E::from(CheckpointError::from(e)))?;
        self.store.put(&self.run_id, &key, value).await?;
        debug!(run_id = %self.run_id, key = %key, "Checkpoint recorded");

        Ok(result)
    }
}

/// Marks a key as executing for the lifetime of one `checkpoint` call
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<CheckpointKey>>,
    key: CheckpointKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(
        in_flight: &'a Mutex<HashSet<CheckpointKey>>,
        run_id: &RunId,
        key: &CheckpointKey,
    ) -> Result<Self, CheckpointError> {
        if !in_flight.lock().insert(key.clone()) {
            return Err(CheckpointError::KeyInFlight {
                run_id: run_id.to_string(),
                key: key.to_string(),
            });
        }
        Ok(Self {
            in_flight,
            key: key.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
