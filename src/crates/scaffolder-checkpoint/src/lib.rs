//! # scaffolder-checkpoint - Idempotent steps for provisioning workflows
//!
//! Provisioning actions run a short, ordered sequence of side-effecting
//! steps: create a remote repository, then push the initial commit; create a
//! group, then its sub-group. When a later step fails the whole action is
//! retried, and the earlier steps must not run again.
//!
//! This crate records the result of every successful step under a
//! deterministic key and replays it on retry.
//!
//! ## Core Concepts
//!
//! - [`RunId`] - one logical execution of an action, derived from its inputs
//!   (e.g. `github.com/acme/widget`), stable across process invocations
//! - [`CheckpointKey`] - one step within a run (e.g. `create.repo.github.com.widget`)
//! - [`CheckpointStore`] - `(run_id, key) -> JSON` persistence contract
//! - [`CheckpointExecutor`] - runs a step at most once per successful completion
//!
//! Stores:
//!
//! - [`InMemoryCheckpointStore`] - process-lifetime map, for tests and short runs
//! - [`SqliteCheckpointStore`] - `checkpoints` table via sqlx, survives restarts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scaffolder_checkpoint::{CheckpointError, CheckpointExecutor, InMemoryCheckpointStore, RunId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CheckpointError> {
//!     let store = Arc::new(InMemoryCheckpointStore::new());
//!     let executor = CheckpointExecutor::new(store, RunId::new("github.com/acme/widget")?);
//!
//!     let url: String = executor
//!         .checkpoint("create.repo.github.com.widget", || async {
//!             Ok::<_, CheckpointError>("https://github.com/acme/widget.git".to_string())
//!         })
//!         .await?;
//!
//!     // Same run, same key: the recorded value comes back, the step is skipped.
//!     let again: String = executor
//!         .checkpoint("create.repo.github.com.widget", || async {
//!             Ok::<_, CheckpointError>("never produced".to_string())
//!         })
//!         .await?;
//!     assert_eq!(url, again);
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - a step that succeeded is never invoked again for the same run and key
//! - a step that failed leaves no record, so the retry re-attempts it
//! - store failures are fatal and never mistaken for "absent" or "present"
//!
//! Steps within a run are expected to execute sequentially. Overlapping
//! calls for the same key are rejected with [`CheckpointError::KeyInFlight`].

pub mod error;
pub mod executor;
pub mod key;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod store;

pub use error::{CheckpointError, Result};
pub use executor::CheckpointExecutor;
pub use key::{CheckpointKey, RunId};
pub use memory::InMemoryCheckpointStore;
pub use record::{CheckpointRecord, CheckpointStatus};
pub use sqlite::SqliteCheckpointStore;
pub use store::CheckpointStore;
