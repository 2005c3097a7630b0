//! Stored checkpoint records

use crate::key::CheckpointKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state of a record.
///
/// Only successful steps are ever recorded, so this has a single variant;
/// the presence of a record is what marks the step as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStatus {
    #[default]
    Completed,
}

/// The recorded result of one successfully completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Step identity within the run
    pub key: CheckpointKey,

    /// Opaque result produced by the step function
    pub value: serde_json::Value,

    #[serde(default)]
    pub status: CheckpointStatus,

    /// When the step first completed
    pub created_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn new(key: CheckpointKey, value: serde_json::Value) -> Self {
        Self {
            key,
            value,
            status: CheckpointStatus::Completed,
            created_at: Utc::now(),
        }
    }
}
