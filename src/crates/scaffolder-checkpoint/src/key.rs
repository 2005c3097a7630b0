//! Run identifiers and step keys
//!
//! Both are plain strings on the wire. They are derived from the caller's
//! inputs (target host, repository name, ...) so that re-running an action
//! with the same inputs lands on the same run and the same step records.

use crate::error::{CheckpointError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one logical workflow run across process invocations
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Create a run id, rejecting empty values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CheckpointError::InvalidKey("run id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Join the non-empty parts with `/`.
    ///
    /// `RunId::from_parts(["github.com", "acme", "widget"])` is
    /// `github.com/acme/widget`.
    pub fn from_parts<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(join_non_empty(parts, "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifies one step within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointKey(String);

impl CheckpointKey {
    /// Create a key, rejecting empty values
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CheckpointError::InvalidKey(
                "checkpoint key must not be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// Join the non-empty segments with `.`.
    ///
    /// `CheckpointKey::from_segments(["create", "repo", "github.com", "widget"])`
    /// is `create.repo.github.com.widget`.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(join_non_empty(segments, "."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CheckpointKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CheckpointKey {
    type Error = CheckpointError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for CheckpointKey {
    type Error = CheckpointError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

fn join_non_empty<I, S>(parts: I, separator: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter(|p| !p.as_ref().is_empty())
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
