//! SQLite-backed checkpoint storage
//!
//! Records live in a single `checkpoints` table keyed by
//! `(run_id, step_key)`; the table is created by the embedded migrations in
//! `migrations/`. `put` is an upsert so the one-record-per-key invariant is
//! enforced by the primary key rather than by the caller.

use crate::{
    error::{CheckpointError, Result},
    key::{CheckpointKey, RunId},
    record::{CheckpointRecord, CheckpointStatus},
    store::CheckpointStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, FromRow)]
struct CheckpointRow {
    step_key: String,
    value: String,
    created_at: String,
}

impl TryFrom<CheckpointRow> for CheckpointRecord {
    type Error = CheckpointError;

    fn try_from(row: CheckpointRow) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| CheckpointError::store(format!("Invalid created_at '{}': {}", row.created_at, e)))?
            .with_timezone(&Utc);

        Ok(CheckpointRecord {
            key: CheckpointKey::new(row.step_key)?,
            value: serde_json::from_str(&row.value)?,
            status: CheckpointStatus::Completed,
            created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (creating if needed) the database at `database_url` and migrate it
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite:state.db" or "sqlite::memory:")
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so in-memory
        // stores are pinned to one connection that is never recycled.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running pending migrations first
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Checkpoint store migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the underlying pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, run_id: &RunId, key: &CheckpointKey) -> Result<Option<serde_json::Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM checkpoints WHERE run_id = ? AND step_key = ?")
                .bind(run_id.as_str())
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, run_id: &RunId, key: &CheckpointKey, value: serde_json::Value) -> Result<()> {
        let encoded = serde_json::to_string(&value)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO checkpoints (run_id, step_key, value, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (run_id, step_key) DO UPDATE SET value = excluded.value",
        )
        .bind(run_id.as_str())
        .bind(key.as_str())
        .bind(&encoded)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, run_id: &RunId) -> Result<Vec<CheckpointRecord>> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            "SELECT step_key, value, created_at FROM checkpoints WHERE run_id = ? ORDER BY rowid ASC",
        )
        .bind(run_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CheckpointRecord::try_from).collect()
    }

    async fn delete_run(&self, run_id: &RunId) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE run_id = ?")
            .bind(run_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store() -> SqliteCheckpointStore {
        SqliteCheckpointStore::connect("sqlite::memory:").await.unwrap()
    }

    fn run(id: &str) -> RunId {
        RunId::new(id).unwrap()
    }

    fn key(k: &str) -> CheckpointKey {
        CheckpointKey::new(k).unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_none() {
        let store = memory_store().await;
        assert!(store.get(&run("r"), &key("k")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = memory_store().await;
        let value = json!({"remoteUrl": "https://bitbucket.org/ws/widget.git"});
        store.put(&run("r"), &key("create.repo"), value.clone()).await.unwrap();

        assert_eq!(store.get(&run("r"), &key("create.repo")).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_null_value_is_a_record() {
        let store = memory_store().await;
        store.put(&run("r"), &key("push"), json!(null)).await.unwrap();

        assert_eq!(store.get(&run("r"), &key("push")).await.unwrap(), Some(json!(null)));
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row() {
        let store = memory_store().await;
        store.put(&run("r"), &key("k"), json!(1)).await.unwrap();
        store.put(&run("r"), &key("k"), json!(2)).await.unwrap();

        let records = store.list(&run("r")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, json!(2));
    }

    #[tokio::test]
    async fn test_list_and_delete_run() {
        let store = memory_store().await;
        store.put(&run("a"), &key("first"), json!(1)).await.unwrap();
        store.put(&run("a"), &key("second"), json!(2)).await.unwrap();
        store.put(&run("b"), &key("first"), json!(3)).await.unwrap();

        let keys: Vec<_> = store
            .list(&run("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key.to_string())
            .collect();
        assert_eq!(keys, vec!["first", "second"]);

        store.delete_run(&run("a")).await.unwrap();
        assert!(store.list(&run("a")).await.unwrap().is_empty());
        assert_eq!(store.list(&run("b")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("state.db").display());

        let store = SqliteCheckpointStore::connect(&url).await.unwrap();
        store.put(&run("r"), &key("k"), json!("abc123")).await.unwrap();
        store.close().await;

        let reopened = SqliteCheckpointStore::connect(&url).await.unwrap();
        assert_eq!(reopened.get(&run("r"), &key("k")).await.unwrap(), Some(json!("abc123")));
    }

    #[tokio::test]
    async fn test_closed_pool_is_store_error() {
        let store = memory_store().await;
        store.pool().close().await;

        let err = store.get(&run("r"), &key("k")).await.unwrap_err();
        assert!(err.is_store_error());
    }
}
