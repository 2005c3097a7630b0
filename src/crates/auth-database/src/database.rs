//! Lazily connected auth database
//!
//! [`AuthDatabase::get`] opens the pool and runs pending migrations the first
//! time it is called. Concurrent first callers all wait on the same
//! initialization; once it has succeeded every later call returns the same
//! pool without touching the database service again. A failed
//! initialization is not remembered, so the next call tries again.

use crate::error::DbResult;
use crate::service::{DatabasePool, DatabaseService};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct AuthDatabase {
    database: Arc<dyn DatabaseService>,
    pool: OnceCell<DatabasePool>,
}

impl AuthDatabase {
    pub fn create(database: Arc<dyn DatabaseService>) -> Self {
        Self {
            database,
            pool: OnceCell::new(),
        }
    }

    /// Apply the auth backend's embedded migrations to `pool`
    pub async fn run_migrations(pool: &DatabasePool) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }

    /// The shared pool, connecting and migrating on first use
    pub async fn get(&self) -> DbResult<DatabasePool> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                let client = self.database.get_client().await?;
                if self.database.skip_migrations() {
                    tracing::debug!("Skipping auth database migrations");
                } else {
                    Self::run_migrations(&client).await?;
                    tracing::info!("Auth database migrations applied");
                }
                Ok::<_, crate::error::DatabaseError>(client)
            })
            .await?;

        Ok(pool.clone())
    }

    /// Whether the pool has been established
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    /// Perform a health check by running a simple query
    pub async fn health_check(&self) -> DbResult<()> {
        let pool = self.get().await?;
        sqlx::query("SELECT 1").fetch_one(&pool).await?;
        Ok(())
    }
}
