//! Database service abstraction
//!
//! The host hands the auth backend a [`DatabaseService`]: something that can
//! open a client pool and says whether schema migrations are managed
//! elsewhere. [`SqliteDatabaseService`] is the SQLite implementation used by
//! the CLI and the tests.

use crate::error::DbResult;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Open a new client pool
    async fn get_client(&self) -> DbResult<DatabasePool>;

    /// Whether migrations are run by someone else
    fn skip_migrations(&self) -> bool {
        false
    }
}

/// Connection settings for a SQLite-backed database service
#[derive(Debug, Clone)]
pub struct SqliteDatabaseService {
    url: String,
    max_connections: u32,
    skip_migrations: bool,
}

impl SqliteDatabaseService {
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite:auth.db" or "sqlite::memory:")
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            url: database_url.into(),
            max_connections: 5,
            skip_migrations: false,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_skip_migrations(mut self, skip: bool) -> Self {
        self.skip_migrations = skip;
        self
    }
}

#[async_trait]
impl DatabaseService for SqliteDatabaseService {
    async fn get_client(&self) -> DbResult<DatabasePool> {
        let options = SqliteConnectOptions::from_str(&self.url)?.create_if_missing(true);

        // A `:memory:` database lives and dies with its single connection.
        let pool = if self.url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(self.max_connections)
                .connect_with(options)
                .await?
        };

        tracing::info!("Connected to auth database: {}", self.url);
        Ok(pool)
    }

    fn skip_migrations(&self) -> bool {
        self.skip_migrations
    }
}
