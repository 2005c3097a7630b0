//! Auth backend database bootstrap
//!
//! Provides the lazily established, migrate-once connection pool used by the
//! auth backend.

pub mod database;
pub mod error;
pub mod service;

pub use database::AuthDatabase;
pub use error::{DatabaseError, DbResult};
pub use service::{DatabasePool, DatabaseService, SqliteDatabaseService};
