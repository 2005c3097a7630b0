//! Failures of the auth database bootstrap.
//!
//! Connection and migration problems are kept apart so callers can tell a
//! database that never came up from one whose schema could not be applied.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached or the URL is unusable.
    #[error("Unable to connect to auth database: {0}")]
    Connect(String),

    #[error("Auth database migration failed: {0}")]
    Migrate(String),

    #[error("Auth database query failed: {0}")]
    Query(String),

    /// No connection became available, or the pool was shut down.
    #[error("Auth database pool unavailable: {0}")]
    PoolUnavailable(String),
}

impl DatabaseError {
    pub fn is_migration_error(&self) -> bool {
        matches!(self, DatabaseError::Migrate(_))
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, DatabaseError::Connect(_))
    }
}

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_) | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::Connect(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::PoolUnavailable(err.to_string())
            }
            sqlx::Error::Migrate(inner) => DatabaseError::from(*inner),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migrate(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_pool_is_unavailable() {
        let err: DatabaseError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DatabaseError::PoolUnavailable(_)));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::Query(_)));
    }

    #[test]
    fn test_io_failure_is_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: DatabaseError = sqlx::Error::Io(io).into();
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_migration_error_display() {
        let err = DatabaseError::Migrate("checksum mismatch".to_string());
        assert!(err.is_migration_error());
        assert_eq!(
            err.to_string(),
            "Auth database migration failed: checksum mismatch"
        );
    }
}
