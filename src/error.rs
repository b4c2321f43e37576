//! Error types for tickwork.

use thiserror::Error;

/// SQLSTATE raised by Postgres for writes inside a `READ ONLY` transaction.
const READ_ONLY_SQL_TRANSACTION: &str = "25006";
/// SQLSTATE raised by Postgres when the role lacks a grant.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, Error)]
pub enum Error {
    /// Competition control or a referenced service does not exist yet.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Configuration exists but cannot be used as-is.
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// A mutation was attempted under read-only access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Another writer moved the current tick between read and advance.
    #[error("tick conflict: expected current tick {expected}, found {found:?}")]
    TickConflict { expected: i64, found: Option<i64> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        match code.as_deref() {
            Some(READ_ONLY_SQL_TRANSACTION) | Some(INSUFFICIENT_PRIVILEGE) => {
                Error::PermissionDenied(e.to_string())
            }
            _ => Error::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
