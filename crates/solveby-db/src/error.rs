//! Database error types

use rust_decimal::Decimal;
use thiserror::Error;

/// Database operation errors
///
/// `NotFound`, `Duplicate`, `InvalidState` and `Forbidden` carry caller-facing messages;
/// the remaining variants are internal and never shown to API callers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    /// A row was not in the state the operation requires (checked under lock)
    #[error("{0}")]
    InvalidState(String),

    /// The caller lacks the role the operation requires (checked under lock)
    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Decimal, required: Decimal },
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Map a unique-constraint violation on `constraint` to `Duplicate(message)`
pub(crate) fn on_unique(constraint: &'static str, message: &'static str) -> impl Fn(sqlx::Error) -> DbError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.constraint() == Some(constraint) {
                return DbError::Duplicate(message.to_string());
            }
        }
        DbError::Query(e)
    }
}
