/// Storage-specific errors
use persona_core::UserError;
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// SQLSTATE codes that mark a serializable transaction as safe to retry.
///
/// `40001` is the standard serialization failure; `CR000` is the retry code
/// older CockroachDB releases reported.
pub const RETRYABLE_SQLSTATES: &[&str] = &["40001", "CR000"];

/// Storage error types
///
/// Adapters work with this type internally and convert to
/// [`UserError`] at the repository boundary, so no backend-native error
/// escapes the crate.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Domain error raised inside a unit of work, passed through untouched
    #[error(transparent)]
    User(#[from] UserError),

    /// Serialization conflict reported by the backend
    #[error("Retryable transaction conflict ({code}): {message}")]
    RetryableConflict { code: String, message: String },

    /// Every allowed attempt ended in a retryable conflict
    #[error("Hit max of {attempts} attempts, aborting: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        last: Box<StorageError>,
    },

    /// COMMIT failed with a non-retryable error; the transaction may or may
    /// not have been applied
    #[error("Ambiguous commit: {0}")]
    AmbiguousCommit(Box<StorageError>),

    /// Rolling back to restart after a conflict failed
    #[error("Restarting transaction failed. ROLLBACK encountered error: {rollback}. Original error: {conflict}")]
    RestartFailed {
        rollback: Box<StorageError>,
        conflict: Box<StorageError>,
    },

    /// Stored record does not have the expected shape
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Schema creation error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Database error from `SQLx`
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// MongoDB driver error
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Neo4j driver error
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    /// Neo4j row could not be decoded
    #[error("Neo4j decode error: {0}")]
    Neo4jDecode(#[from] neo4rs::DeError),
}

impl StorageError {
    /// Create an invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// True when the whole transaction may be retried from the start
    pub fn is_retryable_conflict(&self) -> bool {
        matches!(self, Self::RetryableConflict { .. })
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match retryable_code(&err) {
            Some(code) => Self::RetryableConflict {
                code,
                message: err.to_string(),
            },
            None => Self::Database(err),
        }
    }
}

/// Conflict classification looks at the SQLSTATE only, never at the message.
fn retryable_code(err: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let code = db_err.code()?;
    RETRYABLE_SQLSTATES
        .contains(&code.as_ref())
        .then(|| code.into_owned())
}

impl From<mongodb::bson::document::ValueAccessError> for StorageError {
    fn from(err: mongodb::bson::document::ValueAccessError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<StorageError> for UserError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::User(user_err) => user_err,
            other => UserError::OperationFailed(other.to_string()),
        }
    }
}

/// `sqlx::Error::Database` carrying an arbitrary SQLSTATE, for tests
#[cfg(test)]
pub(crate) fn sqlx_database_error(code: &'static str, message: &'static str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(fake_db::FakeDatabaseError { code, message }))
}
