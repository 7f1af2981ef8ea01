/// Core error types for Persona
use crate::types::UserId;
use thiserror::Error;

/// Result type alias using `UserError`
pub type Result<T> = std::result::Result<T, UserError>;

/// Errors every repository variant reports
///
/// The two domain kinds are stable across backends so the transport layer
/// can map them without knowing which storage engine is active. Anything
/// else a backend raises is flattened into [`UserError::OperationFailed`].
#[derive(Error, Debug)]
pub enum UserError {
    /// No record for this identifier
    #[error("User with id {0} not found")]
    UserNotFound(UserId),

    /// Supplied current password differs from the stored one
    #[error("Password didn't match. (userId: {0})")]
    PasswordMismatch(UserId),

    /// Opaque backend failure (connectivity, query, exhausted retries)
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl UserError {
    /// Create an opaque failure
    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    /// True for `UserNotFound` and `PasswordMismatch`
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::PasswordMismatch(_))
    }
}
