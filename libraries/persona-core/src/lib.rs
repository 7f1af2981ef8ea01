//! Persona Core
//!
//! Backend-agnostic user entity, error taxonomy and repository contract.
//!
//! Every storage adapter in `persona-storage` produces and consumes these
//! types, and the transport layer reacts to [`UserError`] without knowing
//! which database is active.
//!
//! # Example
//!
//! ```rust
//! use persona_core::{UserError, UserId};
//!
//! let id = UserId::parse("42");
//! assert_eq!(id, UserId::Numeric(42));
//!
//! let err = UserError::UserNotFound(id);
//! assert!(err.is_domain());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{Result, UserError};
pub use storage::UserRepository;
pub use types::{CreateUser, PasswordUpdate, PasswordUpdated, User, UserId};
