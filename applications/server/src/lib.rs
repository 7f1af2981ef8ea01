//! Persona Server Library
//!
//! HTTP front end for the user repository, backed by whichever storage engine
//! the configuration selects.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod state;

// Re-export commonly used types for convenience
pub use backend::Backend;
pub use config::{BackendKind, ServerConfig};
pub use error::{Result, ServerError};
pub use state::AppState;
