/// User domain type
use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as every backend returns it
///
/// `created_at == updated_at` right after creation; only a password update
/// moves `updated_at` forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend-assigned identifier, immutable after creation
    pub id: UserId,

    pub username: String,

    pub name: String,

    pub surname: String,

    /// Stored and compared as plaintext
    pub password: String,

    pub age: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    pub surname: String,
    pub age: i32,
    pub password: String,
}

/// Request to replace a user's password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordUpdate {
    pub id: UserId,
    /// Must equal the stored password
    pub password: String,
    pub new_password: String,
}

/// Result of a successful password update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordUpdated {
    pub id: UserId,
}
