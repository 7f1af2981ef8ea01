/// ID types for Persona entities
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier in canonical form
///
/// Every backend hands out its own key shape: relational surrogate keys and
/// graph node ids are integers, document stores use opaque strings. The
/// canonical form keeps that distinction so a numeric id serializes as a JSON
/// number and an opaque id as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Integer key (SQL surrogate key, graph node id)
    Numeric(i64),
    /// Opaque key (document id)
    Opaque(String),
}

impl UserId {
    /// Canonicalize a raw identifier, e.g. a URL path segment
    ///
    /// Integer text becomes [`UserId::Numeric`], anything else is kept as
    /// [`UserId::Opaque`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => Self::Numeric(value),
            Err(_) => Self::Opaque(trimmed.to_string()),
        }
    }

    /// Integer form of this id, if it has one
    ///
    /// Opaque ids made only of digits still convert, so a key that travelled
    /// through a string-typed channel is not lost.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Opaque(raw) => raw.parse().ok(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{}", value),
            Self::Opaque(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self::Opaque(value)
    }
}
