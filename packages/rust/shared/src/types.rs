//! Core domain types shared across trackfill crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one processing run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one tracking lookup.
///
/// Transport failures, timeouts and unrecognised response bodies all map to
/// [`Outcome::NotFound`]; a lookup never fails the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Found {
        status_text: String,
        status_timestamp: String,
    },
    NotFound,
}

impl Outcome {
    /// Build an outcome from trimmed values; both empty means nothing was reported.
    pub fn from_parts(status_text: &str, status_timestamp: &str) -> Self {
        let status_text = status_text.trim();
        let status_timestamp = status_timestamp.trim();
        if status_text.is_empty() && status_timestamp.is_empty() {
            return Self::NotFound;
        }
        Self::Found {
            status_text: status_text.to_string(),
            status_timestamp: status_timestamp.to_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}
