//! Degraded-mode results for the engine's external boundaries.
//!
//! Loading configuration and fetching issues are the only places the engine
//! depends on collaborators that can fail. Instead of hard errors, those
//! paths return a [`DegradedResponse`] carrying either the real payload or a
//! fallback, tagged with how much of it can be trusted.
//!
//! ```text
//! load / fetch
//!   ├─ succeeds → DegradedResponse { level: Full, payload }
//!   └─ fails    → DegradedResponse { level: Unavailable, payload: fallback, warnings }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much of the requested data is genuine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradationLevel {
    /// The collaborator delivered.
    Full,
    /// Collaborator failed; payload is the caller-provided fallback.
    Unavailable,
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A payload wrapped with degradation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedResponse<T> {
    pub payload: T,
    pub level: DegradationLevel,
    /// Which collaborator (file path, source name) produced the payload
    pub served_by: String,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> DegradedResponse<T> {
    pub fn full(payload: T, served_by: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Full,
            served_by: served_by.to_string(),
            warnings: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn unavailable(payload: T, warning: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Unavailable,
            served_by: "fallback".to_string(),
            warnings: vec![warning.to_string()],
            timestamp: Utc::now(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.level == DegradationLevel::Full
    }

    pub fn is_degraded(&self) -> bool {
        self.level != DegradationLevel::Full
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}
