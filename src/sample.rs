use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded invocation, as read from a performance log.
/// Immutable once a parser has built it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// When the invocation started. Formats without a timestamp use the epoch.
    pub timestamp: DateTime<Utc>,
    /// Elapsed wall time in milliseconds
    pub duration_ms: u64,
    /// false when the tool flagged the invocation as failed
    pub success: bool,
    /// Raw endpoint label, e.g. "http://host/login" or a test-case name
    pub endpoint: String,
}

impl Sample {
    pub fn new(
        endpoint: impl Into<String>,
        duration_ms: u64,
        success: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            duration_ms,
            success,
            endpoint: endpoint.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }
}
