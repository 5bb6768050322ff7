//! Health report returned by `GET /health`

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Error,
}

/// Connectivity probe outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl HealthReport {
    /// Database reachable; `timestamp` is the database's `NOW()`.
    pub fn healthy(timestamp: String, tables: Vec<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            timestamp,
            tables: Some(tables),
        }
    }

    /// Probe failed; stamped with the local clock since the database's is unavailable.
    pub fn error(at: DateTime<Utc>) -> Self {
        Self {
            status: HealthStatus::Error,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            tables: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
