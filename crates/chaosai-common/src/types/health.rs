//! Health check samples

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One health check poll of one application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    /// Application name
    pub name: String,
    /// When the poll was issued
    pub timestamp: DateTime<Utc>,
    /// Seconds until the response arrived, -1 when no response
    pub response_time: f64,
    /// Actual status code, -1 when no response
    pub status_code: i32,
    /// Status code matched the expected one
    pub success: bool,
    /// Transport error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
