use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: String,

    /// Time of the check, RFC 3339
    pub timestamp: String,

    /// `connected`, `disconnected` or `memory`
    pub database: String,

    /// `development` or `production`
    pub mode: String,

    /// Version of the service
    pub version: String,

    /// Seconds since the server started
    pub uptime: u64,
}
