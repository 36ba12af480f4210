use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use tracing::{debug, instrument, warn};

use pressure_log_domain::health::{DatabaseStatus, SystemStatus};

use crate::entities::common::ErrorResponse;
use crate::entities::health::HealthResponse;
use crate::state::AppState;

// Track the time when the server started
static SERVER_START_TIME: OnceCell<u64> = OnceCell::new();
static INIT: Once = Once::new();

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Record the server start time; later calls are ignored
pub fn initialize_server_start_time() {
    INIT.call_once(|| {
        let _ = SERVER_START_TIME.set(unix_seconds());
    });
}

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .get()
        .map(|start| unix_seconds().saturating_sub(*start))
        .unwrap_or(0)
}

fn database_label(status: DatabaseStatus) -> &'static str {
    match status {
        DatabaseStatus::Connected => "connected",
        DatabaseStatus::Disconnected => "disconnected",
        DatabaseStatus::Memory => "memory",
    }
}

/// Health check endpoint, no authentication required
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "health"
)]
#[instrument(skip_all)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health.get_system_health().await;

    let status = match health.status {
        SystemStatus::Healthy => "ok",
        SystemStatus::Degraded => {
            warn!("Health check degraded: {}", health.details.as_deref().unwrap_or("unknown cause"));
            "degraded"
        }
    };
    debug!("Health check: {}", status);

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        database: database_label(health.database).to_string(),
        mode: state.config.environment.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: uptime_seconds(),
    })
}

/// Answer for any route that does not exist
pub async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            error: "Endpoint not found".to_string(),
            code: "ENDPOINT_NOT_FOUND".to_string(),
            details: None,
            path: Some(uri.path().to_string()),
        }),
    )
}
