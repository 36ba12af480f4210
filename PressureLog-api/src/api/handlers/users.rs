use axum::extract::{rejection::QueryRejection, Json, Path, Query, State};
use chrono::Utc;
use tracing::{info, instrument};

use pressure_log_domain::mock;
use pressure_log_domain::services::blood_pressure::DEFAULT_PAGE_SIZE;

use crate::api::error::{ApiError, DELETE_USER, GET_USER, LIST_USERS, SYSTEM_STATS};
use crate::api::handlers::serve;
use crate::entities::common::{ApiResponse, ErrorResponse};
use crate::entities::user::{
    ListUsersParams, SystemStatsResponse, UserDeletedResponse, UserListResponse, UserResponse,
};
use crate::state::AppState;

/// List users, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<UserListResponse>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    info!("Listing users: page {} limit {}", page, limit);

    let now = Utc::now();
    let result = state.users.list(page, limit).await;
    let served = serve(&state, result, &LIST_USERS, || mock::mock_users(page, limit, now))?;

    Ok(Json(served.map(|p| UserListResponse::new(p, now)).envelope("Users retrieved")))
}

/// Get a user (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(target_user = %id))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    info!("Getting user");

    let now = Utc::now();
    let result = state.users.get(&id).await;
    let served = serve(&state, result, &GET_USER, || mock::mock_user(&id, now))?;

    Ok(Json(served.map(|u| UserResponse::new(u, now)).envelope("User retrieved")))
}

/// Delete a user and every record they own (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and records deleted", body = UserDeletedResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(target_user = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDeletedResponse>>, ApiError> {
    info!("Deleting user");

    let result = state.users.delete(&id).await;
    let served = serve(&state, result, &DELETE_USER, || 0)?;

    Ok(Json(
        served
            .map(|deleted_records| UserDeletedResponse { id, deleted_records })
            .envelope("User deleted"),
    ))
}

/// System-wide usage figures (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users/stats/system",
    responses(
        (status = 200, description = "Usage figures", body = SystemStatsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn get_system_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SystemStatsResponse>>, ApiError> {
    info!("Computing system statistics");

    let now = Utc::now();
    let result = state.users.system_stats(now).await;
    let served = serve(&state, result, &SYSTEM_STATS, || mock::mock_system_stats(now))?;

    Ok(Json(served.map(SystemStatsResponse::from).envelope("System statistics retrieved")))
}
