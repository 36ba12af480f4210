use axum::{
    extract::{rejection::JsonRejection, Extension, Json, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use pressure_log_domain::auth::{generate_token, roles_for, AuthenticatedUser};
use pressure_log_domain::mock;
use pressure_log_domain::services::{LoginInput, LoginOutcome};

use crate::api::error::{ApiError, GET_PROFILE, LOGIN, UPDATE_SETTINGS};
use crate::api::handlers::serve;
use crate::entities::auth::{LoginRequest, LoginResponse, SettingsRequest};
use crate::entities::common::{ApiResponse, ErrorResponse};
use crate::entities::user::UserResponse;
use crate::state::AppState;

/// Log in with an external identity, creating the user on first login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token and user", body = LoginResponse),
        (status = 400, description = "Missing identity or invalid profile", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let Some(open_id) = request.open_id.filter(|id| !id.trim().is_empty()) else {
        warn!("Login without an open_id");
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "MISSING_OPEN_ID", "open_id is required"));
    };
    info!("Login attempt");

    let input = LoginInput {
        open_id: open_id.clone(),
        nickname: request.nickname,
        avatar: request.avatar,
    };

    let now = Utc::now();
    let result = state.users.login(input).await;
    let served = serve(&state, result, &LOGIN, || {
        let mut user = mock::mock_user("mock_user_1", now);
        user.open_id = open_id.clone();
        LoginOutcome {
            user,
            is_new_user: false,
        }
    })?;

    let roles = roles_for(&open_id, &state.config.admin_open_ids);
    let token = generate_token(&state.tokens, &served.data.user.id, roles).map_err(|e| {
        error!("Failed to issue access token: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "TOKEN_ERROR", "Failed to issue access token")
    })?;
    let expires_in = state.tokens.expiration_minutes * 60;

    Ok(Json(
        served
            .map(|outcome| LoginResponse {
                token,
                token_type: "Bearer".to_string(),
                expires_in,
                user: UserResponse::new(outcome.user, now),
                is_new_user: outcome.is_new_user,
            })
            .envelope("Login successful"),
    ))
}

/// The authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "The current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let now = Utc::now();
    let result = state.users.get(&user.user_id).await;
    let served = serve(&state, result, &GET_PROFILE, || mock::mock_user(&user.user_id, now))?;

    Ok(Json(served.map(|u| UserResponse::new(u, now)).envelope("Profile retrieved")))
}

/// Replace the authenticated user's settings
#[utoipa::path(
    put,
    path = "/api/v1/auth/settings",
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Invalid settings", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<SettingsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!("Updating settings");

    let now = Utc::now();
    let settings = request.settings;
    let result = state.users.update_settings(&user.user_id, settings.clone()).await;
    let served = serve(&state, result, &UPDATE_SETTINGS, || {
        let mut mocked = mock::mock_user(&user.user_id, now);
        mocked.settings = settings;
        mocked
    })?;

    Ok(Json(served.map(|u| UserResponse::new(u, now)).envelope("Settings updated")))
}
