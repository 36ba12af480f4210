use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use super::token::{validate_token, SecurityError, TokenConfig};
use super::{AuthenticatedUser, ROLE_ADMIN};

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": message,
            "code": "UNAUTHORIZED"
        })),
    )
        .into_response()
}

/// Authentication middleware for protected routes.
///
/// Expects `Authorization: Bearer <token>`. On success the request carries an
/// [`AuthenticatedUser`] extension; otherwise the request is answered with 401.
pub async fn auth_middleware(
    State(config): State<Arc<TokenConfig>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(auth_str) => auth_str,
            Err(_) => {
                warn!("Invalid Authorization header format on {}", request_path);
                return unauthorized("Invalid authorization header");
            }
        },
        None => {
            debug!("Missing Authorization header on {}", request_path);
            return unauthorized("Authentication required");
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        warn!("Authorization header does not contain Bearer token");
        return unauthorized("Authentication required");
    };

    match validate_token(&config, token.trim()) {
        Ok(claims) => {
            debug!("Token validated for user {} on {}", claims.sub, request_path);
            req.extensions_mut().insert(AuthenticatedUser::from(claims));
            next.run(req).await
        }
        Err(SecurityError::TokenExpired) => {
            warn!("Expired token on {}", request_path);
            unauthorized("Token has expired")
        }
        Err(e) => {
            warn!("Token validation failed on {}: {}", request_path, e);
            unauthorized("Invalid token")
        }
    }
}

/// Role check for administrator routes; must run after [`auth_middleware`]
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();

    match req.extensions().get::<AuthenticatedUser>() {
        Some(user) if user.has_role(ROLE_ADMIN) => {
            debug!("User {} authorized for {}", user.user_id, request_path);
            next.run(req).await
        }
        Some(user) => {
            warn!("User {} lacks the admin role for {}", user.user_id, request_path);
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "error": "You don't have the required permissions to access this resource",
                    "code": "FORBIDDEN"
                })),
            )
                .into_response()
        }
        None => {
            // auth_middleware did not run for this route
            warn!("No authenticated user found for path: {}", request_path);
            unauthorized("Authentication required")
        }
    }
}
