use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use pressure_log_domain::auth::{auth_middleware, require_admin};

use crate::api::handlers::{self, health};
use crate::openapi::configure_swagger_routes;
use crate::state::AppState;

/// Create the application router over the given state
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    // Specific routes before parametrized ones
    let record_routes = Router::new()
        .route("/blood-pressure/stats/summary", get(handlers::get_summary))
        .route(
            "/blood-pressure",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/blood-pressure/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        );

    let account_routes = Router::new()
        .route("/auth/profile", get(handlers::get_profile))
        .route("/auth/settings", put(handlers::update_settings));

    // Role check runs after authentication, which is layered outside
    let admin_routes = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/stats/system", get(handlers::get_system_stats))
        .route("/users/:id", get(handlers::get_user).delete(handlers::delete_user))
        .layer(middleware::from_fn(require_admin));

    let protected_routes = record_routes
        .merge(account_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.tokens.clone(), auth_middleware));

    debug!("Protected routes configured");

    let public_routes = Router::new().route("/auth/login", post(handlers::login));

    let api_routes = public_routes.merge(protected_routes);

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .nest(&state.config.api_prefix, api_routes)
        .fallback(handlers::not_found)
        .with_state(state);

    debug!("API routes nested");

    health::initialize_server_start_time();

    add_swagger_ui(app)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Add Swagger UI to the router
pub fn add_swagger_ui(app: Router) -> Router {
    app.merge(configure_swagger_routes())
}
