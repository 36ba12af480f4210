use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Blood pressure endpoints
        crate::api::handlers::blood_pressure::create_record,
        crate::api::handlers::blood_pressure::list_records,
        crate::api::handlers::blood_pressure::get_record,
        crate::api::handlers::blood_pressure::update_record,
        crate::api::handlers::blood_pressure::delete_record,
        crate::api::handlers::blood_pressure::get_summary,

        // Auth endpoints
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::get_profile,
        crate::api::handlers::auth::update_settings,

        // User administration endpoints
        crate::api::handlers::users::list_users,
        crate::api::handlers::users::get_user,
        crate::api::handlers::users::delete_user,
        crate::api::handlers::users::get_system_stats
    ),
    components(
        schemas(
            // Common
            crate::entities::common::ErrorResponse,
            crate::entities::common::Pagination,
            crate::entities::health::HealthResponse,

            // Blood pressure
            crate::entities::blood_pressure::CreateRecordRequest,
            crate::entities::blood_pressure::UpdateRecordRequest,
            crate::entities::blood_pressure::ContextInput,
            crate::entities::blood_pressure::BeforeMeasureInput,
            crate::entities::blood_pressure::RecordResponse,
            crate::entities::blood_pressure::ContextResponse,
            crate::entities::blood_pressure::BeforeMeasureResponse,
            crate::entities::blood_pressure::ClassificationResponse,
            crate::entities::blood_pressure::RecordListResponse,
            crate::entities::blood_pressure::WindowStats,
            crate::entities::blood_pressure::SummaryResponse,
            crate::entities::blood_pressure::PressureAverages,
            crate::entities::blood_pressure::PressureRanges,
            crate::entities::blood_pressure::ValueSpan,
            crate::api::handlers::blood_pressure::DeletedRecordResponse,

            // Users and auth
            crate::entities::user::UserResponse,
            crate::entities::user::UserStatsResponse,
            crate::entities::user::UserListResponse,
            crate::entities::user::UserDeletedResponse,
            crate::entities::user::SystemStatsResponse,
            crate::entities::user::ActiveUserResponse,
            crate::entities::auth::LoginRequest,
            crate::entities::auth::LoginResponse,
            crate::entities::auth::SettingsRequest,

            // Domain types
            pressure_log_domain::entities::Activity,
            pressure_log_domain::entities::Emotion,
            pressure_log_domain::entities::TimeOfDay,
            pressure_log_domain::entities::Source,
            pressure_log_domain::entities::Device,
            pressure_log_domain::entities::UserSettings,
            pressure_log_domain::entities::NormalRange,
            pressure_log_domain::entities::ValueRange,
            pressure_log_domain::entities::Reminders,
            pressure_log_domain::entities::DataSharing,
            pressure_log_domain::entities::UserStatus,
            pressure_log_domain::services::classification::ClassificationLevel
        )
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "blood-pressure", description = "Blood pressure records and statistics"),
        (name = "auth", description = "Login and account settings"),
        (name = "users", description = "User administration, admin role required")
    ),
    info(
        title = "PressureLog API",
        version = "0.1.0",
        description = "Blood pressure tracking with severity classification and statistics",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "PressureLog API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "blood-pressure"));
        assert!(tags.iter().any(|tag| tag.name == "users"));

        for path in [
            "/health",
            "/api/v1/blood-pressure",
            "/api/v1/blood-pressure/{id}",
            "/api/v1/blood-pressure/stats/summary",
            "/api/v1/auth/login",
            "/api/v1/auth/profile",
            "/api/v1/auth/settings",
            "/api/v1/users",
            "/api/v1/users/{id}",
            "/api/v1/users/stats/system",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }
    }

    #[test]
    fn test_schemas_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.unwrap();

        assert!(components.schemas.contains_key("RecordResponse"));
        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.schemas.contains_key("ClassificationLevel"));
    }
}
