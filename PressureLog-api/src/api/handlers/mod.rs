pub mod auth;
pub mod blood_pressure;
pub mod health;
pub mod users;

use tracing::warn;

use pressure_log_domain::services::ServiceError;

use crate::api::error::{ApiError, Operation};
use crate::entities::common::ApiResponse;
use crate::state::AppState;

// Re-export handlers for easier imports
pub use auth::{get_profile, login, update_settings};
pub use blood_pressure::{create_record, delete_record, get_record, get_summary, list_records, update_record};
pub use health::{health_check, not_found};
pub use users::{delete_user, get_system_stats, get_user, list_users};

/// Payload produced by a handler, either from storage or from the development fallback
pub(crate) struct Served<T> {
    pub data: T,
    pub mock: bool,
}

impl<T> Served<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served {
            data: f(self.data),
            mock: self.mock,
        }
    }

    /// Wrap the payload in the success envelope
    pub fn envelope(self, message: &str) -> ApiResponse<T> {
        if self.mock {
            ApiResponse::mock(self.data, message)
        } else {
            ApiResponse::with_message(self.data, message)
        }
    }
}

/// Resolve a service result.
///
/// An unreachable store is answered with `mock()` when the development
/// fallback is enabled; every other failure is mapped for `operation`.
pub(crate) fn serve<T>(
    state: &AppState,
    result: Result<T, ServiceError>,
    operation: &Operation,
    mock: impl FnOnce() -> T,
) -> Result<Served<T>, ApiError> {
    match result {
        Ok(data) => Ok(Served { data, mock: false }),
        Err(ServiceError::Unavailable(cause)) if state.config.mock_fallback_enabled() => {
            warn!("{}, serving mock data: {}", operation.message, cause);
            Ok(Served {
                data: mock(),
                mock: true,
            })
        }
        Err(err) => Err(ApiError::from_service(err, operation, state.config.expose_error_details())),
    }
}
