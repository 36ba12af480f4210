//! Mapping of service failures onto the error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use pressure_log_domain::services::ServiceError;

use crate::entities::common::ErrorResponse;

/// Resource an operation works on, which decides the not-found code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Record,
    User,
}

impl Resource {
    fn not_found(&self) -> (&'static str, &'static str) {
        match self {
            Resource::Record => ("BP_RECORD_NOT_FOUND", "Blood pressure record not found"),
            Resource::User => ("USER_NOT_FOUND", "User not found"),
        }
    }
}

/// Failure code and message reported when an operation's storage fails
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub resource: Resource,
    pub code: &'static str,
    pub message: &'static str,
}

pub const CREATE_RECORD: Operation = Operation {
    resource: Resource::Record,
    code: "CREATE_BP_RECORD_ERROR",
    message: "Failed to create blood pressure record",
};

pub const LIST_RECORDS: Operation = Operation {
    resource: Resource::Record,
    code: "GET_BP_RECORDS_ERROR",
    message: "Failed to get blood pressure records",
};

pub const GET_RECORD: Operation = Operation {
    resource: Resource::Record,
    code: "GET_BP_RECORD_ERROR",
    message: "Failed to get blood pressure record",
};

pub const UPDATE_RECORD: Operation = Operation {
    resource: Resource::Record,
    code: "UPDATE_BP_RECORD_ERROR",
    message: "Failed to update blood pressure record",
};

pub const DELETE_RECORD: Operation = Operation {
    resource: Resource::Record,
    code: "DELETE_BP_RECORD_ERROR",
    message: "Failed to delete blood pressure record",
};

pub const RECORD_SUMMARY: Operation = Operation {
    resource: Resource::Record,
    code: "GET_BP_STATS_ERROR",
    message: "Failed to get blood pressure statistics",
};

pub const LOGIN: Operation = Operation {
    resource: Resource::User,
    code: "LOGIN_ERROR",
    message: "Login failed",
};

pub const GET_PROFILE: Operation = Operation {
    resource: Resource::User,
    code: "GET_PROFILE_ERROR",
    message: "Failed to get user profile",
};

pub const UPDATE_SETTINGS: Operation = Operation {
    resource: Resource::User,
    code: "UPDATE_SETTINGS_ERROR",
    message: "Failed to update settings",
};

pub const LIST_USERS: Operation = Operation {
    resource: Resource::User,
    code: "GET_USERS_ERROR",
    message: "Failed to get users",
};

pub const GET_USER: Operation = Operation {
    resource: Resource::User,
    code: "GET_USER_ERROR",
    message: "Failed to get user",
};

pub const DELETE_USER: Operation = Operation {
    resource: Resource::User,
    code: "DELETE_USER_ERROR",
    message: "Failed to delete user",
};

pub const SYSTEM_STATS: Operation = Operation {
    resource: Resource::User,
    code: "GET_SYSTEM_STATS_ERROR",
    message: "Failed to get system statistics",
};

/// An error answered with the error envelope
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Malformed query string or body
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Input failed validation
    pub fn validation(errors: Vec<String>) -> Self {
        Self {
            details: Some(errors),
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Validation failed")
        }
    }

    /// Systolic or diastolic value absent
    pub fn missing_values() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "MISSING_BP_DATA",
            "Systolic and diastolic values are required",
        )
    }

    /// Map a service failure for `operation`.
    ///
    /// Storage failures become a 500 with the operation's code; the
    /// underlying error text is attached only when `expose_details` is set.
    pub fn from_service(err: ServiceError, operation: &Operation, expose_details: bool) -> Self {
        match err {
            ServiceError::Validation(errors) => Self::validation(errors),
            ServiceError::NotFound(_) => {
                let (code, message) = operation.resource.not_found();
                Self::new(StatusCode::NOT_FOUND, code, message)
            }
            ServiceError::Forbidden => Self::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You don't have the required permissions to access this resource",
            ),
            ServiceError::UnknownUser(_) => Self::new(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "The account for this token no longer exists",
            ),
            ServiceError::Unavailable(cause) | ServiceError::Storage(cause) => {
                error!("{}: {}", operation.message, cause);
                Self {
                    details: expose_details.then(|| vec![cause]),
                    ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, operation.code, operation.message)
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code.to_string(),
            details: self.details,
            path: None,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_carries_details() {
        let err = ApiError::from_service(
            ServiceError::Validation(vec!["Systolic must exceed diastolic".to_string()]),
            &CREATE_RECORD,
            false,
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert_eq!(err.details, Some(vec!["Systolic must exceed diastolic".to_string()]));
    }

    #[test]
    fn test_not_found_code_follows_resource() {
        let record = ApiError::from_service(ServiceError::NotFound("r1".to_string()), &GET_RECORD, true);
        assert_eq!(record.code, "BP_RECORD_NOT_FOUND");

        let user = ApiError::from_service(ServiceError::NotFound("u1".to_string()), &GET_USER, true);
        assert_eq!(user.status, StatusCode::NOT_FOUND);
        assert_eq!(user.code, "USER_NOT_FOUND");
    }

    #[test]
    fn test_storage_details_hidden_in_production() {
        let shown = ApiError::from_service(ServiceError::Storage("disk full".to_string()), &LIST_RECORDS, true);
        assert_eq!(shown.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(shown.code, "GET_BP_RECORDS_ERROR");
        assert_eq!(shown.details, Some(vec!["disk full".to_string()]));

        let hidden = ApiError::from_service(ServiceError::Storage("disk full".to_string()), &LIST_RECORDS, false);
        assert_eq!(hidden.details, None);
        assert_eq!(hidden.message, "Failed to get blood pressure records");

        let unreachable =
            ApiError::from_service(ServiceError::Unavailable("pool timed out".to_string()), &GET_RECORD, false);
        assert_eq!(unreachable.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unreachable.code, "GET_BP_RECORD_ERROR");
    }

    #[test]
    fn test_unknown_user_is_unauthorized() {
        let err = ApiError::from_service(ServiceError::UnknownUser("u1".to_string()), &CREATE_RECORD, true);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "UNAUTHORIZED");
    }
}
