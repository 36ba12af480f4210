use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Suffix appended to the message of every mock payload
pub const MOCK_MESSAGE_SUFFIX: &str = " (development mode)";

/// Success envelope wrapping every response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Always `true` for this envelope
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Set when the payload is generated rather than read from storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock: Option<bool>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            mock: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Envelope for a development fallback payload
    pub fn mock(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(format!("{}{}", message, MOCK_MESSAGE_SUFFIX)),
            mock: Some(true),
        }
    }
}

/// Error envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Human readable error message
    pub error: String,

    /// Machine readable error code, e.g. `VALIDATION_ERROR`
    pub code: String,

    /// Validation messages, or the underlying error outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,

    /// Requested path, for unknown endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Pagination block of list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page, 1-based
    pub current: u32,
    pub page_size: u32,
    /// Total number of matching items
    pub total: usize,
    /// `ceil(total / pageSize)`
    pub total_pages: usize,
}
