//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nearlink_core::NearlinkError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 424 Failed Dependency - A required upstream service is not configured.
    FailedDependency {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 502 Bad Gateway - The sync service answered badly.
    BadGateway {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - A dependency could not be reached.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "invalid_strategy",
    "message": "Invalid strategy: 'P2P_RING'. Expected P2P_POINT_TO_POINT, P2P_STAR or P2P_CLUSTER.",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "invalid_medium").
    #[schema(example = "invalid_medium")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// A 400 response with the given code and message.
    pub fn bad_request(error_code: &str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            error_code: error_code.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::FailedDependency { .. } => StatusCode::FAILED_DEPENDENCY,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            Self::BadRequest {
                error_code,
                message,
            }
            | Self::NotFound {
                error_code,
                message,
            }
            | Self::FailedDependency {
                error_code,
                message,
            }
            | Self::BadGateway {
                error_code,
                message,
            }
            | Self::ServiceUnavailable {
                error_code,
                message,
            } => (error_code, message),

            Self::InternalError {
                error_code,
                message,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    "Internal server error"
                );
                (error_code, message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_code,
                message,
                details: None,
            }),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::FailedDependency { message, .. } => write!(f, "Failed Dependency: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::BadGateway { message, .. } => write!(f, "Bad Gateway: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from nearlink_core errors.
impl From<NearlinkError> for ApiError {
    fn from(err: NearlinkError) -> Self {
        let error_code = err.error_code().to_ascii_lowercase();
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::BadRequest {
                error_code,
                message,
            },
            404 => Self::NotFound {
                error_code,
                message,
            },
            502 => Self::BadGateway {
                error_code,
                message,
            },
            503 => Self::ServiceUnavailable {
                error_code,
                message,
            },
            // Configuration problems surface as server faults to API clients.
            _ => Self::InternalError {
                error_code,
                message,
            },
        }
    }
}

macro_rules! via_nearlink_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    Self::from(NearlinkError::from(err))
                }
            }
        )*
    };
}

via_nearlink_error!(
    nearlink_core::ConfigError,
    nearlink_core::CredentialStoreError,
    nearlink_core::IdentityError,
    nearlink_core::InvalidMacAddress,
    nearlink_core::InvalidStrategy,
    nearlink_core::ParseMediumError,
    nearlink_core::SyncError,
);
