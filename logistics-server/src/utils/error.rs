//! Unified Error Handling
//!
//! Application error enum and the response envelopes shared by every
//! endpoint:
//!
//! - success: `{ "success": true, "message", "data", "pagination"? }`
//! - error:   `{ "success": false, "message", "error": { "statusCode", "message", "details"? } }`
//!
//! Database/internal failures are logged with full detail server-side and
//! normalized to a generic message in the response body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::models::Pagination;
use tracing::error;

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication Errors ==========
    #[error("{0}")]
    Unauthorized(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    // ========== Business Logic Errors ==========
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String, Option<serde_json::Value>),

    #[error("{0}")]
    BusinessLogic(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized access".to_string())
    }

    pub fn unauthorized_msg(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into(), None)
    }

    pub fn validation_with_details(msg: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Validation(msg.into(), Some(details))
    }

    pub fn business(msg: impl Into<String>) -> Self {
        Self::BusinessLogic(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Unified message for login failures to prevent email enumeration
    pub fn invalid_credentials() -> Self {
        Self::Unauthorized("Invalid credentials".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::TokenExpired | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(..) | AppError::BusinessLogic(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope body
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Never leak internal detail to clients
        let (message, details) = match &self {
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                ("Database error".to_string(), None)
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                ("Internal server error".to_string(), None)
            }
            AppError::Validation(msg, details) => (msg.clone(), details.clone()),
            other => (other.to_string(), None),
        };

        let body = Json(ErrorBody {
            success: false,
            message: message.clone(),
            error: ErrorDetail {
                status_code: status.as_u16(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

/// Result alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;

/// API success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    ok_with_message(data, "Success")
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        pagination: None,
    })
}

/// Create a 201 Created response
pub fn created<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with_message(data, message))
}

/// Create a paginated list response
pub fn paginated<T: Serialize>(
    data: T,
    pagination: Pagination,
    message: impl Into<String>,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        pagination: Some(pagination),
    })
}
