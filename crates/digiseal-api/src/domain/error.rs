//! API error types.
//!
//! Every failure leaves the server as `{ "success": false, "error": "..." }`
//! with a conventional HTTP status.

use super::config::ConfigError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use digiseal_types::TypeError;
use product_contract::ContractError;
use serde::Serialize;
use std::fmt;

/// HTTP-facing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 400 naming every absent or blank field.
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::bad_request(format!("Missing required fields: {}", fields.join(", ")))
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 504
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }

    /// Contract failure on a lookup: a revert means the product is unknown.
    pub fn lookup_failed(action: &str, err: ContractError) -> Self {
        if err.is_revert() {
            tracing::warn!(error = %err, "{} reverted", action);
            Self::not_found("Product not found")
        } else {
            Self::contract_failed(action, err)
        }
    }

    /// Any other contract failure.
    pub fn contract_failed(action: &str, err: ContractError) -> Self {
        tracing::error!(error = %err, "{} failed", action);
        Self::internal(format!("Failed to {}: {}", action, err))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<TypeError> for ApiError {
    fn from(e: TypeError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level errors (startup and serving, not per request)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("contract binding error: {0}")]
    Contract(#[from] ContractError),
}
