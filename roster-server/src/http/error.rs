//! API error types with IntoResponse
//!
//! Client errors carry a readable reason. Server errors are logged with
//! full detail and reach the caller as a generic message.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DbError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or missing field (400)
    Validation(ValidationError),

    /// Wrong method for the route (405)
    MethodNotAllowed { allowed: &'static str },

    /// Store call failed (500, logged)
    Database(DbError),

    /// Store call exceeded its bound (500, logged)
    Timeout { after: Duration },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let internal = || {
            json!({
                "error": "internal_error",
                "message": "an internal error occurred"
            })
        };

        match self {
            Self::Validation(e) => {
                let code = match e {
                    ValidationError::Malformed { .. } => "invalid_json",
                    _ => "validation_error",
                };
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": code, "message": e.to_string() })),
                )
                    .into_response()
            }
            Self::MethodNotAllowed { allowed } => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, allowed)],
                Json(json!({
                    "error": "method_not_allowed",
                    "message": format!("method not allowed, use {}", allowed)
                })),
            )
                .into_response(),
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(internal())).into_response()
            }
            Self::Timeout { after } => {
                tracing::error!("Database operation timed out after {:?}", after);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(internal())).into_response()
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Database(e)
    }
}
