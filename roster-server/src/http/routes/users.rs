//! User endpoints

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::CreateUserRequest;

/// Plain-text body returned on 201
pub const CREATED_BODY: &str = "user created";

/// POST /users - create a user
///
/// The body is read raw so JSON is parsed regardless of `Content-Type`,
/// and parse failures map to 400 instead of axum's 415/422 rejections.
async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    let user = CreateUserRequest::from_slice(&body)?.validate()?;

    // Dropping the insert future on expiry returns its connection to the pool.
    tokio::time::timeout(state.insert_timeout, state.store.insert(&user))
        .await
        .map_err(|_| ApiError::Timeout {
            after: state.insert_timeout,
        })??;

    tracing::debug!("Created user");
    Ok((StatusCode::CREATED, CREATED_BODY))
}

/// Any other method on /users
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed { allowed: "POST" }
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users", post(create_user).fallback(method_not_allowed))
}
