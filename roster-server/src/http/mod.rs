//! HTTP server layer
//!
//! Axum server with:
//! - `POST /users` and `GET /health`
//! - Request tracing and an overall request timeout
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState};
