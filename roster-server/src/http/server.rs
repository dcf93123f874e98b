//! Axum server setup
//!
//! The router holds an explicitly constructed `AppState`; the listener is
//! bound by the caller so bind failures surface as startup errors.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::UserStore;
use crate::error::StartupError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    /// Bound on a single store call, independent of the request timeout
    pub insert_timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, insert_timeout: Duration) -> Self {
        Self {
            store,
            insert_timeout,
        }
    }
}

/// Build the application router. A request outliving `request_timeout`
/// gets a 500 with an empty body.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(routes::users::router())
        .merge(routes::health::router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve on an already bound listener until shutdown.
///
/// # Example
///
/// ```ignore
/// let listener = TcpListener::bind(addr).await?;
/// run_server(listener, state, Duration::from_secs(30)).await?;
/// ```
pub async fn run_server(
    listener: TcpListener,
    state: AppState,
    request_timeout: Duration,
) -> Result<(), StartupError> {
    let app = build_router(state, request_timeout);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Server listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
