//! HTTP API module.
//!
//! REST surface over the shared queue. Every route is under `/api/v1.0`.

mod error;
mod handlers;


use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use pqueue_core::TaskQueue;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

pub use error::ApiError;

/// Shared application state.
pub type AppState = Arc<dyn TaskQueue>;

pub const API_PREFIX: &str = "/api/v1.0";

/// Advertised by the fallback handler.
pub const ROUTES: &[&str] = &[
    "GET    /api/v1.0/queue/list",
    "GET    /api/v1.0/queue/detail",
    "GET    /api/v1.0/queue/service",
    "POST   /api/v1.0/queue/enqueue",
    "DELETE /api/v1.0/queue/renege/{id}",
    "PUT    /api/v1.0/queue/priority/{id}",
    "GET    /api/v1.0/SystemInfo",
];

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/queue/list", get(handlers::list))
        .route("/queue/detail", get(handlers::detail))
        .route(
            "/queue/service",
            get(handlers::service).post(handlers::service),
        )
        .route("/queue/enqueue", post(handlers::enqueue))
        .route("/queue/renege/{id}", delete(handlers::renege))
        .route("/queue/priority/{id}", put(handlers::update_priority))
        .route("/SystemInfo", get(handlers::system_info));

    Router::new()
        .nest(API_PREFIX, api_routes)
        .fallback(handlers::fallback)
        .with_state(state)
}

/// Serve the API until `shutdown` fires.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %format!("http://{}", listener.local_addr()?),
        "HTTP API ready"
    );
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    info!("HTTP API stopped");
    Ok(())
}
