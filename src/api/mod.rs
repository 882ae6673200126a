//! API module for all HTTP handlers
//!
//! - `POST /webhook` - signed push events
//! - `GET|POST /health` - liveness check, no auth
//!
//! Anything else, including other methods on `/webhook`, is a 404 with an empty body.

pub mod health;
pub mod webhook;

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::net::SocketAddr;
use tracing::{debug, info};

use crate::SharedState;

// Re-export handlers
pub use health::{health, health_post};
pub use webhook::handle_webhook;

/// Push payloads are capped at 25 MB by the provider.
pub const WEBHOOK_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Logs method, path and peer address of every request.
pub async fn log_request(req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    info!("{} - {} {}", peer, method, path);

    let response = next.run(req).await;
    debug!("{} {} -> {}", method, path, response.status());
    response
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/health",
            get(health).post(health_post).fallback(not_found),
        )
        .route(
            "/webhook",
            post(handle_webhook)
                .fallback(not_found)
                .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
