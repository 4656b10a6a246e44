//! HTTP route handlers.

pub mod live;
pub mod upload;

use crate::config::AppState;
use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;

/// HTTP request logging middleware.
///
/// Logs each request in format: "IP METHOD PATH - STATUS"
async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!("{} {} {} - {}", peer, method, uri, status.as_u16());

    response
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/live", get(live::handle_live))
        .route("/upload", post(upload::handle_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
