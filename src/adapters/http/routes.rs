//! Axum routes for the dialogue engine.
//!
//! Endpoints:
//! - POST /invoke - serve one conversational turn
//! - GET  /       - service banner
//! - GET  /health - liveness probe

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health, invoke, root, AppState};

/// Creates the full application router.
///
/// CORS is permissive: the game client is served from arbitrary origins. The
/// timeout bounds the whole turn, including every provider round trip.
pub fn app_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/", get(root))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
