//! HTTP handlers for the invoke endpoint.
//!
//! Policy failures never surface as HTTP errors: the caller always receives a
//! final text when generation succeeds. Only transport-level provider
//! failures map to error statuses.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::application::PipelineService;
use crate::ports::ProviderError;

use super::dto::{ErrorResponse, InvokeRequest, InvokeResponse};

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineService>,
}

impl AppState {
    pub fn new(pipeline: Arc<PipelineService>) -> Self {
        Self { pipeline }
    }
}

/// Serve one conversational turn.
///
/// POST /invoke
pub async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let turn = request.into_turn().map_err(|msg| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(msg)),
        )
    })?;

    let result = state
        .pipeline
        .run_turn(turn)
        .await
        .map_err(provider_error_response)?;

    Ok(Json(InvokeResponse::from(result)))
}

/// Maps provider failures to HTTP statuses.
fn provider_error_response(err: ProviderError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        ProviderError::RateLimited { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::upstream(err.to_string())),
        ),
        ProviderError::AuthenticationFailed
        | ProviderError::Unavailable { .. }
        | ProviderError::Network(_)
        | ProviderError::Parse(_) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::upstream(err.to_string())),
        ),
        ProviderError::InvalidRequest(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal(err.to_string())),
        ),
    }
}

/// Service banner.
///
/// GET /
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Stagewright dialogue engine is running",
        "status": "ok"
    }))
}

/// Liveness probe.
///
/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
