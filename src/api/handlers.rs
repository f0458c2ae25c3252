//! Route handlers and error rendering.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::Error;
use crate::search::{EncoderDescriptor, SearchRequest};
use crate::store::SearchResponse;

/// Health response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" while the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Loaded encoder
    pub encoder: EncoderDescriptor,
    /// Seconds since start
    pub uptime: u64,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub(super) async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, Error> {
    let response = state.handler.handle(request).await?;
    Ok(Json(response))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        encoder: state.handler.encoder().descriptor(),
        uptime: state.start_time.elapsed().as_secs(),
    })
}

pub(super) async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => metrics.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
