//! Service banner, liveness, and readiness handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::readiness::ModelState;
use crate::state::AppState;

/// Root banner response.
#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub model_loaded: bool,
}

/// Root endpoint: service banner plus a quick model flag.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "PitchVision Sports Video Analytics API".to_string(),
        status: "running".to_string(),
        model_loaded: state.readiness.is_ready().await,
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_status: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
///
/// Always 200 while the process is up; the model may still be loading.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_status = match state.readiness.state().await {
        ModelState::Ready => "loaded",
        ModelState::Loading => "loading",
        ModelState::Failed(_) => "failed",
        ModelState::Uninitialized => "not_loaded",
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_status: model_status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness check endpoint (readiness probe).
///
/// 200 only once the detector is installed; 503 with the current lifecycle
/// state otherwise, so orchestrators hold traffic during model load.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.readiness.state().await {
        ModelState::Ready => Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            error: None,
        })),
        ModelState::Failed(error) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "failed".to_string(),
                error: Some(error),
            }),
        )),
        other => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: other.as_str().to_string(),
                error: None,
            }),
        )),
    }
}
