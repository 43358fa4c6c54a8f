//! Single-image detection and model metadata handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use pvision_media::{Frame, ModelInfo};
use pvision_models::DetectionSet;

use crate::error::{ApiError, ApiResult};
use crate::handlers::upload::read_upload;
use crate::state::AppState;

/// Detections for one uploaded image.
#[derive(Serialize)]
pub struct ImageDetectionResponse {
    pub filename: String,
    /// Wall-clock seconds spent in model inference
    pub inference_time: f64,
    pub detections: DetectionSet,
    pub detection_count: usize,
    /// Unique class names present, in first-seen order
    pub classes_detected: Vec<String>,
}

/// Run detection on a single uploaded image, synchronously.
pub async fn detect_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImageDetectionResponse>> {
    let detector = Arc::clone(&state.context()?.detector);

    let upload = read_upload(multipart).await?;
    let filename = upload.filename.unwrap_or_else(|| "image".to_string());

    let frame = Frame::decode(&upload.data)
        .map_err(|e| ApiError::bad_request(format!("Could not decode image: {}", e)))?;

    // Inference is CPU-bound; keep it off the async workers.
    let started = Instant::now();
    let detections = tokio::task::spawn_blocking(move || detector.detect(&frame))
        .await
        .map_err(|_| ApiError::internal("Detection task failed"))??;
    let inference_time = started.elapsed().as_secs_f64();

    info!(
        filename = %filename,
        detection_count = detections.len(),
        inference_time,
        "image detection completed"
    );

    Ok(Json(image_response(filename, inference_time, detections)))
}

fn image_response(
    filename: String,
    inference_time: f64,
    detections: DetectionSet,
) -> ImageDetectionResponse {
    ImageDetectionResponse {
        filename,
        inference_time,
        detection_count: detections.len(),
        classes_detected: detections.class_names(),
        detections,
    }
}

/// Model metadata: type, thresholds, and running inference statistics.
pub async fn model_info(State(state): State<AppState>) -> ApiResult<Json<ModelInfo>> {
    Ok(Json(state.context()?.detector.model_info()))
}
