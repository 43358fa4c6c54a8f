//! Video submission, status, and download handlers.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tracing::info;

use pvision_models::{Job, JobId, JobState, ProcessingResult};

use crate::error::{ApiError, ApiResult};
use crate::handlers::upload::read_upload;
use crate::metrics::{record_upload, record_upload_rejected};
use crate::state::AppState;

/// Acknowledgement for an accepted video upload.
#[derive(Serialize)]
pub struct VideoSubmitResponse {
    pub message: String,
    pub job_id: JobId,
    pub status_url: String,
    pub input_file: String,
}

/// Accept a video upload and schedule it for background processing.
///
/// The upload is persisted and the job registered before this returns, so
/// the returned `status_url` is immediately pollable.
pub async fn submit_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VideoSubmitResponse>> {
    let context = state.context()?;

    let upload = read_upload(multipart).await?;
    let filename = upload
        .filename
        .ok_or_else(|| ApiError::bad_request("No filename provided"))?;

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        record_upload_rejected("invalid_filename");
        return Err(ApiError::bad_request("Invalid filename"));
    }
    if !crate::store::has_allowed_extension(&filename) {
        record_upload_rejected("invalid_extension");
        return Err(ApiError::bad_request("Invalid video format"));
    }

    let job_id = JobId::new();
    let input_path = state.store.input_path(&job_id, &filename);
    let output_path = state.store.output_path(&job_id, &filename);

    state
        .store
        .save_upload(&input_path, &upload.data)
        .await
        .map_err(|e| ApiError::internal(format!("Could not persist upload: {}", e)))?;
    record_upload(upload.data.len());

    let job = Job::with_id(job_id.clone(), &filename, &input_path);
    state.registry.create(job).await;
    context.scheduler.spawn(job_id.clone(), input_path, output_path);

    info!(
        job_id = %job_id,
        filename = %filename,
        size_bytes = upload.data.len(),
        "video accepted for processing"
    );

    Ok(Json(VideoSubmitResponse {
        message: "Video processing started".to_string(),
        status_url: format!("/status/{}", job_id),
        input_file: filename,
        job_id,
    }))
}

/// Current state of a processing job.
#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Poll a job by ID.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = JobId::from_string(job_id);
    let job = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let mut response = JobStatusResponse {
        job_id: job.id.clone(),
        status: job.state.as_str().to_string(),
        message: None,
        download_url: None,
        processed_file: None,
        result: None,
        error: None,
    };

    match job.state {
        JobState::Processing => {
            response.message = Some("Video is being processed...".to_string());
        }
        JobState::Completed => {
            response.download_url = Some(format!("/download/{}", job.id));
            response.processed_file = job
                .output_path
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned());
            response.result = job.result;
        }
        JobState::Failed => {
            response.error = job.error_message;
        }
    }

    Ok(Json(response))
}

/// Download the processed video for a completed job.
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(job_id);
    let job = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Processed video not found"))?;

    let output_path = match (&job.state, &job.output_path) {
        (JobState::Completed, Some(path)) => path.clone(),
        _ => return Err(ApiError::not_found("Processed video not found")),
    };

    let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found("Processed video not found")
        } else {
            ApiError::internal(format!("Could not read processed video: {}", e))
        }
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"processed_{}.mp4\"", job.id),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
