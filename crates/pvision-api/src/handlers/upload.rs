//! Multipart upload extraction shared by the detection handlers.

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{ApiError, ApiResult};

/// One uploaded file pulled out of a multipart request.
pub(crate) struct UploadedFile {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Read the `file` field from a multipart body, ignoring any other fields.
pub(crate) async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read upload: {}", e)))?;
        return Ok(UploadedFile { filename, data });
    }

    Err(ApiError::bad_request("Missing file field"))
}
