//! Error types for media operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Could not open video: {}", .0.display())]
    OpenFailed(PathBuf),

    #[error("Could not create output video: {}", .0.display())]
    CreateFailed(PathBuf),

    #[error("Video read failed: {0}")]
    ReadFailed(String),

    #[error("Video write failed: {0}")]
    WriteFailed(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an open failure for the given path.
    pub fn open_failed(path: impl AsRef<Path>) -> Self {
        Self::OpenFailed(path.as_ref().to_path_buf())
    }

    /// Create an output-creation failure for the given path.
    pub fn create_failed(path: impl AsRef<Path>) -> Self {
        Self::CreateFailed(path.as_ref().to_path_buf())
    }

    /// Create a read failure error.
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed(message.into())
    }

    /// Create a write failure error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed(message.into())
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound(path.as_ref().to_path_buf())
    }

    /// Create an invalid image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl AsRef<Path>) -> Self {
        Self::ModelNotFound(path.as_ref().to_path_buf())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
