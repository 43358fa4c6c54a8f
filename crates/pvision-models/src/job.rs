//! Job tracking for asynchronous video processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::ProcessingResult;

/// Unique identifier for a processing job.
///
/// UUIDv4 rather than a wall-clock timestamp, so near-simultaneous uploads
/// of identically named files never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state over its lifetime.
///
/// Jobs are created directly in `Processing`; `Completed` and `Failed` are
/// terminal and never rewritten — a fresh submission is a fresh job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Pipeline is running (or scheduled to run)
    #[default]
    Processing,
    /// Output artifact is available for download
    Completed,
    /// Pipeline failed; error message captured
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// One asynchronous video-processing request, tracked from submission to
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Original client-supplied filename
    pub filename: String,

    /// Job state
    #[serde(default)]
    pub state: JobState,

    /// Persisted upload location
    pub input_path: PathBuf,

    /// Output artifact location, set only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Error message, set only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Aggregate metrics, set only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Terminal-state timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a job in `Processing` state for a persisted upload.
    pub fn new(filename: impl Into<String>, input_path: impl Into<PathBuf>) -> Self {
        Self::with_id(JobId::new(), filename, input_path)
    }

    /// Create a job under a caller-chosen ID, for callers that derive storage
    /// paths from the ID before the job record exists.
    pub fn with_id(
        id: JobId,
        filename: impl Into<String>,
        input_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: filename.into(),
            state: JobState::Processing,
            input_path: input_path.into(),
            output_path: None,
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Mark the job completed with its output artifact and metrics.
    pub fn complete(mut self, output_path: impl Into<PathBuf>, result: ProcessingResult) -> Self {
        self.state = JobState::Completed;
        self.output_path = Some(output_path.into());
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job failed with the captured error.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.finished_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VideoProperties;

    fn sample_result() -> ProcessingResult {
        ProcessingResult::finalize(
            VideoProperties::new(640, 480, 30, 150),
            150,
            300,
            &[0.01; 150],
            5.0,
        )
    }

    #[test]
    fn test_job_creation() {
        let job = Job::new("match.mp4", "/tmp/uploads/abc_match.mp4");

        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.filename, "match.mp4");
        assert!(job.output_path.is_none());
        assert!(job.error_message.is_none());
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn test_job_ids_unique() {
        let a = Job::new("a.mp4", "/tmp/a.mp4");
        let b = Job::new("a.mp4", "/tmp/a.mp4");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_job_completion() {
        let job = Job::new("match.mp4", "/tmp/in.mp4");
        let completed = job.complete("/tmp/out.mp4", sample_result());

        assert_eq!(completed.state, JobState::Completed);
        assert!(completed.state.is_terminal());
        assert_eq!(
            completed.output_path.as_deref(),
            Some(std::path::Path::new("/tmp/out.mp4"))
        );
        assert!(completed.result.is_some());
        assert!(completed.finished_at.is_some());
    }

    #[test]
    fn test_job_failure() {
        let job = Job::new("match.mp4", "/tmp/in.mp4");
        let failed = job.fail("could not open video");

        assert_eq!(failed.state, JobState::Failed);
        assert!(failed.state.is_terminal());
        assert_eq!(failed.error_message.as_deref(), Some("could not open video"));
        assert!(failed.output_path.is_none());
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&JobState::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(JobState::Completed.as_str(), "completed");
        assert_eq!(JobState::Failed.as_str(), "failed");
    }
}
