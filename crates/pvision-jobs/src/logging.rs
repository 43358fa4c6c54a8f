//! Structured job logging.

use tracing::{error, info, warn, Span};

use pvision_models::JobId;

/// Logger carrying job context for lifecycle events.
///
/// Everything emitted inside [`JobLogger::span`] inherits the `job_id` and
/// `operation` fields, so pipeline progress lines are attributable to their
/// job without the pipeline knowing about jobs.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_failed(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job failed: {}", message
        );
    }

    pub fn log_completed(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping the work done on this job's behalf.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_carries_job_context() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "video_processing");
        assert_eq!(logger.job_id(), job_id.to_string());
    }
}
