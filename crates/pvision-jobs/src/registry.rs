//! In-memory job registry.
//!
//! The registry is the single source of truth for job state. Lookups of
//! unknown ids return `None` so callers can map them to a not-found response
//! instead of inventing placeholder jobs.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::warn;

use pvision_models::{Job, JobId, ProcessingResult};

/// Shared registry of all jobs the service has accepted.
///
/// Completed and failed jobs stay resident so their status and artifacts
/// remain queryable for the lifetime of the process.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job and return its id.
    pub async fn create(&self, job: Job) -> JobId {
        let id = job.id.clone();
        self.jobs.write().await.insert(id.clone(), job);
        id
    }

    /// Fetch a snapshot of a job by id.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Transition a job to completed with its output artifact and result.
    ///
    /// Terminal jobs are never rewritten; a late completion for one is
    /// logged and dropped.
    pub async fn mark_completed(&self, id: &JobId, output_path: PathBuf, result: ProcessingResult) {
        let mut jobs = self.jobs.write().await;
        match jobs.remove(id) {
            Some(job) if job.state.is_terminal() => {
                warn!(job_id = %id, state = job.state.as_str(), "ignoring completion for terminal job");
                jobs.insert(id.clone(), job);
            }
            Some(job) => {
                jobs.insert(id.clone(), job.complete(output_path, result));
            }
            None => warn!(job_id = %id, "completion for unknown job"),
        }
    }

    /// Transition a job to failed with an error message.
    ///
    /// Terminal jobs are never rewritten.
    pub async fn mark_failed(&self, id: &JobId, error: impl Into<String>) {
        let mut jobs = self.jobs.write().await;
        match jobs.remove(id) {
            Some(job) if job.state.is_terminal() => {
                warn!(job_id = %id, state = job.state.as_str(), "ignoring failure for terminal job");
                jobs.insert(id.clone(), job);
            }
            Some(job) => {
                jobs.insert(id.clone(), job.fail(error));
            }
            None => warn!(job_id = %id, "failure for unknown job"),
        }
    }

    /// Total number of registered jobs.
    pub async fn count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Number of jobs still processing.
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.state.is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvision_models::{JobState, VideoProperties};

    fn sample_result() -> ProcessingResult {
        ProcessingResult::finalize(
            VideoProperties::new(640, 480, 30, 120),
            120,
            240,
            &[0.01; 120],
            4.0,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let registry = JobRegistry::new();
        let job = Job::new("match.mp4", "/tmp/uploads/match.mp4");
        let id = registry.create(job).await;

        let fetched = registry.get(&id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.filename, "match.mp4");
        assert_eq!(fetched.state, JobState::Processing);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_returns_none() {
        let registry = JobRegistry::new();
        assert!(registry.get(&JobId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_mark_completed() {
        let registry = JobRegistry::new();
        let id = registry.create(Job::new("a.mp4", "/tmp/a.mp4")).await;

        registry
            .mark_completed(&id, PathBuf::from("/tmp/out.mp4"), sample_result())
            .await;

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.output_path.as_deref(), Some(std::path::Path::new("/tmp/out.mp4")));
        assert_eq!(job.result.unwrap().processed_frames, 120);
        assert!(job.finished_at.is_some());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_mark_failed() {
        let registry = JobRegistry::new();
        let id = registry.create(Job::new("a.mp4", "/tmp/a.mp4")).await;

        registry.mark_failed(&id, "decode blew up").await;

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("decode blew up"));
    }

    #[tokio::test]
    async fn test_terminal_state_is_never_rewritten() {
        let registry = JobRegistry::new();
        let id = registry.create(Job::new("a.mp4", "/tmp/a.mp4")).await;

        registry
            .mark_completed(&id, PathBuf::from("/tmp/out.mp4"), sample_result())
            .await;
        registry.mark_failed(&id, "late failure").await;

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.error_message.is_none());
    }

    #[tokio::test]
    async fn test_active_count_tracks_processing_jobs() {
        let registry = JobRegistry::new();
        let first = registry.create(Job::new("a.mp4", "/tmp/a.mp4")).await;
        let _second = registry.create(Job::new("b.mp4", "/tmp/b.mp4")).await;
        assert_eq!(registry.active_count().await, 2);

        registry.mark_failed(&first, "boom").await;
        assert_eq!(registry.active_count().await, 1);
        assert_eq!(registry.count().await, 2);
    }
}
