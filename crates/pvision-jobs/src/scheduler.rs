//! Supervised background job execution.
//!
//! Submission returns immediately; the pipeline runs on the tokio runtime
//! under a concurrency cap. The pipeline future is spawned as its own task
//! so a panic surfaces as a captured `JoinError` and marks the job failed
//! instead of taking anything else down.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::Instrument;

use pvision_media::VideoProcessor;
use pvision_models::JobId;

use crate::logging::JobLogger;
use crate::registry::JobRegistry;

/// Schedules registered jobs onto the runtime with bounded concurrency.
pub struct JobScheduler {
    registry: Arc<JobRegistry>,
    processor: Arc<dyn VideoProcessor>,
    permits: Arc<Semaphore>,
}

impl JobScheduler {
    pub fn new(
        registry: Arc<JobRegistry>,
        processor: Arc<dyn VideoProcessor>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            processor,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Start background processing for a registered job.
    ///
    /// Returns the supervisor task handle; callers that don't need to await
    /// completion can drop it.
    pub fn spawn(&self, job_id: JobId, input: PathBuf, output: PathBuf) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let processor = Arc::clone(&self.processor);
        let permits = Arc::clone(&self.permits);

        counter!("pvision_jobs_submitted_total").increment(1);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    registry
                        .mark_failed(&job_id, "scheduler shut down before the job started")
                        .await;
                    return;
                }
            };

            let logger = JobLogger::new(&job_id, "video_processing");
            logger.log_start(&format!("processing {}", input.display()));
            let started = Instant::now();

            // Run the pipeline in its own task so a panic is captured as a
            // JoinError rather than unwinding through the scheduler.
            let pipeline_task = {
                let processor = Arc::clone(&processor);
                let input = input.clone();
                let output = output.clone();
                let span = logger.span();
                tokio::spawn(
                    async move { processor.process_video(&input, &output).await }.instrument(span),
                )
            };

            match pipeline_task.await {
                Ok(Ok(result)) => {
                    // Clean up before the job turns visible as completed, so
                    // a completed status always means the upload is gone.
                    remove_input(&input, &logger).await;
                    registry.mark_completed(&job_id, output, result).await;
                    counter!("pvision_jobs_completed_total").increment(1);
                    histogram!("pvision_job_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    logger.log_completed(&format!(
                        "finished in {:.2}s",
                        started.elapsed().as_secs_f64()
                    ));
                }
                Ok(Err(e)) => {
                    registry.mark_failed(&job_id, e.to_string()).await;
                    counter!("pvision_jobs_failed_total").increment(1);
                    logger.log_failed(&e.to_string());
                }
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        "processing task panicked"
                    } else {
                        "processing task was cancelled"
                    };
                    registry.mark_failed(&job_id, reason).await;
                    counter!("pvision_jobs_failed_total").increment(1);
                    logger.log_failed(reason);
                }
            }
        })
    }
}

/// Successful jobs no longer need their uploaded input. Failed jobs keep
/// theirs for diagnosis.
async fn remove_input(path: &Path, logger: &JobLogger) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        logger.log_warning(&format!("could not remove input {}: {}", path.display(), e));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use pvision_media::{MediaError, MediaResult};
    use pvision_models::{Job, JobState, ProcessingResult, VideoProperties};

    use super::*;

    fn sample_result() -> ProcessingResult {
        ProcessingResult::finalize(
            VideoProperties::new(640, 480, 30, 90),
            90,
            180,
            &[0.01; 90],
            3.0,
        )
    }

    struct OkProcessor;

    #[async_trait]
    impl VideoProcessor for OkProcessor {
        async fn process_video(&self, _input: &Path, _output: &Path) -> MediaResult<ProcessingResult> {
            Ok(sample_result())
        }
    }

    struct FailingProcessor;

    #[async_trait]
    impl VideoProcessor for FailingProcessor {
        async fn process_video(&self, _input: &Path, _output: &Path) -> MediaResult<ProcessingResult> {
            Err(MediaError::read_failed("corrupt container"))
        }
    }

    struct PanickingProcessor;

    #[async_trait]
    impl VideoProcessor for PanickingProcessor {
        async fn process_video(&self, _input: &Path, _output: &Path) -> MediaResult<ProcessingResult> {
            panic!("index out of bounds in decoder");
        }
    }

    struct GatedProcessor {
        started: Arc<AtomicUsize>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl VideoProcessor for GatedProcessor {
        async fn process_video(&self, _input: &Path, _output: &Path) -> MediaResult<ProcessingResult> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(sample_result())
        }
    }

    async fn submit(
        scheduler: &JobScheduler,
        registry: &JobRegistry,
        input: PathBuf,
    ) -> (JobId, JoinHandle<()>) {
        let job = Job::new("clip.mp4", input.clone());
        let id = registry.create(job).await;
        let output = input.with_extension("out.mp4");
        let handle = scheduler.spawn(id.clone(), input, output);
        (id, handle)
    }

    #[tokio::test]
    async fn test_successful_job_completes_and_removes_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"fake video bytes").unwrap();

        let registry = Arc::new(JobRegistry::new());
        let scheduler = JobScheduler::new(Arc::clone(&registry), Arc::new(OkProcessor), 2);

        let (id, handle) = submit(&scheduler, &registry, input.clone()).await;
        handle.await.unwrap();

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.output_path.is_some());
        assert_eq!(job.result.unwrap().processed_frames, 90);
        assert!(!input.exists(), "input should be cleaned up on success");
    }

    #[tokio::test]
    async fn test_failed_job_records_error_and_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"fake video bytes").unwrap();

        let registry = Arc::new(JobRegistry::new());
        let scheduler = JobScheduler::new(Arc::clone(&registry), Arc::new(FailingProcessor), 2);

        let (id, handle) = submit(&scheduler, &registry, input.clone()).await;
        handle.await.unwrap();

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error_message.unwrap().contains("corrupt container"));
        assert!(input.exists(), "failed jobs keep their input for diagnosis");
    }

    #[tokio::test]
    async fn test_panicking_job_is_marked_failed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"fake video bytes").unwrap();

        let registry = Arc::new(JobRegistry::new());
        let scheduler = JobScheduler::new(Arc::clone(&registry), Arc::new(PanickingProcessor), 2);

        let (id, handle) = submit(&scheduler, &registry, input).await;
        // The supervisor task itself must survive the pipeline panic.
        handle.await.unwrap();

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("processing task panicked"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_the_permit_cap() {
        let dir = tempfile::tempdir().unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let registry = Arc::new(JobRegistry::new());
        let scheduler = JobScheduler::new(
            Arc::clone(&registry),
            Arc::new(GatedProcessor {
                started: Arc::clone(&started),
                gate: Arc::clone(&gate),
            }),
            1,
        );

        let first_input = dir.path().join("a.mp4");
        let second_input = dir.path().join("b.mp4");
        std::fs::write(&first_input, b"a").unwrap();
        std::fs::write(&second_input, b"b").unwrap();

        let (_, first) = submit(&scheduler, &registry, first_input).await;
        let (_, second) = submit(&scheduler, &registry, second_input).await;

        // Wait for the first job to enter the processor.
        for _ in 0..100 {
            if started.load(Ordering::SeqCst) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1, "second job must wait for a permit");

        gate.notify_one();
        // Once the first finishes, the second starts and blocks on the gate.
        for _ in 0..100 {
            if started.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        gate.notify_one();

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(registry.active_count().await, 0);
    }
}
