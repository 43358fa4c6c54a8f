//! Application state shared across handlers.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use pvision_jobs::{JobRegistry, JobScheduler};
use pvision_media::{ObjectDetector, VideoPipeline, VideoProcessor};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::readiness::ReadinessState;
use crate::store::ArtifactStore;

/// Detector-backed services, available only once the model has loaded.
pub struct ProcessingContext {
    pub detector: Arc<dyn ObjectDetector>,
    pub scheduler: Arc<JobScheduler>,
}

/// Shared application state.
///
/// The processing context is installed after startup finishes loading the
/// model; until then detection endpoints answer 503 while health endpoints
/// keep serving.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<JobRegistry>,
    pub readiness: Arc<ReadinessState>,
    pub store: Arc<ArtifactStore>,
    context: Arc<OnceLock<ProcessingContext>>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        let store = ArtifactStore::new(&config.upload_dir, &config.output_dir);
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            readiness: Arc::new(ReadinessState::new()),
            store: Arc::new(store),
            context: Arc::new(OnceLock::new()),
        }
    }

    /// Install a loaded detector and the processor that runs jobs with it,
    /// then flip readiness.
    pub async fn install_context(
        &self,
        detector: Arc<dyn ObjectDetector>,
        processor: Arc<dyn VideoProcessor>,
    ) {
        let scheduler = Arc::new(JobScheduler::new(
            Arc::clone(&self.registry),
            processor,
            self.config.max_concurrent_jobs,
        ));
        let context = ProcessingContext {
            detector,
            scheduler,
        };
        if self.context.set(context).is_err() {
            warn!("processing context already installed, ignoring");
            return;
        }
        self.readiness.set_ready().await;
        info!("processing context installed, detection endpoints live");
    }

    /// Install a loaded detector with the standard video pipeline.
    pub async fn install_detector(&self, detector: Arc<dyn ObjectDetector>) {
        let pipeline = VideoPipeline::new(Arc::clone(&detector), self.config.pipeline_config());
        self.install_context(detector, Arc::new(pipeline)).await;
    }

    /// Detector-backed services, or 503 while the model is not loaded.
    pub fn context(&self) -> ApiResult<&ProcessingContext> {
        self.context
            .get()
            .ok_or_else(|| ApiError::service_unavailable("Model not loaded"))
    }
}
