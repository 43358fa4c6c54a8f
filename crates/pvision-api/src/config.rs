//! API configuration.

use std::path::PathBuf;

use pvision_media::{DetectorConfig, PipelineConfig};
use pvision_models::RoleThresholds;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (uploads are whole videos)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Directory for persisted uploads
    pub upload_dir: PathBuf,
    /// Directory for processed outputs
    pub output_dir: PathBuf,
    /// ONNX model weights
    pub model_path: PathBuf,
    /// Square model input size in pixels
    pub model_input_size: u32,
    /// Minimum detection confidence
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub nms_threshold: f32,
    /// COCO class ID treated as a person
    pub person_class_id: usize,
    /// COCO class ID treated as the ball
    pub ball_class_id: usize,
    /// COCO class IDs kept after filtering
    pub tracked_classes: Vec<usize>,
    /// Person boxes above this area are players
    pub player_min_area: f32,
    /// Person boxes above this area (but below player size) are referees
    pub referee_min_area: f32,
    /// Detection stride: detect on every Nth frame
    pub frame_skip: u64,
    /// Log pipeline progress every N processed frames
    pub progress_every: u64,
    /// Yield to the scheduler every N processed frames
    pub yield_every: u64,
    /// Concurrent background processing jobs
    pub max_concurrent_jobs: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024 * 1024, // 1GB
            environment: "development".to_string(),
            upload_dir: PathBuf::from("data/uploads"),
            output_dir: PathBuf::from("data/outputs"),
            model_path: PathBuf::from("models/yolov8n.onnx"),
            model_input_size: 640,
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            person_class_id: 0,
            ball_class_id: 32,
            tracked_classes: vec![0, 32, 36, 37],
            player_min_area: 5000.0,
            referee_min_area: 2000.0,
            frame_skip: 1,
            progress_every: 100,
            yield_every: 10,
            max_concurrent_jobs: 2,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            model_input_size: std::env::var("MODEL_INPUT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.model_input_size),
            confidence_threshold: std::env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.confidence_threshold),
            nms_threshold: std::env::var("NMS_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.nms_threshold),
            person_class_id: std::env::var("PERSON_CLASS_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.person_class_id),
            ball_class_id: std::env::var("BALL_CLASS_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ball_class_id),
            tracked_classes: std::env::var("TRACKED_CLASSES")
                .map(|s| s.split(',').filter_map(|c| c.trim().parse().ok()).collect())
                .unwrap_or(defaults.tracked_classes),
            player_min_area: std::env::var("PLAYER_MIN_AREA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.player_min_area),
            referee_min_area: std::env::var("REFEREE_MIN_AREA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.referee_min_area),
            frame_skip: std::env::var("FRAME_SKIP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_skip),
            progress_every: std::env::var("PROGRESS_EVERY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.progress_every),
            yield_every: std::env::var("YIELD_EVERY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.yield_every),
            max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Detector settings derived from this config.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            model_path: self.model_path.clone(),
            confidence_threshold: self.confidence_threshold,
            nms_threshold: self.nms_threshold,
            input_size: self.model_input_size,
            person_class_id: self.person_class_id,
            ball_class_id: self.ball_class_id,
            tracked_classes: self.tracked_classes.clone(),
            role_thresholds: RoleThresholds {
                player_min_area: self.player_min_area,
                referee_min_area: self.referee_min_area,
            },
        }
    }

    /// Pipeline settings derived from this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            frame_skip: self.frame_skip,
            progress_every: self.progress_every,
            yield_every: self.yield_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.tracked_classes, vec![0, 32, 36, 37]);
        assert!(!config.is_production());
    }

    #[test]
    fn test_detector_config_conversion() {
        let mut config = ApiConfig::default();
        config.confidence_threshold = 0.25;
        config.player_min_area = 7000.0;

        let detector = config.detector_config();
        assert_eq!(detector.confidence_threshold, 0.25);
        assert_eq!(detector.role_thresholds.player_min_area, 7000.0);
        assert_eq!(detector.input_size, 640);
    }

    #[test]
    fn test_pipeline_config_conversion() {
        let mut config = ApiConfig::default();
        config.frame_skip = 3;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.frame_skip, 3);
        assert_eq!(pipeline.progress_every, 100);
        assert_eq!(pipeline.yield_every, 10);
    }
}
