//! Object detection over decoded frames.
//!
//! The pipeline and the API layer depend on the [`ObjectDetector`] trait, not
//! on a concrete model, so tests can substitute a mock and the ONNX runtime
//! is only touched by [`YoloDetector`].

pub mod yolo;

use serde::Serialize;

use pvision_models::{DetectionSet, RoleThresholds};

use crate::error::MediaResult;
use crate::frame::Frame;

pub use yolo::YoloDetector;

/// Detector tuning and class selection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the ONNX model file.
    pub model_path: std::path::PathBuf,
    /// Minimum confidence for a candidate box to survive.
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression.
    pub nms_threshold: f32,
    /// Square input resolution the model expects.
    pub input_size: u32,
    /// Class id treated as a person for role assignment.
    pub person_class_id: usize,
    /// Class id treated as the ball.
    pub ball_class_id: usize,
    /// Class ids kept in the output; everything else is discarded.
    pub tracked_classes: Vec<usize>,
    /// Area cutoffs for person role assignment.
    pub role_thresholds: RoleThresholds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: std::path::PathBuf::from("models/yolov8n.onnx"),
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            input_size: 640,
            person_class_id: 0,
            ball_class_id: 32,
            tracked_classes: vec![0, 32, 36, 37],
            role_thresholds: RoleThresholds::default(),
        }
    }
}

/// Model metadata and running inference statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub total_inferences: u64,
    /// Mean inference time in seconds across all calls so far.
    pub average_inference_time: f64,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Names of the classes the detector reports.
    pub tracked_classes: Vec<String>,
    /// Rough throughput estimate from the average inference time.
    pub fps_estimate: f64,
}

/// Something that can find objects in a frame.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Run detection on one frame.
    fn detect(&self, frame: &Frame) -> MediaResult<DetectionSet>;

    /// Describe the model and its inference statistics.
    fn model_info(&self) -> ModelInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.nms_threshold, 0.45);
        assert_eq!(config.input_size, 640);
        assert_eq!(config.tracked_classes, vec![0, 32, 36, 37]);
        assert_eq!(config.person_class_id, 0);
        assert_eq!(config.ball_class_id, 32);
    }

    #[test]
    fn test_model_info_serializes() {
        let info = ModelInfo {
            model_type: "YOLOv8".to_string(),
            total_inferences: 10,
            average_inference_time: 0.02,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            tracked_classes: vec!["person".to_string(), "sports ball".to_string()],
            fps_estimate: 50.0,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["model_type"], "YOLOv8");
        assert_eq!(json["total_inferences"], 10);
        assert_eq!(json["tracked_classes"][1], "sports ball");
    }
}
