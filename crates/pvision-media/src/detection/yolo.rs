//! YOLOv8 object detection using an ONNX model.
//!
//! Execution provider selection is automatic:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use image::DynamicImage;
use metrics::{counter, histogram};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use pvision_models::{BBox, Detection, DetectionSet, Role};

use crate::detection::{DetectorConfig, ModelInfo, ObjectDetector};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Bounding box coordinates plus the 80 class scores per candidate.
const NUM_FEATURES: usize = 4 + COCO_CLASSES.len();

/// Name of a COCO class id.
pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("unknown")
}

/// YOLOv8 detector backed by ONNX Runtime.
///
/// Inference statistics accumulate across calls and surface through
/// [`ObjectDetector::model_info`].
pub struct YoloDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
    total_inferences: AtomicU64,
    total_inference_time_us: AtomicU64,
}

impl YoloDetector {
    /// Load the ONNX model and build an inference session.
    ///
    /// Returns an error if the model file doesn't exist or cannot be loaded.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        if !config.model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            input_size = config.input_size,
            confidence_threshold = config.confidence_threshold,
            "object detector initialized"
        );

        Ok(Self {
            session,
            config,
            total_inferences: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
        })
    }

    /// Detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, N]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, frame: &Frame) -> MediaResult<DetectionSet> {
        let img = DynamicImage::ImageRgb8(frame.image().clone());
        let input = preprocess(&img, self.config.input_size)?;

        let started = Instant::now();
        let outputs = self.run_inference(input)?;
        let elapsed = started.elapsed();

        self.total_inferences.fetch_add(1, Ordering::Relaxed);
        self.total_inference_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        counter!("pvision_detector_inferences_total").increment(1);
        histogram!("pvision_detector_inference_duration_seconds").record(elapsed.as_secs_f64());

        let detections = postprocess(&self.config, &outputs, frame.width(), frame.height())?;
        debug!(count = detections.len(), "object detection completed");

        Ok(DetectionSet::new(detections))
    }

    fn model_info(&self) -> ModelInfo {
        let total = self.total_inferences.load(Ordering::Relaxed);
        let total_seconds = self.total_inference_time_us.load(Ordering::Relaxed) as f64 / 1e6;
        let average = if total > 0 {
            total_seconds / total as f64
        } else {
            0.0
        };
        let fps_estimate = if average > 0.0 { 1.0 / average } else { 0.0 };

        ModelInfo {
            model_type: "YOLOv8".to_string(),
            total_inferences: total,
            average_inference_time: average,
            confidence_threshold: self.config.confidence_threshold,
            iou_threshold: self.config.nms_threshold,
            tracked_classes: self
                .config
                .tracked_classes
                .iter()
                .map(|&id| class_name(id).to_string())
                .collect(),
            fps_estimate,
        }
    }
}

/// Preprocess a frame for YOLOv8 inference.
///
/// - Resize to the model's square input size
/// - Normalize pixel values to [0, 1]
/// - Convert to NCHW layout (batch, channels, height, width)
fn preprocess(img: &DynamicImage, input_size: u32) -> MediaResult<Value> {
    let resized = img.resize_exact(input_size, input_size, image::imageops::FilterType::Triangle);

    let rgb = resized.to_rgb8();
    let (w, h) = (input_size as usize, input_size as usize);

    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    let shape = vec![1usize, 3, h, w];
    Tensor::from_array((shape, chw_data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::detection_failed(format!("create input tensor: {}", e)))
}

/// Decode raw YOLOv8 output into pixel-space detections.
///
/// The output layout is [1, 84, N] with 84 = 4 bbox values (cx, cy, w, h in
/// model coordinates) plus 80 class scores. The candidate count N varies with
/// the model export, so it is derived from the tensor length.
fn postprocess(
    config: &DetectorConfig,
    outputs: &[f32],
    orig_width: u32,
    orig_height: u32,
) -> MediaResult<Vec<Detection>> {
    if outputs.is_empty() || outputs.len() % NUM_FEATURES != 0 {
        return Err(MediaError::detection_failed(format!(
            "unexpected output size {}, not divisible by {}",
            outputs.len(),
            NUM_FEATURES
        )));
    }
    let num_boxes = outputs.len() / NUM_FEATURES;

    // Output is feature-major; transpose to index candidates by row.
    let output_array = Array::from_shape_vec((NUM_FEATURES, num_boxes), outputs.to_vec())
        .map_err(|e| MediaError::detection_failed(format!("reshape output: {}", e)))?;
    let transposed = output_array.t();

    let input_size = config.input_size as f32;
    let scale_w = orig_width as f32 / input_size;
    let scale_h = orig_height as f32 / input_size;

    let mut candidates: Vec<Detection> = Vec::new();
    for i in 0..num_boxes {
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..COCO_CLASSES.len() {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < config.confidence_threshold {
            continue;
        }
        if !config.tracked_classes.contains(&best_class) {
            continue;
        }

        // Center format to corner format, scaled to the original frame.
        let bbox = BBox::new(
            (cx - w / 2.0) * scale_w,
            (cy - h / 2.0) * scale_h,
            (cx + w / 2.0) * scale_w,
            (cy + h / 2.0) * scale_h,
        )
        .clamp_to(orig_width, orig_height);

        let mut det = Detection::new(best_class, class_name(best_class), best_score, bbox);
        if best_class == config.person_class_id {
            let role = config.role_thresholds.classify(det.area);
            det = det.with_role(role);
        } else if best_class == config.ball_class_id {
            det = det.with_role(Role::Ball);
        }
        candidates.push(det);
    }

    Ok(nms(candidates, config.nms_threshold))
}

/// Non-maximum suppression, applied per class.
fn nms(mut detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if iou(&detections[i].bbox, &detections[j].bbox) > threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over union of two boxes.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create an ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("read model file: {}", e)))?;

    let mut builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    // Try CoreML on macOS
    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    // CPU fallback
    info!("using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a feature-major output buffer for `boxes` candidates, each given
    /// as (cx, cy, w, h, class_id, score) in model coordinates.
    fn synthetic_output(num_boxes: usize, boxes: &[(f32, f32, f32, f32, usize, f32)]) -> Vec<f32> {
        let mut out = vec![0.0f32; NUM_FEATURES * num_boxes];
        for (i, &(cx, cy, w, h, class_id, score)) in boxes.iter().enumerate() {
            out[i] = cx;
            out[num_boxes + i] = cy;
            out[2 * num_boxes + i] = w;
            out[3 * num_boxes + i] = h;
            out[(4 + class_id) * num_boxes + i] = score;
        }
        out
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(class_name(0), "person");
        assert_eq!(class_name(32), "sports ball");
        assert_eq!(class_name(36), "skateboard");
        assert_eq!(class_name(37), "surfboard");
        assert_eq!(class_name(999), "unknown");
    }

    #[test]
    fn test_postprocess_scales_to_pixels_and_assigns_roles() {
        let config = DetectorConfig::default();
        // One large person centered in the 640x640 model space.
        let outputs = synthetic_output(2, &[(320.0, 320.0, 320.0, 320.0, 0, 0.9)]);

        let detections = postprocess(&config, &outputs, 1280, 720).unwrap();
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        assert_eq!(det.class_name, "person");
        assert!((det.bbox.x1 - 320.0).abs() < 0.5);
        assert!((det.bbox.y1 - 180.0).abs() < 0.5);
        assert!((det.bbox.x2 - 960.0).abs() < 0.5);
        assert!((det.bbox.y2 - 540.0).abs() < 0.5);
        // 640x360 pixels is well above the player area cutoff.
        assert_eq!(det.role, Some(Role::Player));
    }

    #[test]
    fn test_postprocess_drops_untracked_classes() {
        let config = DetectorConfig::default();
        // A confident car (class 2) plus a confident ball (class 32).
        let outputs = synthetic_output(
            2,
            &[
                (100.0, 100.0, 50.0, 50.0, 2, 0.95),
                (300.0, 300.0, 20.0, 20.0, 32, 0.8),
            ],
        );

        let detections = postprocess(&config, &outputs, 640, 640).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_name, "sports ball");
        assert_eq!(detections[0].role, Some(Role::Ball));
    }

    #[test]
    fn test_postprocess_drops_low_confidence() {
        let config = DetectorConfig::default();
        let outputs = synthetic_output(1, &[(100.0, 100.0, 50.0, 50.0, 0, 0.4)]);
        let detections = postprocess(&config, &outputs, 640, 640).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_postprocess_rejects_malformed_output() {
        let config = DetectorConfig::default();
        assert!(postprocess(&config, &[0.0; 83], 640, 640).is_err());
        assert!(postprocess(&config, &[], 640, 640).is_err());
    }

    #[test]
    fn test_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);

        let disjoint = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(iou(&a, &disjoint), 0.0);

        // Half-overlapping boxes: intersection 50, union 150.
        let half = BBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((iou(&a, &half) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_only() {
        let person_a = Detection::new(0, "person", 0.9, BBox::new(0.0, 0.0, 10.0, 10.0));
        let person_b = Detection::new(0, "person", 0.7, BBox::new(1.0, 1.0, 11.0, 11.0));
        let ball = Detection::new(32, "sports ball", 0.8, BBox::new(0.0, 0.0, 10.0, 10.0));

        let kept = nms(vec![person_a, person_b, ball], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_name, "sports ball");
    }

    #[test]
    fn test_nms_keeps_separated_boxes() {
        let a = Detection::new(0, "person", 0.9, BBox::new(0.0, 0.0, 10.0, 10.0));
        let b = Detection::new(0, "person", 0.8, BBox::new(100.0, 100.0, 110.0, 110.0));
        assert_eq!(nms(vec![a, b], 0.45).len(), 2);
    }
}
