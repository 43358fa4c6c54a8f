#![deny(unreachable_patterns)]
//! Video decode, object detection, annotation, and encode.
//!
//! This crate provides:
//! - Frame streaming over OpenCV (`opencv` feature) via [`FrameSource`]/[`FrameSink`]
//! - YOLOv8 inference through ONNX Runtime behind the [`ObjectDetector`] trait
//! - Deterministic frame annotation (boxes, labels, info band)
//! - The [`VideoPipeline`] processing loop with stride, progress, and
//!   per-frame error tolerance

pub mod annotate;
pub mod detection;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod video_io;

pub use annotate::{annotate, class_color, draw_info_band, OverlayInfo, INFO_BAND_HEIGHT};
pub use detection::{DetectorConfig, ModelInfo, ObjectDetector, YoloDetector};
pub use detection::yolo::{class_name, COCO_CLASSES};
pub use error::{MediaError, MediaResult};
pub use frame::Frame;
pub use pipeline::{PipelineConfig, VideoPipeline, VideoProcessor};
pub use video_io::{FrameSink, FrameSource};

#[cfg(feature = "opencv")]
pub use video_io::{VideoFileReader, VideoFileWriter};
