//! Shared data models for the PitchVision backend.
//!
//! This crate provides Serde-serializable types for:
//! - Detections, bounding boxes, and inferred field roles
//! - Video stream properties
//! - Processing jobs and their lifecycle
//! - Aggregate processing metrics

pub mod detection;
pub mod job;
pub mod result;
pub mod video;

// Re-export common types
pub use detection::{BBox, Detection, DetectionSet, Role, RoleThresholds};
pub use job::{Job, JobId, JobState};
pub use result::ProcessingResult;
pub use video::VideoProperties;
