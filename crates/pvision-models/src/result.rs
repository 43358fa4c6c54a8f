//! Aggregate metrics for a completed processing run.

use serde::{Deserialize, Serialize};

use crate::VideoProperties;

/// Metrics accumulated over one pipeline run, computed once at completion
/// and attached to the job. Never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Frame count reported by the input container
    pub total_frames: u64,
    /// Frames that went through detection (frame-skip stride applies)
    pub processed_frames: u64,
    /// Sum of detections over all processed frames
    pub total_detections: u64,
    /// total_detections / processed_frames, 0 for empty runs
    pub avg_detections_per_frame: f64,
    /// Wall-clock duration of the whole run, seconds
    pub processing_time: f64,
    /// Mean per-frame detection+annotation latency, seconds
    pub avg_frame_time: f64,
    /// processed_frames / processing_time
    pub fps_processed: f64,
    /// Input stream characteristics
    pub video_properties: VideoProperties,
}

impl ProcessingResult {
    /// Fold raw counters into final metrics, guarding empty runs against
    /// division by zero.
    pub fn finalize(
        properties: VideoProperties,
        processed_frames: u64,
        total_detections: u64,
        frame_times: &[f64],
        processing_time: f64,
    ) -> Self {
        let avg_frame_time = if frame_times.is_empty() {
            0.0
        } else {
            frame_times.iter().sum::<f64>() / frame_times.len() as f64
        };

        let avg_detections_per_frame = if processed_frames > 0 {
            total_detections as f64 / processed_frames as f64
        } else {
            0.0
        };

        let fps_processed = if processing_time > 0.0 {
            processed_frames as f64 / processing_time
        } else {
            0.0
        };

        Self {
            total_frames: properties.total_frames,
            processed_frames,
            total_detections,
            avg_detections_per_frame,
            processing_time,
            avg_frame_time,
            fps_processed,
            video_properties: properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_averages() {
        let props = VideoProperties::new(640, 480, 30, 150);
        let result = ProcessingResult::finalize(props, 150, 450, &[0.02, 0.04], 5.0);

        assert_eq!(result.total_frames, 150);
        assert_eq!(result.processed_frames, 150);
        assert_eq!(result.total_detections, 450);
        assert!((result.avg_detections_per_frame - 3.0).abs() < 1e-9);
        assert!((result.avg_frame_time - 0.03).abs() < 1e-9);
        assert!((result.fps_processed - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_finalize_empty_run() {
        let props = VideoProperties::new(640, 480, 30, 0);
        let result = ProcessingResult::finalize(props, 0, 0, &[], 0.0);

        assert_eq!(result.avg_detections_per_frame, 0.0);
        assert_eq!(result.avg_frame_time, 0.0);
        assert_eq!(result.fps_processed, 0.0);
    }
}
