//! Video stream properties.

use serde::{Deserialize, Serialize};

/// Input video characteristics, read once when the container is opened and
/// immutable for the job's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Integer frames per second
    pub fps: u32,
    /// Total frame count reported by the container
    pub total_frames: u64,
}

impl VideoProperties {
    pub fn new(width: u32, height: u32, fps: u32, total_frames: u64) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames,
        }
    }

    /// Duration derived from frame count and rate, 0 when fps is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0 {
            self.total_frames as f64 / self.fps as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let props = VideoProperties::new(640, 480, 30, 150);
        assert!((props.duration_seconds() - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_duration_zero_fps() {
        let props = VideoProperties::new(640, 480, 0, 150);
        assert_eq!(props.duration_seconds(), 0.0);
    }
}
