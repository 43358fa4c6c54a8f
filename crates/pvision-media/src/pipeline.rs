//! The frame processing pipeline: decode, detect, annotate, encode.
//!
//! [`VideoPipeline::process`] is generic over [`FrameSource`]/[`FrameSink`]
//! and carries all stride, progress, and error-tolerance behavior;
//! [`VideoPipeline::run`] wires it to the OpenCV file reader and writer.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::counter;
use tracing::{info, warn};

use pvision_models::{DetectionSet, ProcessingResult};

use crate::annotate::{annotate, draw_info_band, OverlayInfo};
use crate::detection::ObjectDetector;
use crate::error::MediaResult;
use crate::video_io::{FrameSink, FrameSource};

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detect on every Nth frame; the others pass through unannotated.
    pub frame_skip: u64,
    /// Log progress every this many processed frames.
    pub progress_every: u64,
    /// Yield to the runtime every this many processed frames.
    pub yield_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_skip: 1,
            progress_every: 100,
            yield_every: 10,
        }
    }
}

/// Path-level processing seam. The job layer depends on this trait so tests
/// can substitute the whole pipeline.
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    /// Process `input` into an annotated `output` file.
    async fn process_video(&self, input: &Path, output: &Path) -> MediaResult<ProcessingResult>;
}

/// Runs detection over a video stream and produces the annotated output.
pub struct VideoPipeline {
    detector: Arc<dyn ObjectDetector>,
    config: PipelineConfig,
}

#[async_trait]
impl VideoProcessor for VideoPipeline {
    async fn process_video(&self, input: &Path, output: &Path) -> MediaResult<ProcessingResult> {
        self.run(input, output).await
    }
}

impl VideoPipeline {
    pub fn new(detector: Arc<dyn ObjectDetector>, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    /// Process a video file into an annotated output file.
    #[cfg(feature = "opencv")]
    pub async fn run(&self, input: &Path, output: &Path) -> MediaResult<ProcessingResult> {
        use crate::error::MediaError;
        use crate::video_io::{VideoFileReader, VideoFileWriter};

        if !input.exists() {
            return Err(MediaError::file_not_found(input));
        }

        let mut source = VideoFileReader::open(input)?;
        let properties = source.properties();
        let mut sink = match VideoFileWriter::create(output, properties) {
            Ok(sink) => sink,
            Err(e) => {
                let _ = source.release();
                return Err(e);
            }
        };

        info!(
            input = %input.display(),
            output = %output.display(),
            width = properties.width,
            height = properties.height,
            fps = properties.fps,
            total_frames = properties.total_frames,
            duration_seconds = properties.duration_seconds(),
            "starting video processing"
        );

        self.process(&mut source, &mut sink).await
    }

    /// Process a video file into an annotated output file.
    #[cfg(not(feature = "opencv"))]
    pub async fn run(&self, _input: &Path, _output: &Path) -> MediaResult<ProcessingResult> {
        Err(crate::error::MediaError::internal(
            "OpenCV feature not enabled",
        ))
    }

    /// Run the processing loop over arbitrary frame streams.
    ///
    /// Both streams are released on every exit path; a processing error takes
    /// precedence over release errors.
    pub async fn process<S, K>(&self, source: &mut S, sink: &mut K) -> MediaResult<ProcessingResult>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let outcome = self.process_inner(source, sink).await;
        let source_released = source.release();
        let sink_released = sink.release();

        let result = outcome?;
        source_released?;
        sink_released?;
        Ok(result)
    }

    async fn process_inner<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> MediaResult<ProcessingResult>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let properties = source.properties();
        let frame_skip = self.config.frame_skip.max(1);
        let progress_every = self.config.progress_every.max(1);
        let yield_every = self.config.yield_every.max(1);

        let started = Instant::now();
        let mut frame_index: u64 = 0;
        let mut processed_frames: u64 = 0;
        let mut total_detections: u64 = 0;
        let mut frame_times: Vec<f64> = Vec::new();

        while let Some(mut frame) = source.read_frame()? {
            if frame_index % frame_skip == 0 {
                let detect_started = Instant::now();
                let detections = match self.detector.detect(&frame) {
                    Ok(detections) => detections,
                    Err(e) => {
                        warn!(
                            frame = frame_index,
                            error = %e,
                            "detection failed, continuing without detections"
                        );
                        counter!("pvision_frame_detection_failures_total").increment(1);
                        DetectionSet::empty()
                    }
                };
                let frame_time = detect_started.elapsed().as_secs_f64();

                annotate(&mut frame, &detections);
                draw_info_band(
                    &mut frame,
                    &OverlayInfo {
                        frame_index,
                        detection_count: detections.len(),
                        frame_time,
                    },
                );
                sink.write_frame(&frame)?;

                processed_frames += 1;
                total_detections += detections.len() as u64;
                frame_times.push(frame_time);
                counter!("pvision_frames_processed_total").increment(1);
                counter!("pvision_detections_total").increment(detections.len() as u64);

                if processed_frames % progress_every == 0 {
                    let pct = if properties.total_frames > 0 {
                        frame_index as f64 / properties.total_frames as f64 * 100.0
                    } else {
                        0.0
                    };
                    info!(
                        processed = processed_frames,
                        frame = frame_index,
                        total = properties.total_frames,
                        "progress: {:.1}%",
                        pct
                    );
                }
                if processed_frames % yield_every == 0 {
                    tokio::task::yield_now().await;
                }
            } else {
                sink.write_frame(&frame)?;
            }

            frame_index += 1;
        }

        let processing_time = started.elapsed().as_secs_f64();
        let result = ProcessingResult::finalize(
            properties,
            processed_frames,
            total_detections,
            &frame_times,
            processing_time,
        );
        info!(
            processed = result.processed_frames,
            detections = result.total_detections,
            "video processing complete in {:.2}s",
            result.processing_time
        );

        Ok(result)
    }
}
