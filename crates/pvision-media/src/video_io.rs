//! Sequential video decode and encode.
//!
//! The pipeline is written against the [`FrameSource`]/[`FrameSink`] traits;
//! the OpenCV-backed file implementations live behind the `opencv` feature so
//! the processing loop stays testable without a native video stack.

use pvision_models::VideoProperties;

use crate::error::MediaResult;
use crate::frame::Frame;

/// Sequential source of decoded frames.
pub trait FrameSource: Send {
    /// Stream characteristics, read once when the container was opened.
    fn properties(&self) -> VideoProperties;

    /// Decode the next frame in input order; `None` at end of stream.
    fn read_frame(&mut self) -> MediaResult<Option<Frame>>;

    /// Release the underlying decoder. Idempotent.
    fn release(&mut self) -> MediaResult<()>;
}

/// Sequential sink for encoded frames.
pub trait FrameSink: Send {
    /// Encode one frame at the end of the output stream.
    fn write_frame(&mut self, frame: &Frame) -> MediaResult<()>;

    /// Flush and release the underlying encoder. Idempotent.
    fn release(&mut self) -> MediaResult<()>;
}

/// Output container fourcc. A widely playable MPEG-4 variant; the output
/// stream always carries the input's exact resolution and frame rate.
#[cfg(feature = "opencv")]
pub const OUTPUT_FOURCC: [char; 4] = ['m', 'p', '4', 'v'];

/// File-backed frame source decoding through OpenCV.
#[cfg(feature = "opencv")]
pub struct VideoFileReader {
    capture: opencv::videoio::VideoCapture,
    properties: VideoProperties,
    released: bool,
}

#[cfg(feature = "opencv")]
impl VideoFileReader {
    /// Open a video file and read its properties.
    pub fn open(path: impl AsRef<std::path::Path>) -> MediaResult<Self> {
        use opencv::prelude::{VideoCaptureTrait, VideoCaptureTraitConst};
        use opencv::videoio::{self, VideoCapture};

        use crate::error::MediaError;

        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| MediaError::open_failed(path))?;

        let mut capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| MediaError::read_failed(format!("open {}: {}", path.display(), e)))?;

        if !capture.is_opened().unwrap_or(false) {
            let _ = capture.release();
            return Err(MediaError::open_failed(path));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0) as u32;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
        let total_frames = capture.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0) as u64;

        Ok(Self {
            capture,
            properties: VideoProperties::new(width, height, fps, total_frames),
            released: false,
        })
    }
}

#[cfg(feature = "opencv")]
impl FrameSource for VideoFileReader {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn read_frame(&mut self) -> MediaResult<Option<Frame>> {
        use opencv::core::Mat;
        use opencv::imgproc;
        use opencv::prelude::{MatTraitConst, VideoCaptureTrait};

        use crate::error::MediaError;

        let mut bgr = Mat::default();
        let got = self
            .capture
            .read(&mut bgr)
            .map_err(|e| MediaError::read_failed(e.to_string()))?;
        if !got || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB)
            .map_err(|e| MediaError::read_failed(format!("color conversion: {}", e)))?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb
            .data_bytes()
            .map_err(|e| MediaError::read_failed(format!("frame data: {}", e)))?
            .to_vec();

        Frame::from_raw(width, height, data).map(Some)
    }

    fn release(&mut self) -> MediaResult<()> {
        use opencv::prelude::VideoCaptureTrait;

        use crate::error::MediaError;

        if self.released {
            return Ok(());
        }
        self.released = true;
        self.capture
            .release()
            .map_err(|e| MediaError::read_failed(format!("release capture: {}", e)))
    }
}

/// File-backed frame sink encoding through OpenCV.
#[cfg(feature = "opencv")]
pub struct VideoFileWriter {
    writer: opencv::videoio::VideoWriter,
    properties: VideoProperties,
    released: bool,
}

#[cfg(feature = "opencv")]
impl VideoFileWriter {
    /// Create an output container matching the input stream's width, height,
    /// and frame rate exactly.
    pub fn create(
        path: impl AsRef<std::path::Path>,
        properties: VideoProperties,
    ) -> MediaResult<Self> {
        use opencv::core::Size;
        use opencv::prelude::{VideoWriterTrait, VideoWriterTraitConst};
        use opencv::videoio::VideoWriter;

        use crate::error::MediaError;

        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| MediaError::create_failed(path))?;

        let [c1, c2, c3, c4] = OUTPUT_FOURCC;
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)
            .map_err(|e| MediaError::write_failed(format!("fourcc: {}", e)))?;

        let mut writer = VideoWriter::new(
            path_str,
            fourcc,
            properties.fps as f64,
            Size::new(properties.width as i32, properties.height as i32),
            true,
        )
        .map_err(|e| MediaError::write_failed(format!("create {}: {}", path.display(), e)))?;

        if !writer.is_opened().unwrap_or(false) {
            let _ = writer.release();
            return Err(MediaError::create_failed(path));
        }

        Ok(Self {
            writer,
            properties,
            released: false,
        })
    }
}

#[cfg(feature = "opencv")]
impl FrameSink for VideoFileWriter {
    fn write_frame(&mut self, frame: &Frame) -> MediaResult<()> {
        use opencv::core::{Mat, Mat_AUTO_STEP, CV_8UC3};
        use opencv::imgproc;
        use opencv::prelude::VideoWriterTrait;

        use crate::error::MediaError;

        if frame.width() != self.properties.width || frame.height() != self.properties.height {
            return Err(MediaError::write_failed(format!(
                "frame size {}x{} does not match stream {}x{}",
                frame.width(),
                frame.height(),
                self.properties.width,
                self.properties.height
            )));
        }

        let data = frame.as_raw();
        // The Mat view borrows the frame bytes only for the conversion below.
        let rgb = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                frame.height() as i32,
                frame.width() as i32,
                CV_8UC3,
                data.as_ptr() as *mut std::ffi::c_void,
                Mat_AUTO_STEP,
            )
        }
        .map_err(|e| MediaError::write_failed(format!("wrap frame: {}", e)))?;

        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)
            .map_err(|e| MediaError::write_failed(format!("color conversion: {}", e)))?;

        self.writer
            .write(&bgr)
            .map_err(|e| MediaError::write_failed(e.to_string()))
    }

    fn release(&mut self) -> MediaResult<()> {
        use opencv::prelude::VideoWriterTrait;

        use crate::error::MediaError;

        if self.released {
            return Ok(());
        }
        self.released = true;
        self.writer
            .release()
            .map_err(|e| MediaError::write_failed(format!("release writer: {}", e)))
    }
}
