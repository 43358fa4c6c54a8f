//! Raster frame type shared across decode, detection, and annotation.

use image::RgbImage;

use crate::error::{MediaError, MediaResult};

/// One decoded RGB8 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap an existing raster.
    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into an RGB8 frame.
    pub fn decode(data: &[u8]) -> MediaResult<Self> {
        let image = image::load_from_memory(data)
            .map_err(|e| MediaError::invalid_image(format!("could not decode image: {}", e)))?;
        Ok(Self {
            image: image.to_rgb8(),
        })
    }

    /// Build a frame from raw RGB bytes (`width * height * 3`, row-major).
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(MediaError::invalid_image(format!(
                "raw frame length {} does not match {}x{}x3",
                data.len(),
                width,
                height
            )));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| MediaError::invalid_image("failed to build frame buffer"))?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Raw RGB bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }
}
