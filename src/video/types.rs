use std::io::Cursor;
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, GrayImage, ImageBuffer, ImageEncoder, Luma, Rgba, RgbaImage};

use crate::error::{ExportError, Result};

/// A single camera frame
///
/// Thin wrapper around an RGBA image buffer. Frames are produced by a
/// [`FrameSource`](crate::video::FrameSource) on every tick and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbaImage,
}

impl Frame {
    /// Create a new frame from an RGBA image buffer
    pub fn new(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// Create a fully transparent frame, used as an empty drawing surface
    pub fn new_transparent(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgba(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates as an RGBA array
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        self.buffer.put_pixel(x, y, Rgba(color));
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }

    pub fn into_image(self) -> RgbaImage {
        self.buffer
    }

    /// Return a copy scaled to exactly `width` x `height`
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Frame::new(imageops::resize(&self.buffer, width, height, FilterType::Triangle))
    }

    /// Encode the frame as PNG bytes
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.buffer)
    }
}

/// Per-pixel foreground alpha produced by a segmentation engine
///
/// 255 means "person", 0 means "background".
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    alpha: GrayImage,
}

impl Mask {
    pub fn new(alpha: GrayImage) -> Self {
        Self { alpha }
    }

    /// A mask that keeps every pixel
    pub fn opaque(width: u32, height: u32) -> Self {
        Self { alpha: ImageBuffer::from_pixel(width, height, Luma([255])) }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: FnMut(u32, u32) -> Luma<u8>,
    {
        Self { alpha: ImageBuffer::from_fn(width, height, f) }
    }

    pub fn width(&self) -> u32 {
        self.alpha.width()
    }

    pub fn height(&self) -> u32 {
        self.alpha.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.alpha.dimensions()
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.alpha.get_pixel(x, y).0[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.alpha
    }

    /// Scale the mask to the given size; no-op when it already matches
    pub fn fit_to(&self, width: u32, height: u32) -> Mask {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Mask::new(imageops::resize(&self.alpha, width, height, FilterType::Triangle))
    }
}

/// A finished, encoded photo
///
/// Photos are immutable PNG byte buffers. Cloning is cheap.
#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    png: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl Photo {
    /// Encode a composed frame into a photo
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let png = frame.encode_png()?;
        Ok(Self {
            png: png.into(),
            width: frame.width(),
            height: frame.height(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Decode the photo back into an RGBA frame
    pub fn decode(&self) -> Result<Frame> {
        let image = image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)?;
        Ok(Frame::new(image.to_rgba8()))
    }
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    PngEncoder::new(&mut cursor)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| ExportError::EncodingFailed { reason: e.to_string() })?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_preserves_pixels() {
        let mut frame = Frame::new_filled(4, 3, [10, 20, 30, 255]);
        frame.set_pixel(1, 1, [200, 100, 50, 128]);

        let photo = Photo::from_frame(&frame).unwrap();
        assert_eq!((photo.width(), photo.height()), (4, 3));
        assert_eq!(photo.decode().unwrap(), frame);
    }

    #[test]
    fn test_mask_fit_to_scales() {
        let mask = Mask::opaque(2, 2);
        let fitted = mask.fit_to(8, 6);
        assert_eq!(fitted.dimensions(), (8, 6));
        assert_eq!(fitted.alpha_at(7, 5), 255);
    }

    #[test]
    fn test_resized_same_size_is_identity() {
        let frame = Frame::new_filled(5, 5, [1, 2, 3, 255]);
        assert_eq!(frame.resized(5, 5), frame);
    }
}
