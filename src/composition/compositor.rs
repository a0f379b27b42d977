use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::filters::{apply_adjustments, FilterSpec, SliderValues};
use crate::video::types::{Frame, Mask, Photo};

/// Everything one photo is made from
///
/// Passing this explicitly keeps the compositor free of UI state: whatever the
/// controls showed at the moment of capture is copied in here.
#[derive(Debug, Clone, Copy)]
pub struct CompositeRequest<'a> {
    pub frame: &'a Frame,
    pub filter: &'a FilterSpec,
    pub sliders: SliderValues,
    /// Foreground mask; `Some` switches on background removal
    pub mask: Option<&'a Mask>,
    /// Replacement background, only drawn in background-removal mode
    pub background: Option<&'a RgbaImage>,
    /// 0.0-1.0
    pub background_opacity: f32,
}

impl<'a> CompositeRequest<'a> {
    /// A plain filter pass over the frame
    pub fn new(frame: &'a Frame, filter: &'a FilterSpec, sliders: SliderValues) -> Self {
        Self {
            frame,
            filter,
            sliders,
            mask: None,
            background: None,
            background_opacity: 1.0,
        }
    }

    pub fn with_mask(mut self, mask: Option<&'a Mask>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_background(mut self, background: Option<&'a RgbaImage>, opacity: f32) -> Self {
        self.background = background;
        self.background_opacity = opacity;
        self
    }
}

/// Flattens a camera frame, its filter chain, and an optional matte and
/// background into a single photo
#[derive(Debug, Clone, Default)]
pub struct FrameCompositor;

impl FrameCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Compose and encode a photo
    pub fn compose(&self, request: &CompositeRequest<'_>) -> Result<Photo> {
        let surface = self.compose_frame(request);
        Photo::from_frame(&surface)
    }

    /// Compose without encoding
    ///
    /// The result always has the dimensions of `request.frame`.
    pub fn compose_frame(&self, request: &CompositeRequest<'_>) -> Frame {
        let (width, height) = request.frame.dimensions();

        let mut subject = request.frame.clone();
        apply_adjustments(&mut subject, &request.filter.chain(&request.sliders));

        let Some(mask) = request.mask else {
            // Drawing an opaque-or-not frame onto an empty surface is a copy
            return subject;
        };

        debug!(
            "Compositing {}x{} frame with mask (background: {})",
            width,
            height,
            request.background.is_some()
        );

        let mut surface = Frame::new_transparent(width, height);

        if let Some(background) = request.background {
            let opacity = request.background_opacity.clamp(0.0, 1.0);
            let scaled;
            let background = if background.dimensions() == (width, height) {
                background
            } else {
                scaled = imageops::resize(background, width, height, FilterType::Triangle);
                &scaled
            };
            draw_over(surface.as_image_mut(), background, 0, 0, opacity);
        }

        // Keep the subject only where the mask is opaque
        let mask = mask.fit_to(width, height);
        apply_matte(subject.as_image_mut(), &mask);

        draw_over(surface.as_image_mut(), subject.as_image(), 0, 0, 1.0);
        surface
    }
}

/// Multiply each pixel's alpha by the mask ("source-in")
fn apply_matte(image: &mut RgbaImage, mask: &Mask) {
    image
        .par_chunks_mut(4)
        .zip(mask.as_image().as_raw().par_iter())
        .for_each(|(px, &alpha)| {
            px[3] = ((px[3] as u16 * alpha as u16 + 127) / 255) as u8;
        });
}

/// Source-over blend `src` onto `dst` at offset `(x, y)`, clipped to `dst`
pub(crate) fn draw_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    let (dst_w, dst_h) = (dst.width() as i64, dst.height() as i64);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src.width() as i64).min(dst_w);
    let y1 = (y + src.height() as i64).min(dst_h);

    for dy in y0..y1 {
        for dx in x0..x1 {
            let s = src.get_pixel((dx - x) as u32, (dy - y) as u32).0;
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            d.0 = blend_pixel(d.0, s, opacity);
        }
    }
}

#[inline]
fn blend_pixel(dst: [u8; 4], src: [u8; 4], opacity: f32) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0 * opacity;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }

    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterCatalog;
    use image::Rgba;

    fn half_mask(width: u32, height: u32) -> Mask {
        Mask::from_fn(width, height, |x, _| image::Luma([if x < width / 2 { 255 } else { 0 }]))
    }

    #[test]
    fn test_no_mask_is_pure_filter_pass() {
        let frame = Frame::new_filled(6, 4, [200, 30, 90, 255]);
        let bw = FilterCatalog::builtin().resolve("bw");
        let background = RgbaImage::from_pixel(6, 4, Rgba([0, 0, 255, 255]));

        let request = CompositeRequest::new(&frame, &bw, SliderValues::default())
            .with_background(Some(&background), 1.0);
        let composed = FrameCompositor::new().compose_frame(&request);

        let mut expected = frame.clone();
        apply_adjustments(&mut expected, &bw.chain(&SliderValues::default()));
        assert_eq!(composed, expected);
    }

    #[test]
    fn test_mask_replaces_background() {
        let frame = Frame::new_filled(8, 4, [250, 250, 250, 255]);
        let normal = FilterCatalog::builtin().resolve("normal");
        let background = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        let mask = half_mask(8, 4);

        let request = CompositeRequest::new(&frame, &normal, SliderValues::default())
            .with_mask(Some(&mask))
            .with_background(Some(&background), 1.0);
        let composed = FrameCompositor::new().compose_frame(&request);

        assert_eq!(composed.dimensions(), (8, 4));
        assert_eq!(composed.get_pixel(0, 0), [250, 250, 250, 255]);
        assert_eq!(composed.get_pixel(7, 3), [0, 0, 255, 255]);
    }

    #[test]
    fn test_mask_without_background_is_transparent() {
        let frame = Frame::new_filled(4, 2, [10, 20, 30, 255]);
        let normal = FilterSpec::identity();
        let mask = half_mask(4, 2);

        let request = CompositeRequest::new(&frame, &normal, SliderValues::default()).with_mask(Some(&mask));
        let composed = FrameCompositor::new().compose_frame(&request);

        assert_eq!(composed.get_pixel(0, 1), [10, 20, 30, 255]);
        assert_eq!(composed.get_pixel(3, 1)[3], 0);
    }

    #[test]
    fn test_background_opacity_is_applied() {
        let frame = Frame::new_filled(2, 2, [255, 255, 255, 255]);
        let normal = FilterSpec::identity();
        let mask = Mask::new(image::GrayImage::new(2, 2));
        let background = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));

        let request = CompositeRequest::new(&frame, &normal, SliderValues::default())
            .with_mask(Some(&mask))
            .with_background(Some(&background), 0.5);
        let composed = FrameCompositor::new().compose_frame(&request);

        assert_eq!(composed.get_pixel(1, 1), [255, 0, 0, 128]);
    }

    #[test]
    fn test_small_mask_is_scaled_to_frame() {
        let frame = Frame::new_filled(10, 6, [40, 40, 40, 255]);
        let normal = FilterSpec::identity();
        let mask = Mask::opaque(2, 2);

        let request = CompositeRequest::new(&frame, &normal, SliderValues::default()).with_mask(Some(&mask));
        let composed = FrameCompositor::new().compose_frame(&request);

        assert_eq!(composed, frame);
    }

    #[test]
    fn test_compose_encodes_photo() {
        let frame = Frame::new_filled(5, 3, [1, 2, 3, 255]);
        let normal = FilterSpec::identity();
        let photo = FrameCompositor::new()
            .compose(&CompositeRequest::new(&frame, &normal, SliderValues::default()))
            .unwrap();

        assert_eq!((photo.width(), photo.height()), (5, 3));
        assert_eq!(photo.decode().unwrap(), frame);
    }

    #[test]
    fn test_draw_over_clips_to_destination() {
        let mut dst = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        draw_over(&mut dst, &src, 2, -1, 1.0);

        assert_eq!(dst.get_pixel(2, 0).0, [255, 255, 255, 255]);
        assert_eq!(dst.get_pixel(1, 0).0, [0, 0, 0, 255]);
        assert_eq!(dst.get_pixel(2, 1).0, [0, 0, 0, 255]);
    }
}
