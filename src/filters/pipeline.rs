// Pixel math for filter chains, following the CSS Filter Effects definitions.

use rayon::prelude::*;
use tracing::debug;

use crate::filters::adjust::Adjustment;
use crate::video::types::Frame;

/// Per-pixel color transform, precomputed from an [`Adjustment`]
#[derive(Debug, Clone, Copy)]
enum ColorOp {
    /// Row-major 3x3 RGB matrix
    Matrix([f32; 9]),
    /// `c * slope + intercept` on every channel
    Linear { slope: f32, intercept: f32 },
}

impl ColorOp {
    fn from_adjustment(adjustment: &Adjustment) -> Option<Self> {
        let op = match *adjustment {
            Adjustment::Grayscale(amount) => ColorOp::Matrix(grayscale_matrix(amount)),
            Adjustment::Sepia(amount) => ColorOp::Matrix(sepia_matrix(amount)),
            Adjustment::Saturate(amount) => ColorOp::Matrix(saturate_matrix(amount)),
            Adjustment::HueRotate(degrees) => ColorOp::Matrix(hue_rotate_matrix(degrees)),
            Adjustment::Brightness(amount) => ColorOp::Linear {
                slope: amount.max(0.0),
                intercept: 0.0,
            },
            Adjustment::Contrast(amount) => {
                let amount = amount.max(0.0);
                ColorOp::Linear { slope: amount, intercept: 0.5 - 0.5 * amount }
            }
            Adjustment::Blur(_) => return None,
        };
        Some(op)
    }

    #[inline]
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match *self {
            ColorOp::Matrix(m) => [
                m[0] * rgb[0] + m[1] * rgb[1] + m[2] * rgb[2],
                m[3] * rgb[0] + m[4] * rgb[1] + m[5] * rgb[2],
                m[6] * rgb[0] + m[7] * rgb[1] + m[8] * rgb[2],
            ],
            ColorOp::Linear { slope, intercept } => [
                rgb[0] * slope + intercept,
                rgb[1] * slope + intercept,
                rgb[2] * slope + intercept,
            ],
        };
        [out[0].clamp(0.0, 1.0), out[1].clamp(0.0, 1.0), out[2].clamp(0.0, 1.0)]
    }
}

fn grayscale_matrix(amount: f32) -> [f32; 9] {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    [
        0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s,
        0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s,
        0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s,
    ]
}

fn sepia_matrix(amount: f32) -> [f32; 9] {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    [
        0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s,
        0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s,
        0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s,
    ]
}

fn saturate_matrix(amount: f32) -> [f32; 9] {
    let s = amount.max(0.0);
    [
        0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s,
        0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s,
        0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s,
    ]
}

fn hue_rotate_matrix(degrees: f32) -> [f32; 9] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        0.213 + cos * 0.787 - sin * 0.213,
        0.715 - cos * 0.715 - sin * 0.715,
        0.072 - cos * 0.072 + sin * 0.928,
        0.213 - cos * 0.213 + sin * 0.143,
        0.715 + cos * 0.285 + sin * 0.140,
        0.072 - cos * 0.072 - sin * 0.283,
        0.213 - cos * 0.213 - sin * 0.787,
        0.715 - cos * 0.715 + sin * 0.715,
        0.072 + cos * 0.928 + sin * 0.072,
    ]
}

#[inline]
fn to_unit(channel: u8) -> f32 {
    channel as f32 / 255.0
}

#[inline]
fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn apply_color_ops(frame: &mut Frame, ops: &[ColorOp]) {
    if ops.is_empty() {
        return;
    }

    frame.as_image_mut().par_chunks_mut(4).for_each(|px| {
        let mut rgb = [to_unit(px[0]), to_unit(px[1]), to_unit(px[2])];
        for op in ops {
            rgb = op.apply(rgb);
        }
        px[0] = to_channel(rgb[0]);
        px[1] = to_channel(rgb[1]);
        px[2] = to_channel(rgb[2]);
    });
}

fn apply_blur(frame: &mut Frame, sigma: f32) {
    let blurred = image::imageops::blur(frame.as_image(), sigma);
    *frame = Frame::new(blurred);
}

/// Apply an ordered adjustment chain to a frame in place
///
/// Color operations between two blurs are fused into a single pass over the
/// pixels; channels are clamped after every operation. Identity adjustments
/// are skipped, so an all-default chain leaves the frame bit-for-bit intact.
pub fn apply_adjustments(frame: &mut Frame, chain: &[Adjustment]) {
    let mut pending: Vec<ColorOp> = Vec::new();

    for adjustment in chain.iter().filter(|a| !a.is_identity()) {
        match adjustment {
            Adjustment::Blur(sigma) => {
                apply_color_ops(frame, &pending);
                pending.clear();
                debug!("Blurring frame with sigma {:.2}", sigma);
                apply_blur(frame, *sigma);
            }
            other => {
                if let Some(op) = ColorOp::from_adjustment(other) {
                    pending.push(op);
                }
            }
        }
    }

    apply_color_ops(frame, &pending);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: [u8; 4]) -> Frame {
        Frame::new_filled(4, 4, color)
    }

    #[test]
    fn test_grayscale_uses_luma_weights() {
        let mut frame = solid([255, 0, 0, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Grayscale(1.0)]);
        assert_eq!(frame.get_pixel(0, 0), [54, 54, 54, 255]);
    }

    #[test]
    fn test_identity_chain_keeps_pixels() {
        let original = solid([12, 200, 99, 180]);
        let mut frame = original.clone();
        apply_adjustments(
            &mut frame,
            &[
                Adjustment::Brightness(1.0),
                Adjustment::Contrast(1.0),
                Adjustment::Blur(0.0),
                Adjustment::HueRotate(0.0),
                Adjustment::Saturate(1.0),
            ],
        );
        assert_eq!(frame, original);
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let mut frame = solid([100, 200, 50, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Brightness(1.5)]);
        assert_eq!(frame.get_pixel(0, 0), [150, 255, 75, 255]);
    }

    #[test]
    fn test_contrast_pivots_on_mid_gray() {
        let mut frame = solid([128, 0, 255, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Contrast(0.5)]);
        let px = frame.get_pixel(0, 0);
        assert_eq!(px[0], 128);
        assert_eq!(px[1], 64);
        assert_eq!(px[2], 191);
    }

    #[test]
    fn test_sepia_full_on_white() {
        let mut frame = solid([255, 255, 255, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Sepia(1.0)]);
        // Rows sum to 1.351, 1.203 and 0.937
        assert_eq!(frame.get_pixel(0, 0), [255, 255, 239, 255]);
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        let mut frame = solid([30, 160, 220, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Saturate(0.0)]);
        let px = frame.get_pixel(0, 0);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn test_hue_rotate_keeps_gray() {
        let mut frame = solid([90, 90, 90, 255]);
        apply_adjustments(&mut frame, &[Adjustment::HueRotate(180.0)]);
        let px = frame.get_pixel(0, 0);
        for channel in &px[..3] {
            assert!((*channel as i32 - 90).abs() <= 1);
        }
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let mut frame = Frame::new_filled(9, 7, [0, 0, 0, 255]);
        frame.set_pixel(4, 3, [255, 255, 255, 255]);
        apply_adjustments(&mut frame, &[Adjustment::Blur(2.0)]);

        assert_eq!(frame.dimensions(), (9, 7));
        let center = frame.get_pixel(4, 3);
        assert!(center[0] < 255);
        assert!(frame.get_pixel(5, 3)[0] > 0);
    }
}
