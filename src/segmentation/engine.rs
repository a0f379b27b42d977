use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::video::types::{Frame, Mask};

/// A person-segmentation model
///
/// Engines are blocking: the [`SegmentationAdapter`](super::SegmentationAdapter)
/// moves every call onto the blocking thread pool and serializes requests, so
/// implementations never see two calls at once.
pub trait SegmentationEngine: Send + Sync {
    /// Returns the unique name of this engine
    fn name(&self) -> &str;

    /// Load weights or warm up. Called at most once, before any `segment` call.
    fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Produce a foreground mask for the frame
    ///
    /// The mask may be smaller than the frame; callers scale it up.
    fn segment(&self, frame: &Frame) -> Result<Mask>;
}

/// Settings for [`ChromaKeyEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChromaKeySettings {
    /// Backdrop color that counts as "not the person"
    pub key_color: [u8; 3],

    /// Normalized RGB distance under which a pixel is fully background (0.0-1.0)
    pub tolerance: f32,

    /// Width of the soft edge above `tolerance` (0.0-1.0)
    pub softness: f32,
}

impl Default for ChromaKeySettings {
    fn default() -> Self {
        Self {
            key_color: [0, 177, 64],
            tolerance: 0.35,
            softness: 0.1,
        }
    }
}

/// Green-screen segmentation
///
/// Marks pixels near the key color as background, with a linear ramp of
/// `softness` between fully keyed and fully kept.
pub struct ChromaKeyEngine {
    settings: ChromaKeySettings,
}

impl ChromaKeyEngine {
    pub fn new(settings: ChromaKeySettings) -> Self {
        Self { settings }
    }

    fn alpha_for(&self, rgb: [u8; 3]) -> u8 {
        let [kr, kg, kb] = self.settings.key_color;
        let dr = rgb[0] as f32 - kr as f32;
        let dg = rgb[1] as f32 - kg as f32;
        let db = rgb[2] as f32 - kb as f32;
        let distance = (dr * dr + dg * dg + db * db).sqrt() / (255.0 * 3f32.sqrt());

        let tolerance = self.settings.tolerance;
        let softness = self.settings.softness;

        if distance <= tolerance {
            0
        } else if softness <= 0.0 || distance >= tolerance + softness {
            255
        } else {
            (((distance - tolerance) / softness) * 255.0).round() as u8
        }
    }
}

impl Default for ChromaKeyEngine {
    fn default() -> Self {
        Self::new(ChromaKeySettings::default())
    }
}

impl SegmentationEngine for ChromaKeyEngine {
    fn name(&self) -> &str {
        "chroma-key"
    }

    fn segment(&self, frame: &Frame) -> Result<Mask> {
        let image = frame.as_image();
        Ok(Mask::from_fn(frame.width(), frame.height(), |x, y| {
            let px = image.get_pixel(x, y).0;
            image::Luma([self.alpha_for([px[0], px[1], px[2]])])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_color_is_background() {
        let engine = ChromaKeyEngine::default();
        let mut frame = Frame::new_filled(4, 4, [0, 177, 64, 255]);
        frame.set_pixel(2, 2, [230, 190, 170, 255]);

        let mask = engine.segment(&frame).unwrap();
        assert_eq!(mask.dimensions(), (4, 4));
        assert_eq!(mask.alpha_at(0, 0), 0);
        assert_eq!(mask.alpha_at(2, 2), 255);
    }

    #[test]
    fn test_soft_edge_is_partial() {
        let engine = ChromaKeyEngine::new(ChromaKeySettings {
            key_color: [0, 0, 0],
            tolerance: 0.0,
            softness: 1.0,
        });
        let alpha = engine.alpha_for([128, 128, 128]);
        assert!(alpha > 0 && alpha < 255);
    }
}
