use serde::{Deserialize, Serialize};

/// A single image adjustment, in CSS filter units
///
/// Fractions are expressed as `1.0 == 100%`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "amount", rename_all = "kebab-case")]
pub enum Adjustment {
    Grayscale(f32),
    Sepia(f32),
    Brightness(f32),
    Contrast(f32),
    /// Gaussian standard deviation in pixels
    Blur(f32),
    /// Degrees
    HueRotate(f32),
    Saturate(f32),
}

impl Adjustment {
    /// True when applying this adjustment leaves every pixel untouched
    pub fn is_identity(&self) -> bool {
        match *self {
            Adjustment::Grayscale(a) | Adjustment::Sepia(a) => a <= 0.0,
            Adjustment::Brightness(a) | Adjustment::Contrast(a) | Adjustment::Saturate(a) => a == 1.0,
            Adjustment::Blur(px) => px <= 0.0,
            Adjustment::HueRotate(deg) => deg.rem_euclid(360.0) == 0.0,
        }
    }

    pub fn is_blur(&self) -> bool {
        matches!(self, Adjustment::Blur(_))
    }
}

/// A named, immutable filter preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub name: String,
    pub adjustments: Vec<Adjustment>,
}

impl FilterSpec {
    pub fn new<S: Into<String>>(name: S, adjustments: Vec<Adjustment>) -> Self {
        Self { name: name.into(), adjustments }
    }

    /// The "normal" preset that leaves frames alone
    pub fn identity() -> Self {
        Self::new("normal", Vec::new())
    }

    /// The full ordered adjustment chain: the preset first, then the sliders
    pub fn chain(&self, sliders: &SliderValues) -> Vec<Adjustment> {
        let mut chain = self.adjustments.clone();
        chain.extend(sliders.to_adjustments());
        chain
    }
}

/// Manual slider adjustments layered on top of a preset
///
/// Units match the booth's sliders: percentages, pixels and degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderValues {
    pub brightness: f32,
    pub contrast: f32,
    pub blur: f32,
    pub hue: f32,
    pub saturate: f32,
}

pub const BRIGHTNESS_RANGE: (f32, f32) = (50.0, 150.0);
pub const CONTRAST_RANGE: (f32, f32) = (50.0, 150.0);
pub const BLUR_RANGE: (f32, f32) = (0.0, 5.0);
pub const HUE_RANGE: (f32, f32) = (0.0, 360.0);
pub const SATURATE_RANGE: (f32, f32) = (50.0, 200.0);

impl Default for SliderValues {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            blur: 0.0,
            hue: 0.0,
            saturate: 100.0,
        }
    }
}

impl SliderValues {
    /// Clamp every slider into its supported range
    pub fn clamped(self) -> Self {
        fn clamp(v: f32, (lo, hi): (f32, f32)) -> f32 {
            if v.is_nan() { lo } else { v.clamp(lo, hi) }
        }

        Self {
            brightness: clamp(self.brightness, BRIGHTNESS_RANGE),
            contrast: clamp(self.contrast, CONTRAST_RANGE),
            blur: clamp(self.blur, BLUR_RANGE),
            hue: clamp(self.hue, HUE_RANGE),
            saturate: clamp(self.saturate, SATURATE_RANGE),
        }
    }

    /// Slider values in fixed application order:
    /// brightness, contrast, blur, hue-rotate, saturate
    pub fn to_adjustments(&self) -> [Adjustment; 5] {
        [
            Adjustment::Brightness(self.brightness / 100.0),
            Adjustment::Contrast(self.contrast / 100.0),
            Adjustment::Blur(self.blur),
            Adjustment::HueRotate(self.hue),
            Adjustment::Saturate(self.saturate / 100.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sliders_are_identity() {
        let sliders = SliderValues::default();
        assert!(sliders.to_adjustments().iter().all(Adjustment::is_identity));
    }

    #[test]
    fn test_chain_puts_preset_before_sliders() {
        let spec = FilterSpec::new("bw", vec![Adjustment::Grayscale(1.0)]);
        let chain = spec.chain(&SliderValues::default());

        assert_eq!(chain.len(), 6);
        assert_eq!(chain[0], Adjustment::Grayscale(1.0));
        assert_eq!(chain[1], Adjustment::Brightness(1.0));
        assert_eq!(chain[5], Adjustment::Saturate(1.0));
    }

    #[test]
    fn test_sliders_are_clamped() {
        let wild = SliderValues {
            brightness: 400.0,
            contrast: -3.0,
            blur: 99.0,
            hue: f32::NAN,
            saturate: 10.0,
        }
        .clamped();

        assert_eq!(wild.brightness, 150.0);
        assert_eq!(wild.contrast, 50.0);
        assert_eq!(wild.blur, 5.0);
        assert_eq!(wild.hue, 0.0);
        assert_eq!(wild.saturate, 50.0);
    }

    #[test]
    fn test_full_hue_turn_is_identity() {
        assert!(Adjustment::HueRotate(360.0).is_identity());
        assert!(!Adjustment::HueRotate(180.0).is_identity());
    }
}
