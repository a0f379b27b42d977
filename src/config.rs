use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    assets::BackgroundAsset,
    composition::caption::{parse_hex_color, CaptionSpec, FONT_SIZE_RANGE},
    composition::session::CaptureSettings,
    composition::strip::StripOrientation,
    error::{ConfigError, Result},
    filters::{FilterCatalog, SliderValues, IDENTITY_FILTER},
    segmentation::ChromaKeySettings,
};

/// Main configuration for the photo booth
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture defaults
    pub capture: CaptureConfig,

    /// Built-in chroma-key segmentation settings
    pub segmentation: ChromaKeySettings,

    /// Strip layout and export settings
    pub strip: StripConfig,

    /// Caption defaults
    pub caption: CaptionConfig,

    /// Background image catalogs
    pub backgrounds: BackgroundsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.capture.validate()?;
        validate_chroma_key(&self.segmentation)?;
        self.strip.validate()?;
        self.caption.validate()?;
        Ok(())
    }
}

fn invalid<K: Into<String>, V: ToString>(key: K, value: V) -> crate::error::BoothError {
    ConfigError::InvalidValue { key: key.into(), value: value.to_string() }.into()
}

fn validate_chroma_key(settings: &ChromaKeySettings) -> Result<()> {
    if !(0.0..=1.0).contains(&settings.tolerance) {
        return Err(invalid("segmentation.tolerance", settings.tolerance));
    }
    if !(0.0..=1.0).contains(&settings.softness) {
        return Err(invalid("segmentation.softness", settings.softness));
    }
    Ok(())
}

/// Capture defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Filter preset selected at startup
    pub default_filter: String,

    /// Start with background removal switched on
    pub remove_background: bool,

    /// Capture background to show behind the subject
    pub background: Option<String>,

    /// Whether the capture background is drawn at all
    pub background_visible: bool,

    /// Capture background opacity (0.0-1.0)
    pub background_opacity: f32,

    /// Give up on a segmentation call after this many milliseconds (0 = wait forever)
    pub segmentation_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_filter: IDENTITY_FILTER.to_string(),
            remove_background: false,
            background: Some("bg1".to_string()),
            background_visible: false,
            background_opacity: 1.0,
            segmentation_timeout_ms: 10_000,
        }
    }
}

impl CaptureConfig {
    fn validate(&self) -> Result<()> {
        if !FilterCatalog::builtin().has_filter(&self.default_filter) {
            return Err(invalid("capture.default_filter", &self.default_filter));
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(invalid("capture.background_opacity", self.background_opacity));
        }
        Ok(())
    }

    pub fn segmentation_timeout(&self) -> Option<Duration> {
        (self.segmentation_timeout_ms > 0).then(|| Duration::from_millis(self.segmentation_timeout_ms))
    }

    /// Initial capture settings
    pub fn to_settings(&self) -> CaptureSettings {
        CaptureSettings {
            filter: self.default_filter.clone(),
            sliders: SliderValues::default(),
            remove_background: self.remove_background,
            background: self.background.clone(),
            background_visible: self.background_visible,
            background_opacity: self.background_opacity,
        }
    }
}

/// Strip layout and export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub orientation: StripOrientation,

    /// Width of each photo cell in pixels
    pub photo_size: u32,

    /// Border around the photos
    pub padding: u32,

    /// Space between photos
    pub gap: u32,

    /// Extra space below the photos where the caption usually sits
    pub caption_band: u32,

    /// Solid `#rrggbb` color used when no background image is chosen
    pub background_color: Option<String>,

    pub export_file_name: String,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            orientation: StripOrientation::Vertical,
            photo_size: 320,
            padding: 16,
            gap: 12,
            caption_band: 64,
            background_color: None,
            export_file_name: "photo-strip.png".to_string(),
        }
    }
}

impl StripConfig {
    fn validate(&self) -> Result<()> {
        if self.photo_size == 0 || self.photo_size > 4096 {
            return Err(invalid("strip.photo_size", self.photo_size));
        }
        if self.padding > 1024 {
            return Err(invalid("strip.padding", self.padding));
        }
        if self.gap > 1024 {
            return Err(invalid("strip.gap", self.gap));
        }
        if self.caption_band > 4096 {
            return Err(invalid("strip.caption_band", self.caption_band));
        }
        if let Some(color) = &self.background_color {
            if parse_hex_color(color).is_none() {
                return Err(invalid("strip.background_color", color));
            }
        }
        let name = self.export_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || !name.to_lowercase().ends_with(".png") {
            return Err(invalid("strip.export_file_name", &self.export_file_name));
        }
        Ok(())
    }
}

/// Caption defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub text: String,

    /// `#rrggbb`
    pub color: String,

    pub bold: bool,

    pub font_family: String,

    /// 10-28 px
    pub font_size: f32,

    /// Extra directory scanned for font files
    pub fonts_dir: Option<PathBuf>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: "#000000".to_string(),
            bold: false,
            font_family: "Arial".to_string(),
            font_size: 14.0,
            fonts_dir: None,
        }
    }
}

impl CaptionConfig {
    fn validate(&self) -> Result<()> {
        if parse_hex_color(&self.color).is_none() {
            return Err(invalid("caption.color", &self.color));
        }
        if !(FONT_SIZE_RANGE.0..=FONT_SIZE_RANGE.1).contains(&self.font_size) {
            return Err(invalid("caption.font_size", self.font_size));
        }
        if self.font_family.trim().is_empty() {
            return Err(invalid("caption.font_family", &self.font_family));
        }
        Ok(())
    }

    /// Caption at the default position with these styles
    pub fn to_spec(&self) -> Result<CaptionSpec> {
        let color = parse_hex_color(&self.color).ok_or_else(|| invalid("caption.color", &self.color))?;
        Ok(CaptionSpec {
            text: self.text.clone(),
            color,
            bold: self.bold,
            font_family: self.font_family.clone(),
            ..CaptionSpec::default()
        }
        .with_font_size(self.font_size))
    }
}

/// Background image catalogs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundsConfig {
    /// Images that can replace the camera background
    pub capture: Vec<BackgroundAsset>,

    /// Images that can decorate the strip
    pub strip: Vec<BackgroundAsset>,
}

impl Default for BackgroundsConfig {
    fn default() -> Self {
        Self {
            capture: vec![
                BackgroundAsset::new("bg1", "backgrounds/bg1.png"),
                BackgroundAsset::new("bg2", "backgrounds/bg2.png"),
            ],
            strip: vec![
                BackgroundAsset::new("image1", "backgrounds/image1.png"),
                BackgroundAsset::new("image2", "backgrounds/image2.png"),
            ],
        }
    }
}
