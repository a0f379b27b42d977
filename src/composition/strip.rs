use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::composition::caption::{CaptionPosition, CaptionRenderer, CaptionSpec};
use crate::composition::compositor::draw_over;
use crate::composition::session::PHOTOS_PER_STRIP;
use crate::config::StripConfig;
use crate::error::{ExportError, Result};
use crate::video::types::{encode_png, Photo};

/// Longest strip side, in pixels
pub const MAX_STRIP_SIDE: u32 = 16_384;

/// Direction the photos are stacked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripOrientation {
    #[default]
    Vertical,
    Horizontal,
}

/// What sits behind the photos
#[derive(Debug, Clone, Default)]
pub enum StripBackground {
    /// Transparent
    #[default]
    None,
    Solid([u8; 4]),
    /// Predefined or user-uploaded image, scaled to cover the strip
    Image(Arc<RgbaImage>),
}

/// Everything that ends up on the exported strip
#[derive(Debug, Clone)]
pub struct StripLayout {
    pub background: StripBackground,
    pub caption: CaptionSpec,
    /// In capture order
    pub photos: Vec<Photo>,
}

impl StripLayout {
    pub fn new(photos: Vec<Photo>) -> Self {
        Self {
            background: StripBackground::None,
            caption: CaptionSpec::default(),
            photos,
        }
    }

    pub fn with_background(mut self, background: StripBackground) -> Self {
        self.background = background;
        self
    }

    pub fn with_caption(mut self, caption: CaptionSpec) -> Self {
        self.caption = caption;
        self
    }
}

/// Pixel rectangle on the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Where everything lands for a given layout
#[derive(Debug, Clone, PartialEq)]
pub struct StripGeometry {
    pub width: u32,
    pub height: u32,
    pub photo_rects: Vec<Rect>,
    pub caption_origin: (f32, f32),
}

/// The exported strip image
#[derive(Debug, Clone)]
pub struct RasterArtifact {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RasterArtifact {
    /// Write the PNG into `dir` under its file name
    pub async fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.png).await?;
        info!("Saved {}x{} strip to {:?}", self.width, self.height, path);
        Ok(path)
    }
}

/// Strip bounds on screen, in the same units as pointer coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripBounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Pointer input relevant to moving the caption
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Pointer pressed on the caption itself
    CaptionPressed,
    Moved { x: f32, y: f32 },
    Released,
    /// Pointer left the strip
    Left,
}

/// Caption drag gesture state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptionDrag {
    active: bool,
}

impl CaptionDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one pointer event; returns true when the caption moved
    pub fn handle(&mut self, caption: &mut CaptionSpec, event: PointerEvent, bounds: &StripBounds) -> bool {
        match event {
            PointerEvent::CaptionPressed => {
                self.active = true;
                false
            }
            PointerEvent::Released | PointerEvent::Left => {
                self.active = false;
                false
            }
            PointerEvent::Moved { x, y } => self.update_caption_position(caption, x, y, bounds),
        }
    }

    /// Move the caption under the pointer, only while a drag is active
    pub fn update_caption_position(
        &self,
        caption: &mut CaptionSpec,
        pointer_x: f32,
        pointer_y: f32,
        bounds: &StripBounds,
    ) -> bool {
        if !self.active || bounds.width <= 0.0 || bounds.height <= 0.0 {
            return false;
        }

        let x = (pointer_x - bounds.left) / bounds.width;
        let y = (pointer_y - bounds.top) / bounds.height;
        caption.position = CaptionPosition::clamped(x, y);
        true
    }
}

/// Lays out the three photos, background and caption, and rasterizes the strip
#[derive(Debug, Clone)]
pub struct StripComposer {
    config: StripConfig,
    captions: CaptionRenderer,
}

impl StripComposer {
    pub fn new(config: StripConfig, captions: CaptionRenderer) -> Self {
        Self { config, captions }
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    pub fn captions(&self) -> &CaptionRenderer {
        &self.captions
    }

    /// Compute the strip size and the cell of every photo
    ///
    /// Cells share the aspect ratio of the first photo. Layouts with a side
    /// longer than [`MAX_STRIP_SIDE`] are rejected.
    pub fn geometry(&self, layout: &StripLayout) -> Result<StripGeometry> {
        let first = self.check_photos(layout)?;

        let cell_w = u64::from(self.config.photo_size.max(1));
        let cell_h = ((cell_w as f64 * first.height() as f64 / first.width().max(1) as f64).round() as u64).max(1);
        if cell_h > u64::from(MAX_STRIP_SIDE) {
            return Err(too_large(cell_w, cell_h));
        }
        let pad = u64::from(self.config.padding);
        let gap = u64::from(self.config.gap);
        let band = u64::from(self.config.caption_band);
        let n = PHOTOS_PER_STRIP as u64;

        // Every term is below 2^32, so these sums fit in u64
        let (width, height) = match self.config.orientation {
            StripOrientation::Vertical => (cell_w + 2 * pad, 2 * pad + n * cell_h + (n - 1) * gap + band),
            StripOrientation::Horizontal => (2 * pad + n * cell_w + (n - 1) * gap, 2 * pad + cell_h + band),
        };
        if width > u64::from(MAX_STRIP_SIDE) || height > u64::from(MAX_STRIP_SIDE) {
            return Err(too_large(width, height));
        }

        // Everything now fits in u32
        let (cell_w, cell_h, pad, gap) = (cell_w as u32, cell_h as u32, pad as u32, gap as u32);
        let photo_rects = (0..PHOTOS_PER_STRIP as u32)
            .map(|i| {
                let (x, y) = match self.config.orientation {
                    StripOrientation::Vertical => (pad, pad + i * (cell_h + gap)),
                    StripOrientation::Horizontal => (pad + i * (cell_w + gap), pad),
                };
                Rect { x, y, width: cell_w, height: cell_h }
            })
            .collect();

        let (width, height) = (width as u32, height as u32);
        Ok(StripGeometry {
            width,
            height,
            photo_rects,
            caption_origin: layout.caption.origin(width, height),
        })
    }

    /// Render the strip without encoding it
    pub fn render_image(&self, layout: &StripLayout) -> Result<RgbaImage> {
        let geometry = self.geometry(layout)?;
        let (width, height) = (geometry.width, geometry.height);
        debug!("Rendering {}x{} strip ({:?})", width, height, self.config.orientation);

        let mut canvas = RgbaImage::new(width, height);

        match &layout.background {
            StripBackground::None => {}
            StripBackground::Solid(color) => {
                for px in canvas.pixels_mut() {
                    *px = Rgba(*color);
                }
            }
            StripBackground::Image(image) => {
                let cover = DynamicImage::ImageRgba8(image.as_ref().clone())
                    .resize_to_fill(width, height, FilterType::Triangle)
                    .to_rgba8();
                draw_over(&mut canvas, &cover, 0, 0, 1.0);
            }
        }

        for (photo, rect) in layout.photos.iter().zip(&geometry.photo_rects) {
            let decoded = photo.decode()?;
            let cell = DynamicImage::ImageRgba8(decoded.into_image())
                .resize_to_fill(rect.width, rect.height, FilterType::Triangle)
                .to_rgba8();
            draw_over(&mut canvas, &cell, rect.x as i64, rect.y as i64, 1.0);
        }

        if let Some(caption) = self.captions.render(&layout.caption, width, height)? {
            draw_over(&mut canvas, &caption, 0, 0, 1.0);
        }

        Ok(canvas)
    }

    /// Render and encode the strip for export
    pub fn render(&self, layout: &StripLayout) -> Result<RasterArtifact> {
        let canvas = self.render_image(layout)?;
        let png = encode_png(&canvas)?;

        info!("Strip rendered: {}x{}, {} bytes", canvas.width(), canvas.height(), png.len());
        Ok(RasterArtifact {
            file_name: self.config.export_file_name.clone(),
            width: canvas.width(),
            height: canvas.height(),
            png,
        })
    }

    fn check_photos<'a>(&self, layout: &'a StripLayout) -> Result<&'a Photo> {
        match layout.photos.first() {
            Some(first) if layout.photos.len() == PHOTOS_PER_STRIP => Ok(first),
            _ => Err(ExportError::IncompleteStrip {
                expected: PHOTOS_PER_STRIP,
                actual: layout.photos.len(),
            }
            .into()),
        }
    }
}

fn too_large(width: u64, height: u64) -> crate::error::BoothError {
    ExportError::LayoutTooLarge {
        reason: format!("{}x{} exceeds {} px per side", width, height, MAX_STRIP_SIDE),
    }
    .into()
}
