use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    assets::{decode_image_bytes, load_image_file, BackgroundCatalog},
    composition::caption::{parse_hex_color, CaptionRenderer},
    composition::session::{CaptureOutcome, CaptureSession, CaptureSettings},
    composition::strip::{RasterArtifact, StripBackground, StripComposer, StripLayout},
    config::Config,
    error::Result,
    segmentation::{SegmentationAdapter, SegmentationEngine},
    video::camera::FrameSource,
};

/// How the user picked the strip background
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSelection {
    None,
    /// `#rrggbb`
    Color(String),
    /// Name in the strip background catalog
    Predefined(String),
    /// Image file picked by the user
    UploadFile(PathBuf),
    /// Image bytes picked by the user
    UploadBytes(Vec<u8>),
}

/// Main booth that ties capturing and strip export together
///
/// The flow mirrors the booth screens:
/// 1. Initialize - load background catalogs and start the segmentation engine
/// 2. Capture - take three photos through the [`CaptureSession`]
/// 3. Decorate - build a [`StripLayout`] with background and caption
/// 4. Export - rasterize the strip and write `photo-strip.png`
pub struct PhotoBooth {
    config: Config,
    session: CaptureSession,
    segmentation: Option<Arc<SegmentationAdapter>>,
    strip_backgrounds: Arc<BackgroundCatalog>,
    composer: StripComposer,
}

impl PhotoBooth {
    /// Build a booth; background catalogs are loaded here, once
    pub async fn new(
        config: Config,
        camera: Arc<dyn FrameSource>,
        engine: Option<Arc<dyn SegmentationEngine>>,
    ) -> Result<Self> {
        config.validate()?;
        info!("📷 Setting up photo booth with camera '{}'", camera.name());

        let capture_backgrounds = Arc::new(BackgroundCatalog::load(&config.backgrounds.capture).await);
        let strip_backgrounds = Arc::new(BackgroundCatalog::load(&config.backgrounds.strip).await);

        let segmentation = engine.map(|engine| Arc::new(SegmentationAdapter::new(engine)));

        let mut session = CaptureSession::new(camera)
            .with_backgrounds(capture_backgrounds)
            .with_segmentation_timeout(config.capture.segmentation_timeout());
        if let Some(adapter) = &segmentation {
            session = session.with_segmentation(Arc::clone(adapter));
        }

        let captions = CaptionRenderer::new(config.caption.fonts_dir.as_deref());
        info!("Caption renderer ready with {} font faces", captions.font_count());
        let composer = StripComposer::new(config.strip.clone(), captions);

        Ok(Self {
            config,
            session,
            segmentation,
            strip_backgrounds,
            composer,
        })
    }

    /// Start the segmentation engine, if there is one
    pub async fn initialize(&self) -> Result<()> {
        if let Some(adapter) = &self.segmentation {
            adapter.initialize().await?;
            info!("Background removal ready ('{}')", adapter.engine_name());
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Capture settings as configured at startup
    pub fn default_settings(&self) -> CaptureSettings {
        self.config.capture.to_settings()
    }

    pub async fn capture(&self, settings: &CaptureSettings) -> Result<CaptureOutcome> {
        self.session.capture(settings).await
    }

    /// Start a new strip
    pub fn reset(&self) -> Result<()> {
        self.session.reset()
    }

    /// Layout for the captured photos with the configured caption and background
    pub fn default_layout(&self) -> Result<StripLayout> {
        let background = match &self.config.strip.background_color {
            Some(color) => color_background(color),
            None => StripBackground::None,
        };
        Ok(StripLayout::new(self.session.photos())
            .with_background(background)
            .with_caption(self.config.caption.to_spec()?))
    }

    /// Turn a user choice into a drawable background
    ///
    /// Anything that fails to load falls back to no background.
    pub async fn resolve_background(&self, selection: &BackgroundSelection) -> StripBackground {
        match selection {
            BackgroundSelection::None => StripBackground::None,
            BackgroundSelection::Color(color) => color_background(color),
            BackgroundSelection::Predefined(name) => match self.strip_backgrounds.get(name) {
                Some(image) => StripBackground::Image(image),
                None => {
                    warn!("Strip background '{}' is not available", name);
                    StripBackground::None
                }
            },
            BackgroundSelection::UploadFile(path) => match load_image_file("upload", path).await {
                Ok(image) => StripBackground::Image(image),
                Err(e) => {
                    warn!("{}", e.user_message());
                    StripBackground::None
                }
            },
            BackgroundSelection::UploadBytes(bytes) => match decode_image_bytes("upload", bytes) {
                Ok(image) => StripBackground::Image(image),
                Err(e) => {
                    warn!("{}", e.user_message());
                    StripBackground::None
                }
            },
        }
    }

    pub fn strip_background_names(&self) -> Vec<&str> {
        self.strip_backgrounds.names()
    }

    pub fn composer(&self) -> &StripComposer {
        &self.composer
    }

    pub fn render_strip(&self, layout: &StripLayout) -> Result<RasterArtifact> {
        self.composer.render(layout)
    }

    /// Render the strip and write it into `dir`
    pub async fn export<P: AsRef<Path>>(&self, layout: &StripLayout, dir: P) -> Result<PathBuf> {
        let artifact = self.render_strip(layout)?;
        artifact.save_to_dir(dir).await
    }
}

fn color_background(color: &str) -> StripBackground {
    match parse_hex_color(color) {
        Some([r, g, b]) => StripBackground::Solid([r, g, b, 255]),
        None => {
            warn!("Ignoring invalid strip color '{}'", color);
            StripBackground::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::caption::CaptionPosition;
    use crate::composition::session::PHOTOS_PER_STRIP;
    use crate::config::BackgroundsConfig;
    use crate::video::camera::ImageSequenceSource;
    use crate::video::types::Frame;
    use tempfile::tempdir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.backgrounds = BackgroundsConfig { capture: Vec::new(), strip: Vec::new() };
        config.strip.photo_size = 60;
        config
    }

    async fn booth_with_frames(frames: Vec<Frame>) -> PhotoBooth {
        let camera = Arc::new(ImageSequenceSource::from_frames(frames).unwrap());
        PhotoBooth::new(test_config(), camera, None).await.unwrap()
    }

    fn rgb_frames() -> Vec<Frame> {
        vec![
            Frame::new_filled(40, 30, [255, 0, 0, 255]),
            Frame::new_filled(40, 30, [0, 255, 0, 255]),
            Frame::new_filled(40, 30, [0, 0, 255, 255]),
        ]
    }

    #[tokio::test]
    async fn test_black_and_white_strip_scenario() {
        let booth = booth_with_frames(rgb_frames()).await;
        booth.initialize().await.unwrap();

        let mut settings = booth.default_settings();
        settings.select_filter("bw");
        for _ in 0..PHOTOS_PER_STRIP {
            booth.capture(&settings).await.unwrap();
        }

        let mut layout = booth.default_layout().unwrap();
        layout.caption.text = "Aug 2024".to_string();
        assert_eq!(layout.caption.position, CaptionPosition { x: 0.5, y: 0.9 });

        let geometry = booth.composer().geometry(&layout).unwrap();
        assert_eq!(geometry.caption_origin, (0.5 * geometry.width as f32, 0.9 * geometry.height as f32));

        let artifact = booth.render_strip(&layout).unwrap();
        let strip = image::load_from_memory(&artifact.png).unwrap().to_rgba8();
        assert_eq!(strip.dimensions(), (geometry.width, geometry.height));

        // Luma of pure red, green and blue, stacked in capture order
        let expected = [54u8, 182, 18];
        for (rect, luma) in geometry.photo_rects.iter().zip(expected) {
            let (cx, cy) = rect.center();
            let [r, g, b, a] = strip.get_pixel(cx, cy).0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, 255);
            assert!((r as i32 - luma as i32).abs() <= 1, "got {} expected {}", r, luma);
        }

        // The strip has no background, so anything opaque below the photos is caption
        if booth.composer().captions().font_count() > 0 {
            let (ox, oy) = geometry.caption_origin;
            let photos_bottom = geometry.photo_rects.iter().map(|r| r.y + r.height).max().unwrap();
            assert!(oy as u32 > photos_bottom);

            let inked = strip
                .enumerate_pixels()
                .filter(|(x, y, px)| *x >= ox as u32 && *y >= oy as u32 && px.0[3] > 0)
                .count();
            assert!(inked > 0, "caption was not drawn");
        }
    }

    #[tokio::test]
    async fn test_export_writes_named_file() {
        let booth = booth_with_frames(rgb_frames()).await;
        let settings = booth.default_settings();
        for _ in 0..PHOTOS_PER_STRIP {
            booth.capture(&settings).await.unwrap();
        }

        let dir = tempdir().unwrap();
        let path = booth.export(&booth.default_layout().unwrap(), dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("photo-strip.png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_reset_starts_a_new_strip() {
        let booth = booth_with_frames(rgb_frames()).await;
        let settings = booth.default_settings();
        for _ in 0..PHOTOS_PER_STRIP {
            booth.capture(&settings).await.unwrap();
        }

        booth.reset().unwrap();
        assert_eq!(booth.session().state().photos_taken, 0);
        assert!(booth.render_strip(&booth.default_layout().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_background_selection_degrades() {
        let booth = booth_with_frames(rgb_frames()).await;

        let missing = booth
            .resolve_background(&BackgroundSelection::Predefined("image9".to_string()))
            .await;
        assert!(matches!(missing, StripBackground::None));

        let garbage = booth
            .resolve_background(&BackgroundSelection::UploadBytes(b"nope".to_vec()))
            .await;
        assert!(matches!(garbage, StripBackground::None));

        let color = booth
            .resolve_background(&BackgroundSelection::Color("#ff0000".to_string()))
            .await;
        assert!(matches!(color, StripBackground::Solid([255, 0, 0, 255])));
    }

    #[tokio::test]
    async fn test_upload_file_background() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let booth = booth_with_frames(rgb_frames()).await;
        let background = booth.resolve_background(&BackgroundSelection::UploadFile(path)).await;
        assert!(matches!(background, StripBackground::Image(_)));
    }
}
