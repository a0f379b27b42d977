use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use photo_booth::{
    composition::{
        caption::{parse_hex_color, CaptionPosition},
        BackgroundSelection, PhotoBooth, PHOTOS_PER_STRIP,
    },
    config::Config,
    filters::{FilterCatalog, SliderValues},
    segmentation::{ChromaKeyEngine, SegmentationEngine},
    video::ImageSequenceSource,
};

#[derive(Parser)]
#[command(
    name = "photo-booth",
    version,
    about = "Take three filtered photos and export them as a photo strip",
    long_about = "Photo Booth captures three photos from a sequence of camera frames, applies a filter and \
                  optional background replacement to each, and exports them as a single captioned PNG strip."
)]
struct Cli {
    /// Camera frames (PNG, JPEG), used in order and cycled if fewer than three
    #[arg(short, long, num_args = 1.., required_unless_present = "list_filters")]
    frames: Vec<PathBuf>,

    /// Filter preset (see --list-filters)
    #[arg(long)]
    filter: Option<String>,

    /// Brightness percentage (50-150)
    #[arg(long, default_value_t = 100.0)]
    brightness: f32,

    /// Contrast percentage (50-150)
    #[arg(long, default_value_t = 100.0)]
    contrast: f32,

    /// Blur radius in pixels (0-5)
    #[arg(long, default_value_t = 0.0)]
    blur: f32,

    /// Hue rotation in degrees (0-360)
    #[arg(long, default_value_t = 0.0)]
    hue: f32,

    /// Saturation percentage (50-200)
    #[arg(long, default_value_t = 100.0)]
    saturate: f32,

    /// Remove the background behind the subject (chroma key)
    #[arg(long)]
    remove_background: bool,

    /// Capture background to show behind the subject
    #[arg(long)]
    capture_background: Option<String>,

    /// Capture background opacity (0.0-1.0)
    #[arg(long)]
    background_opacity: Option<f32>,

    /// Strip background: "none", a #rrggbb color, a predefined name or an image path
    #[arg(long)]
    strip_background: Option<String>,

    /// Caption text (defaults to the current month, e.g. "Aug 2024")
    #[arg(long)]
    caption: Option<String>,

    /// Caption color (#rrggbb)
    #[arg(long)]
    caption_color: Option<String>,

    /// Bold caption
    #[arg(long)]
    bold: bool,

    /// Caption font family
    #[arg(long)]
    font: Option<String>,

    /// Caption font size (10-28)
    #[arg(long)]
    font_size: Option<f32>,

    /// Caption horizontal position as a fraction of the strip width
    #[arg(long)]
    caption_x: Option<f32>,

    /// Caption vertical position as a fraction of the strip height
    #[arg(long)]
    caption_y: Option<f32>,

    /// Directory the strip is written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the available filters and exit
    #[arg(long)]
    list_filters: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn sliders(&self) -> SliderValues {
        SliderValues {
            brightness: self.brightness,
            contrast: self.contrast,
            blur: self.blur,
            hue: self.hue,
            saturate: self.saturate,
        }
    }

    fn strip_background_selection(&self) -> Option<BackgroundSelection> {
        let value = self.strip_background.as_deref()?.trim();
        let selection = if value.eq_ignore_ascii_case("none") {
            BackgroundSelection::None
        } else if value.starts_with('#') {
            BackgroundSelection::Color(value.to_string())
        } else if PathBuf::from(value).is_file() {
            BackgroundSelection::UploadFile(PathBuf::from(value))
        } else {
            BackgroundSelection::Predefined(value.to_string())
        };
        Some(selection)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    if cli.list_filters {
        for name in FilterCatalog::builtin().available_filters() {
            println!("{}", name);
        }
        return Ok(());
    }

    info!("Starting Photo Booth v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(filter) = &cli.filter {
        if !FilterCatalog::builtin().has_filter(filter) {
            return Err(anyhow::anyhow!("Unknown filter: {}", filter));
        }
    }

    let camera = Arc::new(ImageSequenceSource::open(&cli.frames).await?);
    info!("Camera: {} frame(s)", camera.len());

    let remove_background = cli.remove_background || config.capture.remove_background;
    let engine: Option<Arc<dyn SegmentationEngine>> = remove_background
        .then(|| Arc::new(ChromaKeyEngine::new(config.segmentation)) as Arc<dyn SegmentationEngine>);

    let booth = PhotoBooth::new(config, camera, engine).await?;
    booth.initialize().await?;

    let mut settings = booth.default_settings();
    if let Some(filter) = &cli.filter {
        settings.select_filter(filter.as_str());
    }
    settings.sliders = cli.sliders();
    settings.remove_background = remove_background;
    if let Some(background) = &cli.capture_background {
        settings.background = Some(background.clone());
        settings.background_visible = true;
    }
    if let Some(opacity) = cli.background_opacity {
        settings.background_opacity = opacity.clamp(0.0, 1.0);
    }
    info!("Filter: {}", settings.filter);

    for _ in 0..PHOTOS_PER_STRIP {
        info!("Taking photo {}", booth.session().state().progress_label());
        booth.capture(&settings).await?;
    }

    let mut layout = booth.default_layout()?;
    layout.caption.text = match &cli.caption {
        Some(text) => text.clone(),
        None if !layout.caption.text.is_empty() => layout.caption.text.clone(),
        None => chrono::Local::now().format("%b %Y").to_string(),
    };
    if let Some(color) = &cli.caption_color {
        layout.caption.color =
            parse_hex_color(color).ok_or_else(|| anyhow::anyhow!("Invalid caption color: {}", color))?;
    }
    if cli.bold {
        layout.caption.bold = true;
    }
    if let Some(font) = &cli.font {
        layout.caption.font_family = font.clone();
    }
    if let Some(size) = cli.font_size {
        layout.caption = layout.caption.with_font_size(size);
    }
    let position = layout.caption.position;
    layout.caption.position =
        CaptionPosition::clamped(cli.caption_x.unwrap_or(position.x), cli.caption_y.unwrap_or(position.y));

    if let Some(selection) = cli.strip_background_selection() {
        layout.background = booth.resolve_background(&selection).await;
    }

    let path = booth.export(&layout, &cli.output).await?;
    info!("Photo strip saved to: {:?}", path);
    Ok(())
}
