//! # Photo Booth
//!
//! Take three filtered photos, optionally swap out the background behind the
//! subject, and export them as a decorated photo strip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use photo_booth::{
//!     composition::PhotoBooth,
//!     config::Config,
//!     video::ImageSequenceSource,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let camera = Arc::new(ImageSequenceSource::open(&["a.png", "b.png", "c.png"]).await?);
//! let booth = PhotoBooth::new(Config::default(), camera, None).await?;
//! booth.initialize().await?;
//!
//! let mut settings = booth.default_settings();
//! settings.select_filter("bw");
//! for _ in 0..3 {
//!     booth.capture(&settings).await?;
//! }
//!
//! let layout = booth.default_layout()?;
//! booth.export(&layout, "out/").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`filters`] - filter presets, manual sliders and the pixel pipeline
//! - [`segmentation`] - background removal behind an async adapter
//! - [`video`] - camera frame sources, frames, masks and photos
//! - [`composition`] - per-photo compositing, the capture session and the strip
//! - [`assets`] - background image catalogs
//! - [`config`] - configuration management
//!
//! ## Custom Segmentation
//!
//! Any person-segmentation model can be plugged in through the
//! [`SegmentationEngine`](segmentation::SegmentationEngine) trait:
//!
//! ```rust,no_run
//! use photo_booth::segmentation::SegmentationEngine;
//! use photo_booth::video::{Frame, Mask};
//! use photo_booth::Result;
//!
//! struct KeepEverything;
//!
//! impl SegmentationEngine for KeepEverything {
//!     fn name(&self) -> &str {
//!         "keep_everything"
//!     }
//!
//!     fn segment(&self, frame: &Frame) -> Result<Mask> {
//!         Ok(Mask::opaque(frame.width(), frame.height()))
//!     }
//! }
//! ```

pub mod assets;
pub mod composition;
pub mod config;
pub mod error;
pub mod filters;
pub mod segmentation;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CaptureSettings, PhotoBooth, StripLayout},
    config::Config,
    error::{BoothError, Result},
    filters::FilterCatalog,
    segmentation::SegmentationEngine,
};
