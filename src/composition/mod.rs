//! # Composition
//!
//! Turns camera frames into photos and photos into an exportable strip.
//!
//! - [`compositor`] - filter, matte and background for a single photo
//! - [`session`] - up to three captures, one at a time
//! - [`strip`] - strip layout, caption dragging and export
//! - [`engine`] - the [`PhotoBooth`] tying it all together

pub mod caption;
pub mod compositor;
pub mod engine;
pub mod session;
pub mod strip;

// Re-exports for convenience
pub use caption::{CaptionPosition, CaptionRenderer, CaptionSpec};
pub use compositor::{CompositeRequest, FrameCompositor};
pub use engine::{BackgroundSelection, PhotoBooth};
pub use session::{CaptureOutcome, CaptureSession, CaptureSettings, SessionState, PHOTOS_PER_STRIP};
pub use strip::{
    CaptionDrag, PointerEvent, RasterArtifact, StripBackground, StripBounds, StripComposer, StripLayout,
    StripOrientation,
};
