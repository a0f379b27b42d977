//! # Video Input Module
//!
//! Camera frames, segmentation masks, and the encoded photos built from them.

pub mod camera;
pub mod types;

pub use camera::{FrameSource, ImageSequenceSource, StillFrameSource};
pub use types::{Frame, Mask, Photo};
