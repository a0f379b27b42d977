//! # Filter System
//!
//! Named filter presets plus manual slider adjustments, applied to camera
//! frames as an ordered chain of CSS-style image operations.
//!
//! ## Built-in Filters
//!
//! - **normal**: no change
//! - **bw**: full grayscale
//! - **warm**, **vintage**, **retro**: sepia-based looks
//! - **cool**: hue rotated half-way round
//! - **bright**, **neon**: brightness, contrast and saturation boosts
//! - **blur**: soft focus
//!
//! ## Usage
//!
//! ```rust,no_run
//! use photo_booth::filters::{apply_adjustments, FilterCatalog, SliderValues};
//! use photo_booth::video::Frame;
//!
//! let spec = FilterCatalog::builtin().resolve("bw");
//! let mut frame = Frame::new_filled(640, 480, [200, 40, 40, 255]);
//! apply_adjustments(&mut frame, &spec.chain(&SliderValues::default()));
//! ```

pub mod adjust;
pub mod catalog;
pub mod pipeline;

pub use adjust::{Adjustment, FilterSpec, SliderValues};
pub use catalog::{FilterCatalog, IDENTITY_FILTER};
pub use pipeline::apply_adjustments;
