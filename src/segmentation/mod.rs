//! # Background Segmentation
//!
//! Wraps a person-segmentation engine behind an async, single-slot adapter.
//! The engine itself is a black box that turns a frame into an alpha mask;
//! [`ChromaKeyEngine`] is the built-in one.

pub mod adapter;
pub mod engine;

pub use adapter::{Segmentation, SegmentationAdapter};
pub use engine::{ChromaKeyEngine, ChromaKeySettings, SegmentationEngine};
