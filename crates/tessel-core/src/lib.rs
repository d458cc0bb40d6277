//! Tessel core crate.
//!
//! Change-tracked typed buffers, declarative transform graphs and their
//! per-frame evaluation. Rendering backends sit on top: they feed buffers to
//! a sink, run a [`render::FramePass`] and draw the resulting frame.

pub mod array;
pub mod buffer;
pub mod context;
pub mod error;
pub mod glm;
pub mod logging;
pub mod paint;
pub mod render;
pub mod transform;

pub use error::{Error, Result};
