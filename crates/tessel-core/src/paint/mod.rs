//! Colors and named palettes consumed by colormap transforms.

pub mod color;
pub mod palette;

pub use color::Color;
pub use palette::{ColorStop, Palette, PaletteRegistry, SpreadMode};
