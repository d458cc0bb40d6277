//! Conversion of physical lengths to normalized device coordinates.
//!
//! The scale depends on what the context provides:
//! - `viewport`: `(2/width, 2/height, 0)`, since NDC spans `[-1, 1]`;
//! - `canvas`: `(1/width, 1/height, 0)`;
//! - `dpi` alone: `(1, 1, 0)`, which leaves values in pixels.
//!
//! `z` is never scaled: measures target 2D coordinates. The resolution comes
//! from the raw `dpi` entry when present, otherwise from the viewport or
//! canvas that supplied the scale.

use core::fmt;

use crate::array::{Array, BinaryOp};
use crate::context::EvalContext;
use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Unit {
    Pixel,
    Inch,
    Point,
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,
}

impl Unit {
    /// Pixels per unit at resolution `dpi`.
    pub fn ratio(self, dpi: f64) -> f64 {
        match self {
            Unit::Pixel => 1.0,
            Unit::Inch => dpi,
            Unit::Point => dpi / 72.0,
            Unit::Centimeter => dpi / 2.54,
            Unit::Millimeter => dpi / 25.4,
            // a meter is 100 cm
            Unit::Meter => 100.0 * dpi / 2.54,
            Unit::Kilometer => 100_000.0 * dpi / 2.54,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Unit::Pixel => "pixel",
            Unit::Inch => "inch",
            Unit::Point => "point",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Meter => "meter",
            Unit::Kilometer => "kilometer",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-axis scale and the resolution to use with it.
pub(crate) fn scale(ctx: &EvalContext) -> Result<([f64; 3], f64)> {
    let dpi = ctx.dpi();
    if let Some(v) = ctx.viewport() {
        return Ok(([2.0 / v.width, 2.0 / v.height, 0.0], dpi.unwrap_or(v.dpi)));
    }
    if let Some(c) = ctx.canvas() {
        return Ok(([1.0 / c.width, 1.0 / c.height, 0.0], dpi.unwrap_or(c.dpi)));
    }
    match dpi {
        Some(dpi) => Ok(([1.0, 1.0, 0.0], dpi)),
        None => Err(Error::MissingContext("viewport")),
    }
}

/// Converts `input`, expressed in `unit`, with a scale from [`scale`].
///
/// The trailing axis picks the scale: size 2 uses `(sx, sy)`, size 3 uses
/// all three components; anything else is a list of lengths and uses `sx`.
pub(crate) fn convert(unit: Unit, input: &Array, scale: [f64; 3], dpi: f64) -> Result<Array> {
    let k = unit.ratio(dpi);
    let [sx, sy, sz] = scale.map(|s| s * k);
    match input.last_dim() {
        Some(2) => BinaryOp::Mul.apply(input, &Array::from([sx, sy])),
        Some(3) => BinaryOp::Mul.apply(input, &Array::from([sx, sy, sz])),
        _ => Ok(input.map(|v| v * sx)),
    }
}
