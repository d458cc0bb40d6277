//! Per-call evaluation context.
//!
//! An [`EvalContext`] is a single map from fixed key names to values. The
//! caller fills it fresh for every render call: a `viewport` (or `canvas`,
//! or a raw `dpi`) before any measure is evaluated, then the per-frame
//! derived maps (`screen`, `depth`, `faces`, `segments`, `index`) keyed by
//! geometry kind once its geometry pass has run. Transforms only read it.

use core::fmt;
use std::collections::BTreeMap;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::paint::{Palette, PaletteRegistry};

pub const VIEWPORT: &str = "viewport";
pub const CANVAS: &str = "canvas";
pub const DPI: &str = "dpi";

/// Rectangular region of a canvas, in pixels, bottom-left origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Resolution of the canvas this viewport lives on.
    pub dpi: f64,
}

impl Viewport {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, dpi: f64) -> Self {
        Self { x, y, width, height, dpi }
    }

    #[inline]
    pub const fn size(self) -> (f64, f64) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Drawing surface size and resolution.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub dpi: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self { width: 512.0, height: 512.0, dpi: 100.0 }
    }
}

impl Canvas {
    #[inline]
    pub const fn new(width: f64, height: f64, dpi: f64) -> Self {
        Self { width, height, dpi }
    }

    /// Viewport covering the whole canvas.
    #[inline]
    pub const fn viewport(self) -> Viewport {
        Viewport::new(0.0, 0.0, self.width, self.height, self.dpi)
    }

    /// Viewport at `(x, y)` of the given size on this canvas.
    #[inline]
    pub const fn sub_viewport(self, x: f64, y: f64, width: f64, height: f64) -> Viewport {
        Viewport::new(x, y, width, height, self.dpi)
    }
}

/// Per-frame quantities computed by a renderer's geometry pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DerivedKey {
    /// Projected positions, `[n, 3]`.
    Screen,
    /// Per-item depth, `[n]`.
    Depth,
    /// Sorted face order.
    Faces,
    /// Sorted segment order.
    Segments,
    /// Depth-sort permutation.
    Index,
}

impl DerivedKey {
    pub const ALL: [DerivedKey; 5] = [
        DerivedKey::Screen,
        DerivedKey::Depth,
        DerivedKey::Faces,
        DerivedKey::Segments,
        DerivedKey::Index,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DerivedKey::Screen => "screen",
            DerivedKey::Depth => "depth",
            DerivedKey::Faces => "faces",
            DerivedKey::Segments => "segments",
            DerivedKey::Index => "index",
        }
    }
}

impl fmt::Display for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value stored in the context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Viewport(Viewport),
    Canvas(Canvas),
    Dpi(f64),
    Array(Array),
    /// Arrays keyed by geometry kind (`positions`, `faces`, ...).
    Map(BTreeMap<String, Array>),
}

/// The evaluation context passed to every transform evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    entries: BTreeMap<String, ContextValue>,
    palettes: PaletteRegistry,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    /// Empty context with the built-in palettes.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            palettes: PaletteRegistry::with_builtins(),
        }
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let mut ctx = Self::new();
        ctx.set_viewport(viewport);
        ctx
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.insert(VIEWPORT, ContextValue::Viewport(viewport));
    }

    pub fn set_canvas(&mut self, canvas: Canvas) {
        self.insert(CANVAS, ContextValue::Canvas(canvas));
    }

    pub fn set_dpi(&mut self, dpi: f64) {
        self.insert(DPI, ContextValue::Dpi(dpi));
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        match self.entries.get(VIEWPORT) {
            Some(ContextValue::Viewport(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn canvas(&self) -> Option<Canvas> {
        match self.entries.get(CANVAS) {
            Some(ContextValue::Canvas(c)) => Some(*c),
            _ => None,
        }
    }

    /// The raw `dpi` entry, not the viewport's or canvas' resolution.
    pub fn dpi(&self) -> Option<f64> {
        match self.entries.get(DPI) {
            Some(ContextValue::Dpi(d)) => Some(*d),
            _ => None,
        }
    }

    /// Stores `array` under `key[geometry]`, creating the map if needed.
    ///
    /// A raw array previously stored under `key` is replaced by the map.
    pub fn inject(&mut self, key: DerivedKey, geometry: impl Into<String>, array: Array) {
        let entry = self
            .entries
            .entry(key.as_str().to_string())
            .or_insert_with(|| ContextValue::Map(BTreeMap::new()));
        if !matches!(entry, ContextValue::Map(_)) {
            *entry = ContextValue::Map(BTreeMap::new());
        }
        if let ContextValue::Map(map) = entry {
            map.insert(geometry.into(), array);
        }
    }

    /// Stores `array` directly under `key`, for every geometry.
    pub fn inject_raw(&mut self, key: DerivedKey, array: Array) {
        self.insert(key.as_str(), ContextValue::Array(array));
    }

    /// Looks up a derived entry.
    ///
    /// A raw array answers any geometry. A map answers only a lookup that
    /// names one of its geometries.
    pub fn derived(&self, key: DerivedKey, geometry: Option<&str>) -> Result<&Array> {
        let missing = || Error::MissingDerivedBuffer {
            key: key.as_str(),
            sub_key: geometry.map(str::to_string),
        };
        match (self.entries.get(key.as_str()), geometry) {
            (Some(ContextValue::Array(a)), _) => Ok(a),
            (Some(ContextValue::Map(map)), Some(g)) => map.get(g).ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    /// Drops every derived entry, ready for the next frame.
    pub fn clear_derived(&mut self) {
        for key in DerivedKey::ALL {
            self.entries.remove(key.as_str());
        }
    }

    /// Row order from a raw `index` array, if one is present.
    pub fn index_order(&self) -> Option<Vec<usize>> {
        match self.entries.get(DerivedKey::Index.as_str()) {
            Some(ContextValue::Array(a)) => {
                Some(a.as_slice().iter().map(|&v| v.max(0.0) as usize).collect())
            }
            _ => None,
        }
    }

    #[inline]
    pub fn palettes(&self) -> &PaletteRegistry {
        &self.palettes
    }

    pub fn register_palette(&mut self, name: impl Into<String>, palette: Palette) {
        self.palettes.insert(name, palette);
    }
}
