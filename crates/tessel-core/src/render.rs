//! Reference driver for the two-phase frame contract.
//!
//! A backend draws a [`Visual`] in two phases:
//! 1. the geometry pass evaluates positions, projects them with
//!    `projection · view · model`, sorts items by depth and injects the
//!    `screen`, `depth` and `index` entries (plus `faces`/`segments` for
//!    those geometries) into the context under the geometry kind;
//! 2. every other variable is evaluated against that context. Per-item
//!    values are reordered to match the sorted geometry; uniform values are
//!    passed through.
//!
//! [`FramePass`] performs both phases and returns a [`Frame`]. Pixels are
//! the backend's business.

use core::fmt;

use glam::DMat4;

use crate::array::Array;
use crate::buffer::Buffer;
use crate::context::{DerivedKey, EvalContext, Viewport};
use crate::error::Result;
use crate::glm::{self, Camera};
use crate::transform::{Bound, TransformId, Transforms};

/// Geometry a visual is made of; also the sub-key of derived entries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GeometryKind {
    Positions,
    Faces,
    Segments,
    Paths,
}

impl GeometryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Positions => "positions",
            GeometryKind::Faces => "faces",
            GeometryKind::Segments => "segments",
            GeometryKind::Paths => "paths",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a frame pass needs besides the visual itself.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    pub viewport: Viewport,
    pub model: DMat4,
    pub view: DMat4,
    pub projection: DMat4,
}

impl RenderState {
    /// Identity model, view and projection.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            model: DMat4::IDENTITY,
            view: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
        }
    }

    pub fn with_camera(viewport: Viewport, camera: &Camera) -> Self {
        Self {
            viewport,
            model: camera.model,
            view: camera.view,
            projection: camera.projection,
        }
    }

    /// `projection · view · model`.
    pub fn transform(&self) -> DMat4 {
        self.projection * self.view * self.model
    }
}

/// A visual variable: a transform chain or plain data.
#[derive(Debug, Clone)]
pub enum Variable {
    Transform(TransformId),
    Value(Bound),
}

impl From<TransformId> for Variable {
    fn from(id: TransformId) -> Self {
        Variable::Transform(id)
    }
}

impl From<Bound> for Variable {
    fn from(bound: Bound) -> Self {
        Variable::Value(bound)
    }
}

impl From<Buffer> for Variable {
    fn from(buffer: Buffer) -> Self {
        Variable::Value(buffer.into())
    }
}

impl From<&Buffer> for Variable {
    fn from(buffer: &Buffer) -> Self {
        Variable::Value(buffer.into())
    }
}

impl From<Array> for Variable {
    fn from(array: Array) -> Self {
        Variable::Value(array.into())
    }
}

impl From<f64> for Variable {
    fn from(value: f64) -> Self {
        Variable::Value(value.into())
    }
}

impl<const N: usize> From<[f64; N]> for Variable {
    fn from(values: [f64; N]) -> Self {
        Variable::Value(values.into())
    }
}

/// How a variable's value relates to the items of a visual.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Variability {
    /// One value for the whole visual (length 1).
    Uniform,
    /// One value per item, in data order (length N).
    PerItem,
    /// Computed from derived entries, so already in sorted order.
    Derived,
}

/// Named variables attached to one geometry.
#[derive(Debug, Clone)]
pub struct Visual {
    kind: GeometryKind,
    positions: Variable,
    variables: Vec<(String, Variable, Variability)>,
}

impl Visual {
    pub fn new(kind: GeometryKind, positions: impl Into<Variable>) -> Self {
        Self { kind, positions: positions.into(), variables: Vec::new() }
    }

    #[inline]
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Sets (or replaces) variable `name`, classifying it by what it is bound
    /// to: context-dependent chains are derived, data of length 1 is uniform,
    /// longer data is per item.
    ///
    /// A single color must therefore be given as one row (`[1, 4]`), not as
    /// a flat `[4]` array.
    pub fn set(
        &mut self,
        transforms: &Transforms,
        name: impl Into<String>,
        value: impl Into<Variable>,
    ) -> Result<Variability> {
        let name = name.into();
        let value = value.into();
        let len = match &value {
            Variable::Transform(id) => {
                if transforms.reads_context(*id)? {
                    None
                } else {
                    Some(transforms.bound_len(*id)?.unwrap_or(1))
                }
            }
            Variable::Value(bound) => Some(bound.len()),
        };
        let variability = match len {
            None => Variability::Derived,
            Some(n) if n > 1 => Variability::PerItem,
            Some(_) => Variability::Uniform,
        };
        log::trace!("{} variable {name:?}: {variability:?}", self.kind);

        match self.variables.iter_mut().find(|(n, _, _)| *n == name) {
            Some(slot) => *slot = (name, value, variability),
            None => self.variables.push((name, value, variability)),
        }
        Ok(variability)
    }

    pub fn variability(&self, name: &str) -> Option<Variability> {
        self.variables.iter().find(|(n, _, _)| n == name).map(|(_, _, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(n, _, _)| n.as_str())
    }
}

/// An evaluated variable, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Uniform(Array),
    /// One row per item, in draw order.
    PerItem(Array),
}

impl Attribute {
    #[inline]
    pub fn array(&self) -> &Array {
        match self {
            Attribute::Uniform(a) | Attribute::PerItem(a) => a,
        }
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        matches!(self, Attribute::Uniform(_))
    }
}

/// Result of one frame pass over a visual.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: GeometryKind,
    /// Projected positions `[n, 3]`, in draw order.
    pub positions: Array,
    /// Depth of each item, in draw order.
    pub depth: Array,
    /// Data index of each drawn item.
    pub order: Vec<usize>,
    pub attributes: Vec<(String, Attribute)>,
}

impl Frame {
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }
}

/// Runs the geometry and style phases for visuals of one arena.
pub struct FramePass<'a> {
    transforms: &'a Transforms,
    state: RenderState,
}

impl<'a> FramePass<'a> {
    pub fn new(transforms: &'a Transforms, state: RenderState) -> Self {
        Self { transforms, state }
    }

    #[inline]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Evaluates `visual` against `ctx`.
    ///
    /// `ctx` gets this pass' viewport, and its derived entries are replaced
    /// by the ones computed here; the caller may have added anything else
    /// (dpi, palettes) beforehand.
    pub fn run(&self, visual: &Visual, ctx: &mut EvalContext) -> Result<Frame> {
        ctx.set_viewport(self.state.viewport);
        ctx.clear_derived();

        let positions = self.value(&visual.positions, ctx)?;
        let n = positions.size() / 3;
        let positions = positions.reshape(vec![n, 3])?;
        let projected = glm::transform_points(&self.state.transform(), &positions)?;

        let depth: Vec<f64> = projected.as_slice().chunks_exact(3).map(|p| -p[2]).collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| depth[a].total_cmp(&depth[b]));

        let sorted = projected.take_rows(&order)?;
        let depth = Array::from_vec(order.iter().map(|&i| depth[i]).collect());
        let index = Array::from_vec(order.iter().map(|&i| i as f64).collect());

        let kind = visual.kind.as_str();
        ctx.inject(DerivedKey::Screen, kind, sorted.clone());
        ctx.inject(DerivedKey::Depth, kind, depth.clone());
        ctx.inject(DerivedKey::Index, kind, index.clone());
        match visual.kind {
            GeometryKind::Faces => ctx.inject(DerivedKey::Faces, kind, index),
            GeometryKind::Segments => ctx.inject(DerivedKey::Segments, kind, index),
            GeometryKind::Positions | GeometryKind::Paths => {}
        }

        let mut attributes = Vec::with_capacity(visual.variables.len());
        for (name, variable, variability) in &visual.variables {
            let value = self.value(variable, ctx)?;
            let attribute = match variability {
                Variability::Derived => Attribute::PerItem(value),
                Variability::PerItem if value.ndim() > 0 && value.len() == n => {
                    Attribute::PerItem(value.take_rows(&order)?)
                }
                Variability::PerItem | Variability::Uniform => Attribute::Uniform(value),
            };
            attributes.push((name.clone(), attribute));
        }

        log::debug!("frame pass: {n} {kind}, {} attributes", attributes.len());
        Ok(Frame { kind: visual.kind, positions: sorted, depth, order, attributes })
    }

    fn value(&self, variable: &Variable, ctx: &EvalContext) -> Result<Array> {
        match variable {
            Variable::Transform(id) => self.transforms.evaluate_array(*id, ctx),
            Variable::Value(bound) => bound.value()?.into_array(),
        }
    }
}
