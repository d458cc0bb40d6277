use core::fmt;
use std::rc::Rc;

use glam::DMat4;

use crate::array::{Array, BinaryOp, Value};
use crate::buffer::Buffer;
use crate::context::DerivedKey;
use crate::error::Result;

use super::measure::Unit;

/// Index of a node inside a [`Transforms`](super::Transforms) arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub(crate) u32);

impl TransformId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Data a chain can be bound to. Clones share the underlying storage.
#[derive(Debug, Clone)]
pub enum Bound {
    Buffer(Buffer),
    Array(Rc<Array>),
}

impl Bound {
    /// Current value: a buffer is read at call time.
    pub fn value(&self) -> Result<Value> {
        match self {
            Bound::Buffer(b) => b.value(),
            Bound::Array(a) => Ok(Value::Array(Array::clone(a))),
        }
    }

    /// Number of items along the first axis.
    pub fn len(&self) -> usize {
        match self {
            Bound::Buffer(b) => b.count(),
            Bound::Array(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Buffer> for Bound {
    fn from(buffer: Buffer) -> Self {
        Bound::Buffer(buffer)
    }
}

impl From<&Buffer> for Bound {
    fn from(buffer: &Buffer) -> Self {
        Bound::Buffer(buffer.clone())
    }
}

impl From<Array> for Bound {
    fn from(array: Array) -> Self {
        Bound::Array(Rc::new(array))
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Array::scalar(value).into()
    }
}

impl<const N: usize> From<[f64; N]> for Bound {
    fn from(values: [f64; N]) -> Self {
        Array::from(values).into()
    }
}

/// Operand of a binary operator: another chain or a literal.
#[derive(Debug, Clone)]
pub enum Operand {
    Node(TransformId),
    Value(Bound),
}

impl From<TransformId> for Operand {
    fn from(id: TransformId) -> Self {
        Operand::Node(id)
    }
}

impl From<Bound> for Operand {
    fn from(bound: Bound) -> Self {
        Operand::Value(bound)
    }
}

impl From<Buffer> for Operand {
    fn from(buffer: Buffer) -> Self {
        Operand::Value(buffer.into())
    }
}

impl From<&Buffer> for Operand {
    fn from(buffer: &Buffer) -> Self {
        Operand::Value(buffer.into())
    }
}

impl From<Array> for Operand {
    fn from(array: Array) -> Self {
        Operand::Value(array.into())
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Value(value.into())
    }
}

impl<const N: usize> From<[f64; N]> for Operand {
    fn from(values: [f64; N]) -> Self {
        Operand::Value(values.into())
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Passes its input through.
    Identity,
    Operator {
        op: BinaryOp,
        left: Operand,
        right: Operand,
    },
    /// Record field, or trailing-axis component (`x y z w` / `r g b a`).
    Accessor(String),
    /// Unit conversion to normalized device coordinates.
    Measure(Unit),
    /// Reference to a per-frame derived entry of the context.
    ContextRef {
        key: DerivedKey,
        geometry: Option<String>,
        component: Option<usize>,
    },
    /// Normalizes the input and maps it through a named palette.
    Colormap(String),
    /// Homogeneous 4×4 transform of rows of three components.
    Project(DMat4),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Identity => "identity",
            NodeKind::Operator { .. } => "operator",
            NodeKind::Accessor(_) => "accessor",
            NodeKind::Measure(_) => "measure",
            NodeKind::ContextRef { .. } => "context reference",
            NodeKind::Colormap(_) => "colormap",
            NodeKind::Project(_) => "projection",
        }
    }

    /// Context references read the context only and never take an input.
    #[inline]
    pub fn is_context_ref(&self) -> bool {
        matches!(self, NodeKind::ContextRef { .. })
    }
}

/// One node of a transform chain.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Root template this node was copied from.
    pub base: Option<TransformId>,
    /// Inner transform, evaluated first.
    pub next: Option<TransformId>,
    pub bound: Option<Bound>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self { kind, base: None, next: None, bound: None }
    }
}
