use glam::DMat4;

use crate::array::BinaryOp;
use crate::context::DerivedKey;
use crate::error::{Error, Result};

use super::measure::Unit;
use super::node::{Bound, Node, NodeKind, Operand, TransformId};

/// Arena owning every node of a set of transform graphs.
///
/// Individual nodes are never removed or mutated once referenced:
/// [`apply`](Self::apply) and [`apply_data`](Self::apply_data) work on fresh
/// copies, so a template can be reused by any number of consumers.
///
/// Graphs are meant to be built once at setup time; every composition
/// appends nodes. A caller that rebuilds graphs repeatedly can drop them all
/// with [`clear`](Self::clear), which invalidates every issued id.
#[derive(Debug, Clone, Default)]
pub struct Transforms {
    nodes: Vec<Node>,
}

impl Transforms {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: TransformId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(Error::UnknownTransform(id.0))
    }

    fn node_mut(&mut self, id: TransformId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(Error::UnknownTransform(id.0))
    }

    /// Drops every node. Ids issued before the call become stale.
    pub fn clear(&mut self) {
        log::debug!("dropping {} transform nodes", self.nodes.len());
        self.nodes.clear();
    }

    fn push(&mut self, node: Node) -> TransformId {
        let id = TransformId(self.nodes.len() as u32);
        log::trace!("transform {id}: {}", node.kind.name());
        self.nodes.push(node);
        id
    }

    // ── leaves ────────────────────────────────────────────────────────────

    /// Unbound pass-through node.
    pub fn identity(&mut self) -> TransformId {
        self.push(Node::new(NodeKind::Identity))
    }

    /// Pass-through node bound to `data`.
    pub fn bind(&mut self, data: impl Into<Bound>) -> TransformId {
        let mut node = Node::new(NodeKind::Identity);
        node.bound = Some(data.into());
        self.push(node)
    }

    /// Field or component accessor (`x y z w`, `r g b a`, or a field name).
    pub fn accessor(&mut self, key: impl Into<String>) -> TransformId {
        self.push(Node::new(NodeKind::Accessor(key.into())))
    }

    pub fn measure(&mut self, unit: Unit) -> TransformId {
        self.push(Node::new(NodeKind::Measure(unit)))
    }

    pub fn colormap(&mut self, palette: impl Into<String>) -> TransformId {
        self.push(Node::new(NodeKind::Colormap(palette.into())))
    }

    pub fn project(&mut self, matrix: DMat4) -> TransformId {
        self.push(Node::new(NodeKind::Project(matrix)))
    }

    /// Reference to `key[geometry]` in the context, optionally one component
    /// of it.
    pub fn context_ref(
        &mut self,
        key: DerivedKey,
        geometry: Option<&str>,
        component: Option<usize>,
    ) -> TransformId {
        self.push(Node::new(NodeKind::ContextRef {
            key,
            geometry: geometry.map(str::to_string),
            component,
        }))
    }

    pub fn screen(&mut self, geometry: Option<&str>) -> TransformId {
        self.context_ref(DerivedKey::Screen, geometry, None)
    }

    /// One axis of the screen coordinates (`0` = x, `1` = y, `2` = z).
    pub fn screen_axis(&mut self, geometry: Option<&str>, axis: usize) -> TransformId {
        self.context_ref(DerivedKey::Screen, geometry, Some(axis))
    }

    pub fn depth(&mut self, geometry: Option<&str>) -> TransformId {
        self.context_ref(DerivedKey::Depth, geometry, None)
    }

    pub fn faces(&mut self, geometry: Option<&str>) -> TransformId {
        self.context_ref(DerivedKey::Faces, geometry, None)
    }

    pub fn segments(&mut self, geometry: Option<&str>) -> TransformId {
        self.context_ref(DerivedKey::Segments, geometry, None)
    }

    pub fn index(&mut self, geometry: Option<&str>) -> TransformId {
        self.context_ref(DerivedKey::Index, geometry, None)
    }

    // ── operators ─────────────────────────────────────────────────────────

    /// Binary operator node. Node operands are copied, literals shared.
    pub fn operator(
        &mut self,
        op: BinaryOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Result<TransformId> {
        let left = self.copy_operand(left.into())?;
        let right = self.copy_operand(right.into())?;
        Ok(self.push(Node::new(NodeKind::Operator { op, left, right })))
    }

    pub fn add(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> Result<TransformId> {
        self.operator(BinaryOp::Add, left, right)
    }

    pub fn sub(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> Result<TransformId> {
        self.operator(BinaryOp::Sub, left, right)
    }

    pub fn mul(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> Result<TransformId> {
        self.operator(BinaryOp::Mul, left, right)
    }

    pub fn div(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> Result<TransformId> {
        self.operator(BinaryOp::Div, left, right)
    }

    /// `value * unit`: binds a literal length into a measure.
    pub fn scaled(&mut self, measure: TransformId, value: impl Into<Bound>) -> Result<TransformId> {
        self.apply_data(measure, value)
    }

    // ── structure ─────────────────────────────────────────────────────────

    /// Root template `id` derives from (`id` itself for originals).
    pub fn base(&self, id: TransformId) -> Result<TransformId> {
        Ok(self.node(id)?.base.unwrap_or(id))
    }

    /// Innermost node of the chain starting at `id`.
    pub fn terminal(&self, id: TransformId) -> Result<TransformId> {
        let mut current = id;
        while let Some(next) = self.node(current)?.next {
            current = next;
        }
        Ok(current)
    }

    /// A chain is bound iff its terminal node carries a value.
    pub fn is_bound(&self, id: TransformId) -> Result<bool> {
        let terminal = self.terminal(id)?;
        Ok(self.node(terminal)?.bound.is_some())
    }

    /// Whether the chain ends in a context reference.
    pub fn is_jit(&self, id: TransformId) -> Result<bool> {
        let terminal = self.terminal(id)?;
        Ok(self.node(terminal)?.kind.is_context_ref())
    }

    /// Whether evaluating `id` reads a derived context entry anywhere.
    pub fn reads_context(&self, id: TransformId) -> Result<bool> {
        let node = self.node(id)?;
        if node.kind.is_context_ref() {
            return Ok(true);
        }
        if let NodeKind::Operator { left, right, .. } = &node.kind {
            for operand in [left, right] {
                if let Operand::Node(inner) = operand
                    && self.reads_context(*inner)?
                {
                    return Ok(true);
                }
            }
        }
        match node.next {
            Some(next) => self.reads_context(next),
            None => Ok(false),
        }
    }

    /// Item count of the data the chain is bound to.
    ///
    /// Operators report the larger of their operands. `None` when nothing
    /// is bound (context references, unbound chains).
    pub fn bound_len(&self, id: TransformId) -> Result<Option<usize>> {
        let terminal = self.terminal(id)?;
        let node = self.node(terminal)?;
        if let Some(bound) = &node.bound {
            return Ok(Some(bound.len()));
        }
        if let NodeKind::Operator { left, right, .. } = &node.kind {
            let l = self.operand_len(left)?;
            let r = self.operand_len(right)?;
            return Ok(l.max(r));
        }
        Ok(None)
    }

    fn operand_len(&self, operand: &Operand) -> Result<Option<usize>> {
        match operand {
            Operand::Node(id) => self.bound_len(*id),
            Operand::Value(bound) => Ok(Some(bound.len())),
        }
    }

    /// Duplicates the chain at `id`.
    ///
    /// The copy has the same kind and payload, `base` pointing at the source's
    /// root template, and recursively copied `next` and operator operands.
    /// Bound values are shared, not duplicated.
    pub fn copy(&mut self, id: TransformId) -> Result<TransformId> {
        let source = self.node(id)?.clone();
        let base = source.base.unwrap_or(id);
        let next = match source.next {
            Some(next) => Some(self.copy(next)?),
            None => None,
        };
        let kind = match source.kind {
            NodeKind::Operator { op, left, right } => NodeKind::Operator {
                op,
                left: self.copy_operand(left)?,
                right: self.copy_operand(right)?,
            },
            kind => kind,
        };
        Ok(self.push(Node { kind, base: Some(base), next, bound: source.bound }))
    }

    fn copy_operand(&mut self, operand: Operand) -> Result<Operand> {
        match operand {
            Operand::Node(id) => Ok(Operand::Node(self.copy(id)?)),
            value => Ok(value),
        }
    }

    /// Chains `other` into a copy of `id`: the copy reads a copy of `other`
    /// as its input, replacing whatever input `id` had, and loses any value
    /// it was bound to.
    pub fn apply(&mut self, id: TransformId, other: TransformId) -> Result<TransformId> {
        self.check_composable(id)?;
        let source = self.node(id)?.clone();

        let inner = self.copy(other)?;
        Ok(self.push(Node {
            kind: source.kind,
            base: Some(source.base.unwrap_or(id)),
            next: Some(inner),
            bound: None,
        }))
    }

    /// Binds `data` to the terminal of a copy of `id`.
    pub fn apply_data(&mut self, id: TransformId, data: impl Into<Bound>) -> Result<TransformId> {
        self.check_composable(id)?;
        if self.is_bound(id)? {
            return Err(Error::AlreadyBound);
        }

        let outer = self.copy(id)?;
        let terminal = self.terminal(outer)?;
        self.node_mut(terminal)?.bound = Some(data.into());
        Ok(outer)
    }

    fn check_composable(&self, id: TransformId) -> Result<()> {
        let terminal = self.terminal(id)?;
        match &self.node(terminal)?.kind {
            kind @ (NodeKind::ContextRef { .. } | NodeKind::Operator { .. }) => {
                Err(Error::NotComposable(kind.name()))
            }
            _ => Ok(()),
        }
    }
}
