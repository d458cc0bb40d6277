use crate::array::{Array, Value};
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::glm;

use super::arena::Transforms;
use super::node::{Node, NodeKind, Operand, TransformId};
use super::{accessor, colormap, measure};

impl Transforms {
    /// Evaluates the chain at `id` against `ctx`.
    ///
    /// Inner transforms run first. Bound buffers are read at call time, so
    /// mutations made between two evaluations are always visible.
    pub fn evaluate(&self, id: TransformId, ctx: &EvalContext) -> Result<Value> {
        self.eval_node(id, ctx)
            .inspect_err(|err| log::debug!("evaluating transform {id} failed: {err}"))
    }

    /// Like [`evaluate`](Self::evaluate), rejecting record results.
    pub fn evaluate_array(&self, id: TransformId, ctx: &EvalContext) -> Result<Array> {
        self.evaluate(id, ctx)?.into_array()
    }

    fn eval_node(&self, id: TransformId, ctx: &EvalContext) -> Result<Value> {
        let node = self.node(id)?;
        let out = match &node.kind {
            NodeKind::Identity => return self.input(node, ctx),
            NodeKind::Operator { op, left, right } => {
                let left = self.operand(left, ctx)?;
                let right = self.operand(right, ctx)?;
                op.apply(&left, &right)?
            }
            NodeKind::Accessor(key) => accessor::select(self.input(node, ctx)?, key, ctx)?,
            NodeKind::Measure(unit) => {
                let (scale, dpi) = measure::scale(ctx)?;
                let input = self.input(node, ctx)?.into_array()?;
                measure::convert(*unit, &input, scale, dpi)?
            }
            NodeKind::ContextRef { key, geometry, component } => {
                let entry = ctx.derived(*key, geometry.as_deref())?;
                match component {
                    Some(i) => entry.component(*i)?,
                    None => entry.clone(),
                }
            }
            NodeKind::Colormap(name) => {
                let input = self.input(node, ctx)?.into_array()?;
                colormap::apply(ctx.palettes(), name, &input)?
            }
            NodeKind::Project(matrix) => {
                let input = self.input(node, ctx)?.into_array()?;
                glm::transform_points(matrix, &input)?
            }
        };
        Ok(Value::Array(out))
    }

    /// Input of `node`: its inner transform, or else its bound value.
    fn input(&self, node: &Node, ctx: &EvalContext) -> Result<Value> {
        match (node.next, &node.bound) {
            (Some(next), _) => self.eval_node(next, ctx),
            (None, Some(bound)) => bound.value(),
            (None, None) => Err(Error::UnboundTransform),
        }
    }

    fn operand(&self, operand: &Operand, ctx: &EvalContext) -> Result<Array> {
        match operand {
            Operand::Node(id) => self.eval_node(*id, ctx)?.into_array(),
            Operand::Value(bound) => bound.value()?.into_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, DType, Element, RecordType, ScalarType};
    use crate::context::{Canvas, DerivedKey, Viewport};
    use crate::transform::Unit;

    fn ctx_512() -> EvalContext {
        EvalContext::with_viewport(Canvas::new(512.0, 512.0, 100.0).viewport())
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    // ── measures ──────────────────────────────────────────────────────────

    #[test]
    fn pixel_scale_on_vector_and_scalar() {
        let mut t = Transforms::new();
        let ctx = ctx_512();
        let px = t.measure(Unit::Pixel);

        let v = t.scaled(px, [1.0, 1.0]).unwrap();
        assert!(close(t.evaluate_array(v, &ctx).unwrap().as_slice(), &[2.0 / 512.0; 2]));

        let s = t.scaled(px, 1.0).unwrap();
        assert!(close(t.evaluate_array(s, &ctx).unwrap().as_slice(), &[2.0 / 512.0]));
    }

    #[test]
    fn inch_and_point_are_multiples_of_pixel() {
        let mut t = Transforms::new();
        let ctx = ctx_512();
        let pixel = 2.0 / 512.0;

        let inch = t.measure(Unit::Inch);
        let one_inch = t.scaled(inch, 1.0).unwrap();
        assert!(close(t.evaluate_array(one_inch, &ctx).unwrap().as_slice(), &[100.0 * pixel]));

        let point = t.measure(Unit::Point);
        let one_point = t.scaled(point, 1.0).unwrap();
        assert!(close(
            t.evaluate_array(one_point, &ctx).unwrap().as_slice(),
            &[100.0 / 72.0 * pixel]
        ));
    }

    #[test]
    fn measure_needs_a_viewport_canvas_or_dpi() {
        let mut t = Transforms::new();
        let px = t.measure(Unit::Pixel);
        let v = t.scaled(px, 1.0).unwrap();
        assert_eq!(
            t.evaluate(v, &EvalContext::new()),
            Err(Error::MissingContext("viewport"))
        );
    }

    #[test]
    fn offset_from_corner_in_points() {
        // [-1, -1, 0] + (10, 20, 0) * point
        let mut t = Transforms::new();
        let ctx = EvalContext::with_viewport(Viewport::new(0.0, 0.0, 720.0, 720.0, 72.0));
        let point = t.measure(Unit::Point);
        let offset = t.scaled(point, [10.0, 20.0, 0.0]).unwrap();
        let p = t.add([-1.0, -1.0, 0.0], offset).unwrap();
        let out = t.evaluate_array(p, &ctx).unwrap();
        assert!(close(out.as_slice(), &[-1.0 + 20.0 / 720.0, -1.0 + 40.0 / 720.0, 0.0]));
    }

    // ── chains ────────────────────────────────────────────────────────────

    #[test]
    fn inner_transform_runs_first() {
        // On a 512×256 viewport x and y scales differ, so the order shows.
        let mut t = Transforms::new();
        let ctx = EvalContext::with_viewport(Viewport::new(0.0, 0.0, 512.0, 256.0, 100.0));
        let positions = Array::from_rows(&[[0.0, 10.0, 0.0]]);

        let px = t.measure(Unit::Pixel);
        let y = t.accessor("y");
        let y_of = t.apply_data(y, positions).unwrap();
        let chained = t.apply(px, y_of).unwrap();

        let out = t.evaluate_array(chained, &ctx).unwrap();
        assert!(close(out.as_slice(), &[10.0 * 2.0 / 512.0]));
    }

    #[test]
    fn applying_data_node_replaces_the_chained_input() {
        let mut t = Transforms::new();
        let ctx = ctx_512();
        let px = t.measure(Unit::Pixel);
        let x = t.accessor("x");
        let px_of_x = t.apply(px, x).unwrap();
        let data = t.bind([1.0, 2.0]);

        let rechained = t.apply(px_of_x, data).unwrap();
        let out = t.evaluate_array(rechained, &ctx).unwrap();
        assert_eq!(out.shape(), &[2]);
        assert!(close(out.as_slice(), &[2.0 / 512.0, 4.0 / 512.0]));
    }

    #[test]
    fn rebinding_a_copy_leaves_the_original() {
        let mut t = Transforms::new();
        let ctx = EvalContext::new();
        let first = Buffer::new(2, DType::vec(ScalarType::F32, 2));
        first.write(.., [1.0, 2.0, 3.0, 4.0]).unwrap();
        let second = Buffer::new(2, DType::vec(ScalarType::F32, 2));
        second.write(.., [5.0, 6.0, 7.0, 8.0]).unwrap();

        let x = t.accessor("x");
        let a = t.apply_data(x, &first).unwrap();
        let template = t.copy(x).unwrap();
        let b = t.apply_data(template, &second).unwrap();

        assert_eq!(t.evaluate_array(a, &ctx).unwrap().as_slice(), &[1.0, 3.0]);
        assert_eq!(t.evaluate_array(b, &ctx).unwrap().as_slice(), &[5.0, 7.0]);
        assert_eq!(t.evaluate(x, &ctx), Err(Error::UnboundTransform));
    }

    #[test]
    fn buffer_mutations_are_seen_on_next_evaluation() {
        let mut t = Transforms::new();
        let ctx = EvalContext::new();
        let sizes = Buffer::new(3, DType::scalar(ScalarType::F32));
        let leaf = t.bind(&sizes);
        let doubled = t.mul(leaf, 2.0).unwrap();

        assert_eq!(t.evaluate_array(doubled, &ctx).unwrap().as_slice(), &[0.0; 3]);
        sizes.write(1usize, 4.0).unwrap();
        assert_eq!(t.evaluate_array(doubled, &ctx).unwrap().as_slice(), &[0.0, 8.0, 0.0]);
    }

    #[test]
    fn record_field_through_accessor() {
        let mut t = Transforms::new();
        let record = RecordType::packed([
            ("position", Element::new(ScalarType::F32, vec![2])),
            ("size", Element::new(ScalarType::F32, vec![])),
        ]);
        let vertices = Buffer::new(2, record);
        vertices.field("size").unwrap().write(.., [3.0, 4.0]).unwrap();

        let size = t.accessor("size");
        let bound = t.apply_data(size, &vertices).unwrap();
        let out = t.evaluate_array(bound, &EvalContext::new()).unwrap();
        assert_eq!(out.as_slice(), &[3.0, 4.0]);

        let leaf = t.bind(&vertices);
        assert_eq!(t.evaluate_array(leaf, &EvalContext::new()), Err(Error::RecordValue));
    }

    // ── operators ─────────────────────────────────────────────────────────

    #[test]
    fn arithmetic_broadcasts() {
        let mut t = Transforms::new();
        let ctx = EvalContext::new();
        let rows = t.bind(Array::from_rows(&[[1.0, 2.0], [3.0, 4.0]]));
        let shifted = t.sub(rows, [1.0, 2.0]).unwrap();
        let scaled = t.div(shifted, 2.0).unwrap();
        let out = t.evaluate_array(scaled, &ctx).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_slice(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn division_by_zero_propagates() {
        let mut t = Transforms::new();
        let q = t.div(1.0, 0.0).unwrap();
        let out = t.evaluate_array(q, &EvalContext::new()).unwrap();
        assert!(out.as_slice()[0].is_infinite());
    }

    #[test]
    fn unbound_operand_fails() {
        let mut t = Transforms::new();
        let x = t.accessor("x");
        let sum = t.add(x, 1.0).unwrap();
        assert_eq!(t.evaluate(sum, &EvalContext::new()), Err(Error::UnboundTransform));
    }

    // ── colormaps ─────────────────────────────────────────────────────────

    #[test]
    fn colormap_black_to_white() {
        let mut t = Transforms::new();
        let cmap = t.colormap("gray");
        let bound = t.apply_data(cmap, [0.0, 5.0, 10.0]).unwrap();
        let out = t.evaluate_array(bound, &EvalContext::new()).unwrap();
        assert_eq!(
            out.as_slice(),
            &[0.0, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn custom_palette_from_context() {
        use crate::paint::{Color, Palette};

        let mut t = Transforms::new();
        let mut ctx = EvalContext::new();
        let green_to_red = Palette::uniform(&[Color::rgb(0.0, 1.0, 0.0), Color::rgb(1.0, 0.0, 0.0)]);
        ctx.register_palette("traffic", green_to_red);
        let cmap = t.colormap("traffic");
        let bound = t.apply_data(cmap, [1.0, 2.0]).unwrap();
        let out = t.evaluate_array(bound, &ctx).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);

        let unknown = t.colormap("nope");
        let unknown = t.apply_data(unknown, 1.0).unwrap();
        assert_eq!(t.evaluate(unknown, &ctx), Err(Error::UnknownColormap("nope".into())));
    }

    // ── context references ────────────────────────────────────────────────

    #[test]
    fn depth_before_and_after_injection() {
        let mut t = Transforms::new();
        let mut ctx = EvalContext::new();
        let depth = t.depth(Some("faces"));

        assert_eq!(
            t.evaluate(depth, &ctx),
            Err(Error::MissingDerivedBuffer { key: "depth", sub_key: Some("faces".into()) })
        );

        ctx.inject(DerivedKey::Depth, "faces", Array::from([0.1, 0.2]));
        assert_eq!(t.evaluate_array(depth, &ctx).unwrap().as_slice(), &[0.1, 0.2]);
    }

    #[test]
    fn screen_axis_selects_component() {
        let mut t = Transforms::new();
        let mut ctx = EvalContext::new();
        ctx.inject(
            DerivedKey::Screen,
            "positions",
            Array::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]),
        );
        let sy = t.screen_axis(Some("positions"), 1);
        assert_eq!(t.evaluate_array(sy, &ctx).unwrap().as_slice(), &[2.0, 5.0]);
    }

    #[test]
    fn colormap_of_depth() {
        let mut t = Transforms::new();
        let mut ctx = EvalContext::new();
        ctx.inject(DerivedKey::Depth, "positions", Array::from([2.0, 4.0]));

        let cmap = t.colormap("gray");
        let depth = t.depth(Some("positions"));
        let shaded = t.apply(cmap, depth).unwrap();
        let out = t.evaluate_array(shaded, &ctx).unwrap();
        assert_eq!(out.shape(), &[2, 4]);
        assert_eq!(out.as_slice()[4..], [1.0, 1.0, 1.0, 1.0]);
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn projection_divides_by_w() {
        let mut t = Transforms::new();
        let proj = t.project(glm::perspective(90.0, 1.0, 1.0, 10.0));
        let bound = t.apply_data(proj, Array::from_rows(&[[1.0, 1.0, -2.0]])).unwrap();
        let out = t.evaluate_array(bound, &EvalContext::new()).unwrap();
        assert!(close(&out.as_slice()[..2], &[0.5, 0.5]));
    }
}
