//! Declarative transform graphs.
//!
//! A transform is a chain of nodes stored in a [`Transforms`] arena. The
//! innermost node (the *terminal*) either carries bound data or is a context
//! reference; every outer node wraps the value produced by the node it
//! points to. Graphs are built once at setup time, with no evaluation, and
//! evaluated once per frame against an [`EvalContext`](crate::context::EvalContext).
//!
//! Composition never mutates an existing node:
//! - `apply(t, other)` returns a copy of `t` that reads `other` as its input;
//! - `apply_data(t, data)` returns a copy of `t` whose terminal is bound.
//!
//! ```
//! use tessel_core::context::{Canvas, EvalContext};
//! use tessel_core::transform::{Transforms, Unit};
//!
//! let mut t = Transforms::new();
//! let point = t.measure(Unit::Point);
//! let offset = t.scaled(point, [10.0, 20.0, 0.0]).unwrap();
//! let position = t.add([-1.0, -1.0, 0.0], offset).unwrap();
//!
//! let ctx = EvalContext::with_viewport(Canvas::default().viewport());
//! let ndc = t.evaluate_array(position, &ctx).unwrap();
//! assert_eq!(ndc.shape(), &[3]);
//! ```

mod accessor;
mod arena;
mod colormap;
mod eval;
pub mod measure;
mod node;

pub use accessor::component_index;
pub use arena::Transforms;
pub use measure::Unit;
pub use node::{Bound, Node, NodeKind, Operand, TransformId};
