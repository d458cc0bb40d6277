//! Change-tracked typed storage.
//!
//! A [`Buffer`] is typed memory with view semantics. Every mutation records
//! the byte interval it touched, merged into a single dirty range held by the
//! root storage. An attached [`BufferSink`] receives `(offset, bytes)` for
//! that range synchronously, which is how incremental uploads (GPU, remote
//! renderer) stay in sync without re-sending whole buffers.

pub mod dtype;
pub mod selection;
pub mod sink;
pub mod structured;
pub mod tracked;

pub use dtype::{DType, Element, RecordField, RecordType, ScalarType};
pub use selection::{Axis, Selection};
pub use sink::{BufferSink, Mirror};
pub use structured::{Data, StructuredBuffer};
pub use tracked::{Buffer, DirtyRange};
