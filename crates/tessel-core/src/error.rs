//! Error taxonomy shared by buffers, transforms and the frame pass.
//!
//! Every failure is local and synchronous. A failed evaluation aborts the
//! attribute being evaluated for the current frame; nothing is retried and
//! no partial style is applied.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Binding data onto a chain whose terminal node already holds a value.
    #[error("transform is already bound")]
    AlreadyBound,

    /// Evaluating a chain that carries no bound value anywhere.
    #[error("transform is not bound")]
    UnboundTransform,

    /// A measure was evaluated without `viewport`, `canvas` or `dpi`.
    #[error("missing context entry: {0}")]
    MissingContext(&'static str),

    /// A context reference points to a per-frame entry that was not injected.
    #[error("derived buffer not found: {key}{}", sub_key.as_ref().map(|s| format!("[{s:?}]")).unwrap_or_default())]
    MissingDerivedBuffer {
        key: &'static str,
        sub_key: Option<String>,
    },

    /// Accessor key matches neither a record field nor a component letter.
    #[error("unknown key {0:?}")]
    UnknownKey(String),

    /// List-of-indices selections cannot be expressed as one byte interval.
    #[error("fancy indexing is not supported")]
    UnsupportedIndexing,

    /// The terminal node of a chain cannot take further input.
    #[error("{0} transform cannot be composed")]
    NotComposable(&'static str),

    /// Arrays could not be broadcast together, or data does not fit a selection.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// A record value was used where a plain array is required.
    #[error("expected a plain array, found a record")]
    RecordValue,

    /// Colormap name absent from the palette registry.
    #[error("unknown colormap {0:?}")]
    UnknownColormap(String),

    /// Index outside `[-len, len)` along some axis.
    #[error("index {index} out of bounds for axis {axis} with size {len}")]
    IndexOutOfBounds { axis: usize, index: isize, len: usize },

    /// Transform id that does not belong to the arena it was used with.
    #[error("unknown transform id {0}")]
    UnknownTransform(u32),

    /// Operation needs a contiguous buffer but was given a strided view.
    #[error("buffer is not contiguous")]
    NonContiguous,

    /// A view or raw update reaches past the end of its source.
    #[error("byte range {start}..{stop} exceeds buffer of {len} bytes")]
    OutOfRange { start: usize, stop: usize, len: usize },
}

impl Error {
    pub(crate) fn shape(left: &[usize], right: &[usize]) -> Self {
        Error::ShapeMismatch {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}
