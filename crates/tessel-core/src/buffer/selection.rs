//! Uniform-stride selections over a buffer's `[count, ..element shape]` axes.
//!
//! Only selections expressible as one start/step/len triple per axis are
//! writable. A list of indices along any axis ("fancy" indexing) touches an
//! arbitrary set of elements that has no single strided description, so
//! resolving one fails with [`Error::UnsupportedIndexing`].

use core::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{Error, Result};

/// One component of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Axis {
    /// A single position; negative values count from the end.
    Index(isize),
    /// Python-style slice with optional bounds and a non-zero step.
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    /// The whole axis (`:`).
    Full,
    /// Expands to as many `Full` axes as needed (`...`).
    Ellipsis,
    /// Index-set selection. Never resolvable.
    Indices(Vec<isize>),
}

impl Axis {
    #[inline]
    pub fn slice(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Axis::Slice { start, stop, step }
    }
}

/// A selection: one [`Axis`] per leading dimension.
///
/// Trailing dimensions that are not mentioned are selected whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection(pub Vec<Axis>);

impl Selection {
    /// Selects everything.
    #[inline]
    pub fn all() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn new(axes: Vec<Axis>) -> Self {
        Self(axes)
    }

    /// Appends one axis.
    #[inline]
    pub fn then(mut self, axis: Axis) -> Self {
        self.0.push(axis);
        self
    }
}

impl From<usize> for Selection {
    fn from(i: usize) -> Self {
        Selection(vec![Axis::Index(i as isize)])
    }
}

impl From<isize> for Selection {
    fn from(i: isize) -> Self {
        Selection(vec![Axis::Index(i)])
    }
}

impl From<Range<usize>> for Selection {
    fn from(r: Range<usize>) -> Self {
        Selection(vec![Axis::slice(Some(r.start as isize), Some(r.end as isize), 1)])
    }
}

impl From<RangeFrom<usize>> for Selection {
    fn from(r: RangeFrom<usize>) -> Self {
        Selection(vec![Axis::slice(Some(r.start as isize), None, 1)])
    }
}

impl From<RangeTo<usize>> for Selection {
    fn from(r: RangeTo<usize>) -> Self {
        Selection(vec![Axis::slice(None, Some(r.end as isize), 1)])
    }
}

impl From<RangeFull> for Selection {
    fn from(_: RangeFull) -> Self {
        Selection::all()
    }
}

impl From<Vec<Axis>> for Selection {
    fn from(axes: Vec<Axis>) -> Self {
        Selection(axes)
    }
}

/// Resolved positions along one axis: `start + k * step` for `k < len`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub step: isize,
    pub len: usize,
}

impl Span {
    #[inline]
    pub fn at(&self, k: usize) -> usize {
        (self.start as isize + k as isize * self.step) as usize
    }

    /// Lowest and highest position touched. Callers check `len > 0`.
    #[inline]
    pub fn bounds(&self) -> (usize, usize) {
        let last = self.at(self.len.saturating_sub(1));
        (self.start.min(last), self.start.max(last))
    }
}

static FULL: Axis = Axis::Full;

/// Resolves `selection` against `shape`, producing one span per axis.
pub(crate) fn resolve(selection: &Selection, shape: &[usize]) -> Result<Vec<Span>> {
    if selection.0.iter().any(|a| matches!(a, Axis::Indices(_))) {
        return Err(Error::UnsupportedIndexing);
    }

    let ellipses = selection.0.iter().filter(|a| matches!(a, Axis::Ellipsis)).count();
    let explicit = selection.0.len() - ellipses;
    if ellipses > 1 || explicit > shape.len() {
        return Err(Error::shape(shape, &[selection.0.len()]));
    }

    let mut axes: Vec<&Axis> = Vec::with_capacity(shape.len());
    for axis in &selection.0 {
        if matches!(axis, Axis::Ellipsis) {
            for _ in 0..shape.len() - explicit {
                axes.push(&FULL);
            }
        } else {
            axes.push(axis);
        }
    }
    while axes.len() < shape.len() {
        axes.push(&FULL);
    }

    axes.iter()
        .zip(shape)
        .enumerate()
        .map(|(i, (axis, &len))| resolve_axis(axis, i, len))
        .collect()
}

fn resolve_axis(axis: &Axis, index: usize, len: usize) -> Result<Span> {
    let n = len as isize;
    match *axis {
        Axis::Index(i) => {
            let j = if i < 0 { i + n } else { i };
            if j < 0 || j >= n {
                return Err(Error::IndexOutOfBounds { axis: index, index: i, len });
            }
            Ok(Span { start: j as usize, step: 1, len: 1 })
        }
        Axis::Full | Axis::Ellipsis => Ok(Span { start: 0, step: 1, len }),
        Axis::Slice { start, stop, step } => {
            if step == 0 {
                return Err(Error::UnsupportedIndexing);
            }
            let wrap = |v: isize| if v < 0 { v + n } else { v };
            if step > 0 {
                let lo = start.map(wrap).unwrap_or(0).clamp(0, n);
                let hi = stop.map(wrap).unwrap_or(n).clamp(0, n);
                let count = if hi > lo { (hi - lo + step - 1) / step } else { 0 };
                Ok(Span { start: lo as usize, step, len: count as usize })
            } else {
                let hi = start.map(wrap).unwrap_or(n - 1).clamp(-1, n - 1);
                let lo = stop.map(wrap).unwrap_or(-1).clamp(-1, n - 1);
                let count = if hi > lo { (hi - lo - step - 1) / -step } else { 0 };
                Ok(Span { start: hi.max(0) as usize, step, len: count as usize })
            }
        }
        Axis::Indices(_) => Err(Error::UnsupportedIndexing),
    }
}
