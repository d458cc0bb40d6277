//! Concrete values produced by evaluation.
//!
//! [`Array`] is a dense row-major `f64` array with an explicit shape. It is
//! the common currency between buffers, literals and transforms: buffers
//! decode into it, transforms consume and produce it, backends read it.
//!
//! Arithmetic follows numpy broadcasting: shapes are right-aligned and any
//! axis of size 1 stretches to match the other operand.

use core::fmt;

use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::error::{Error, Result};

/// Dense n-dimensional array of `f64`.
///
/// A zero-dimensional array (`shape == []`) holds a single scalar. The inner
/// array is always kept in standard (row-major) layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(ArrayD<f64>);

impl Array {
    /// Builds an array from a shape and row-major data.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map(Self)
            .map_err(|_| Error::shape(&shape, &[len]))
    }

    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// One-dimensional array.
    #[inline]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self(Array1::from(data).into_dyn())
    }

    /// Two-dimensional array of `rows.len()` × `N`.
    pub fn from_rows<const N: usize>(rows: &[[f64; N]]) -> Self {
        Self(ArrayD::from_shape_fn(IxDyn(&[rows.len(), N]), |ix| rows[ix[0]][ix[1]]))
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        Self(ArrayD::zeros(IxDyn(&shape)))
    }

    /// Wraps an ndarray value, copying it into standard layout if needed.
    pub fn from_nd(array: ArrayD<f64>) -> Self {
        if array.is_standard_layout() {
            Self(array)
        } else {
            Self(array.as_standard_layout().into_owned())
        }
    }

    #[inline]
    pub fn as_nd(&self) -> &ArrayD<f64> {
        &self.0
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.ndim()
    }

    /// Total number of scalars.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Length along the first axis; a scalar counts as one item.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the trailing axis, `None` for scalars.
    #[inline]
    pub fn last_dim(&self) -> Option<usize> {
        self.shape().last().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice().unwrap_or_default()
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.0.into_iter().collect()
    }

    /// Reads the scalar at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.ndim() {
            return None;
        }
        self.0.get(index).copied()
    }

    /// Reinterprets the data with another shape of the same size.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self> {
        let from = self.shape().to_vec();
        self.0
            .into_shape_with_order(IxDyn(&shape))
            .map(Self)
            .map_err(|_| Error::shape(&shape, &from))
    }

    /// Applies `f` to every scalar.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_nd(self.0.mapv(f))
    }

    /// Smallest value, ignoring NaNs. `None` for empty arrays.
    pub fn min(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::min)
    }

    /// Largest value, ignoring NaNs. `None` for empty arrays.
    pub fn max(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::max)
    }

    /// Selects index `i` along the trailing axis (`a[..., i]`).
    pub fn component(&self, i: usize) -> Result<Self> {
        let Some(last) = self.last_dim() else {
            return Err(Error::IndexOutOfBounds { axis: 0, index: i as isize, len: 0 });
        };
        let axis = self.ndim() - 1;
        if i >= last {
            return Err(Error::IndexOutOfBounds { axis, index: i as isize, len: last });
        }
        Ok(Self::from_nd(self.0.index_axis(Axis(axis), i).to_owned()))
    }

    /// Reorders the first axis (`a[order]`).
    pub fn take_rows(&self, order: &[usize]) -> Result<Self> {
        let Some(&rows) = self.shape().first() else {
            return Err(Error::shape(self.shape(), &[order.len()]));
        };
        if let Some(&r) = order.iter().find(|&&r| r >= rows) {
            return Err(Error::IndexOutOfBounds { axis: 0, index: r as isize, len: rows });
        }
        Ok(Self::from_nd(self.0.select(Axis(0), order)))
    }
}

impl From<f64> for Array {
    fn from(value: f64) -> Self {
        Array::scalar(value)
    }
}

impl<const N: usize> From<[f64; N]> for Array {
    fn from(values: [f64; N]) -> Self {
        Array::from_vec(values.to_vec())
    }
}

impl From<Vec<f64>> for Array {
    fn from(values: Vec<f64>) -> Self {
        Array::from_vec(values)
    }
}

impl From<ArrayD<f64>> for Array {
    fn from(array: ArrayD<f64>) -> Self {
        Array::from_nd(array)
    }
}

/// Whether two shapes broadcast together under numpy rules.
fn broadcasts(a: &[usize], b: &[usize]) -> bool {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .all(|(&x, &y)| x == y || x == 1 || y == 1)
}

/// The four arithmetic operators a transform graph can express.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline]
    pub const fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    /// Applies the operator elementwise with numpy broadcasting.
    /// Division by zero yields inf/NaN.
    pub fn apply(self, left: &Array, right: &Array) -> Result<Array> {
        if !broadcasts(left.shape(), right.shape()) {
            return Err(Error::shape(left.shape(), right.shape()));
        }
        let (a, b) = (left.as_nd(), right.as_nd());
        let out = match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        };
        Ok(Array::from_nd(out))
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Named fields decoded from a record-typed buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Array)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Array)>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Array> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

/// Result of evaluating a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Array(Array),
    Record(Record),
}

impl Value {
    /// Unwraps a plain array; records are rejected.
    pub fn into_array(self) -> Result<Array> {
        match self {
            Value::Array(a) => Ok(a),
            Value::Record(_) => Err(Error::RecordValue),
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            Value::Record(_) => None,
        }
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}
