use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::array::{Array, Record, Value};
use crate::error::{Error, Result};

use super::dtype::{DType, Element};
use super::selection::{self, Axis, Selection, Span};
use super::sink::BufferSink;

/// Half-open byte interval `[start, stop)` in root storage coordinates.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DirtyRange {
    pub start: usize,
    pub stop: usize,
}

impl DirtyRange {
    #[inline]
    pub const fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.stop - self.start
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.stop <= self.start
    }

    /// Smallest interval covering both.
    #[inline]
    pub fn union(self, other: DirtyRange) -> DirtyRange {
        DirtyRange {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }
}

/// Root storage shared by an owning buffer and all of its views.
///
/// Dirty state and the sink live here, so every view of the same storage
/// observes and extends one range. New storage is dirty over its whole
/// extent, so the initial contents reach a sink with the first push.
struct Storage {
    nbytes: usize,
    bytes: RefCell<Vec<u8>>,
    materialized: Cell<bool>,
    seed: RefCell<Option<Vec<u8>>>,
    dirty: Cell<Option<DirtyRange>>,
    sink: RefCell<Option<Box<dyn BufferSink>>>,
}

impl Storage {
    fn new(nbytes: usize, seed: Option<Vec<u8>>) -> Self {
        Self {
            nbytes,
            bytes: RefCell::new(Vec::new()),
            materialized: Cell::new(false),
            seed: RefCell::new(seed),
            dirty: Cell::new((nbytes > 0).then(|| DirtyRange::new(0, nbytes))),
            sink: RefCell::new(None),
        }
    }

    /// Allocates zeroed storage (or copies the seed) on first access.
    fn materialize(&self) {
        if self.materialized.get() {
            return;
        }
        let mut bytes = self.bytes.borrow_mut();
        *bytes = vec![0; self.nbytes];
        if let Some(seed) = self.seed.borrow_mut().take() {
            let n = seed.len().min(self.nbytes);
            bytes[..n].copy_from_slice(&seed[..n]);
        }
        self.materialized.set(true);
        log::trace!("materialized {} bytes", self.nbytes);
    }

    fn mark(&self, range: DirtyRange) {
        let merged = match self.dirty.get() {
            Some(current) => current.union(range),
            None => range,
        };
        self.dirty.set(Some(merged));
    }

    /// Pushes the dirty range to the sink, if any, then clears it.
    fn flush(&self) {
        let mut sink = self.sink.borrow_mut();
        let (Some(sink), Some(range)) = (sink.as_mut(), self.dirty.get()) else {
            return;
        };
        let bytes = self.bytes.borrow();
        log::trace!("sink push {}..{} ({} bytes)", range.start, range.stop, range.len());
        sink.accept(range.start, &bytes[range.start..range.stop]);
        self.dirty.set(None);
    }
}

struct Inner {
    storage: Rc<Storage>,
    count: usize,
    dtype: DType,
    /// Byte offset of the first element in root storage.
    offset: usize,
    /// Byte distance between consecutive elements.
    stride: usize,
    source: Option<Buffer>,
    key: Option<String>,
}

/// Typed, change-tracked storage.
///
/// A buffer either owns its storage or is a view of another buffer (a byte
/// range reinterpreted with another type, or one field of a record type).
/// Views never own bytes: reads and writes go straight to the root storage,
/// and dirty state is tracked once, at the root.
///
/// Cloning a `Buffer` is cheap and yields another handle to the same
/// buffer. Storage is allocated zero-filled on first read or write.
///
/// ```
/// use tessel_core::buffer::{Buffer, DType, ScalarType};
///
/// let positions = Buffer::new(10, DType::vec(ScalarType::F32, 3));
/// assert_eq!(positions.dirty().map(|r| (r.start, r.stop)), Some((0, 120)));
///
/// positions.clear();
/// positions.write(2..5usize, 1.0).unwrap();
/// assert_eq!(positions.dirty().map(|r| (r.start, r.stop)), Some((24, 60)));
/// ```
#[derive(Clone)]
pub struct Buffer {
    inner: Rc<Inner>,
}

impl Buffer {
    /// Creates a buffer owning `count` zero-initialized elements.
    pub fn new(count: usize, dtype: impl Into<DType>) -> Self {
        let dtype = dtype.into();
        let nbytes = count * dtype.itemsize();
        Self::owning(count, dtype, None, nbytes)
    }

    /// Creates an owning buffer whose storage starts as a copy of `bytes`.
    ///
    /// Missing trailing bytes are zero; extra bytes are ignored.
    pub fn from_bytes(count: usize, dtype: impl Into<DType>, bytes: Vec<u8>) -> Self {
        let dtype = dtype.into();
        let nbytes = count * dtype.itemsize();
        Self::owning(count, dtype, Some(bytes), nbytes)
    }

    fn owning(count: usize, dtype: DType, seed: Option<Vec<u8>>, nbytes: usize) -> Self {
        let stride = dtype.itemsize();
        Self {
            inner: Rc::new(Inner {
                storage: Rc::new(Storage::new(nbytes, seed)),
                count,
                dtype,
                offset: 0,
                stride,
                source: None,
                key: None,
            }),
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.inner.count
    }

    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.inner.dtype
    }

    /// Byte offset of the first element in root storage.
    #[inline]
    pub fn offset(&self) -> usize {
        self.inner.offset
    }

    /// Field name when this buffer is a field of a record buffer.
    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    /// The buffer this one is a view of.
    #[inline]
    pub fn source(&self) -> Option<&Buffer> {
        self.inner.source.as_ref()
    }

    #[inline]
    pub fn is_view(&self) -> bool {
        self.inner.source.is_some()
    }

    /// Whether elements are packed back to back.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.inner.stride == self.inner.dtype.itemsize()
    }

    /// Bytes covered by this buffer's elements.
    #[inline]
    pub fn nbytes(&self) -> usize {
        self.inner.count * self.inner.dtype.itemsize()
    }

    #[inline]
    pub fn is_materialized(&self) -> bool {
        self.inner.storage.materialized.get()
    }

    /// True if both handles refer to the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// True if both buffers read and write the same root storage.
    #[inline]
    pub fn shares_storage(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.inner.storage, &other.inner.storage)
    }

    /// `[count, ..element shape]`; record buffers are one-dimensional.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.inner.count];
        if let DType::Element(e) = &self.inner.dtype {
            shape.extend_from_slice(&e.shape);
        }
        shape
    }

    fn element(&self) -> Result<&Element> {
        self.inner.dtype.as_element().ok_or(Error::RecordValue)
    }

    /// A contiguous view of `count` elements of `dtype`, starting `offset`
    /// bytes into this buffer.
    pub fn view(&self, offset: usize, count: usize, dtype: impl Into<DType>) -> Result<Buffer> {
        if !self.is_contiguous() {
            return Err(Error::NonContiguous);
        }
        let dtype = dtype.into();
        let stop = offset + count * dtype.itemsize();
        if stop > self.nbytes() {
            return Err(Error::OutOfRange { start: offset, stop, len: self.nbytes() });
        }
        let stride = dtype.itemsize();
        Ok(Buffer {
            inner: Rc::new(Inner {
                storage: Rc::clone(&self.inner.storage),
                count,
                dtype,
                offset: self.inner.offset + offset,
                stride,
                source: Some(self.clone()),
                key: None,
            }),
        })
    }

    /// A view of one field of a record buffer. Shares storage and stride.
    pub fn field(&self, name: &str) -> Result<Buffer> {
        let DType::Record(record) = &self.inner.dtype else {
            return Err(Error::UnknownKey(name.to_string()));
        };
        let field = record.field(name).ok_or_else(|| Error::UnknownKey(name.to_string()))?;
        Ok(Buffer {
            inner: Rc::new(Inner {
                storage: Rc::clone(&self.inner.storage),
                count: self.inner.count,
                dtype: DType::Element(field.element.clone()),
                offset: self.inner.offset + field.offset,
                stride: self.inner.stride,
                source: Some(self.clone()),
                key: Some(field.name.clone()),
            }),
        })
    }

    /// Current contents, shaped `[count, ..element shape]`.
    ///
    /// Record buffers have no single array form; use [`value`](Self::value).
    pub fn read(&self) -> Result<Array> {
        let element = self.element()?;
        let storage = &self.inner.storage;
        storage.materialize();

        let bytes = storage.bytes.borrow();
        let scalar = element.scalar;
        let n = element.components();
        let mut data = Vec::with_capacity(self.inner.count * n);
        for i in 0..self.inner.count {
            let base = self.inner.offset + i * self.inner.stride;
            for c in 0..n {
                data.push(scalar.decode(&bytes[base + c * scalar.size()..]));
            }
        }
        Array::new(self.shape(), data)
    }

    /// Current contents as a [`Value`]; record buffers decode field by field.
    pub fn value(&self) -> Result<Value> {
        match &self.inner.dtype {
            DType::Element(_) => self.read().map(Value::Array),
            DType::Record(record) => {
                let fields = record
                    .fields()
                    .iter()
                    .map(|f| Ok((f.name.clone(), self.field(&f.name)?.read()?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Record(Record::new(fields)))
            }
        }
    }

    /// Raw bytes of this buffer's elements, gathered in element order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let storage = &self.inner.storage;
        storage.materialize();
        let bytes = storage.bytes.borrow();
        let itemsize = self.inner.dtype.itemsize();
        let mut out = Vec::with_capacity(self.nbytes());
        for i in 0..self.inner.count {
            let base = self.inner.offset + i * self.inner.stride;
            out.extend_from_slice(&bytes[base..base + itemsize]);
        }
        out
    }

    /// Writes `data` into the selected elements.
    ///
    /// `data` is either a single value (broadcast to the whole selection) or
    /// holds exactly one value per selected scalar, in row-major selection
    /// order. The touched byte extent is merged into the root's dirty range
    /// and pushed to the sink, if one is attached.
    ///
    /// Fails with [`Error::UnsupportedIndexing`] for list-of-indices
    /// selections, which have no single contiguous byte extent.
    pub fn write(&self, selection: impl Into<Selection>, data: impl Into<Array>) -> Result<()> {
        let element = self.element()?;
        let spans = selection::resolve(&selection.into(), &self.shape())?;
        let data = data.into();

        let selected: usize = spans.iter().map(|s| s.len).product();
        if data.size() != 1 && data.size() != selected {
            return Err(Error::shape(&[selected], data.shape()));
        }
        if selected == 0 {
            return Ok(());
        }

        let scalar = element.scalar;
        let strides = self.axis_strides(element);
        let storage = &self.inner.storage;
        storage.materialize();
        {
            let mut bytes = storage.bytes.borrow_mut();
            let values = data.as_slice();
            let mut counter = vec![0usize; spans.len()];
            for k in 0..selected {
                let at = self.byte_at(&spans, &strides, &counter);
                let v = if values.len() == 1 { values[0] } else { values[k] };
                scalar.encode(v, &mut bytes[at..at + scalar.size()]);
                advance(&mut counter, &spans);
            }
        }

        let (lo, hi) = spans.iter().zip(&strides).fold(
            (self.inner.offset, self.inner.offset),
            |(lo, hi), (span, stride)| {
                let (a, b) = span.bounds();
                (lo + a * stride, hi + b * stride)
            },
        );
        self.touch(DirtyRange::new(lo, hi + scalar.size()));
        Ok(())
    }

    /// Writes the components named by `keys` in every element (`"xy"`,
    /// `"bgr"`, `"wzyx"`).
    ///
    /// Letters come from one of `xyzw` or `rgba`. `data` is a single value
    /// for all named components, a trailing axis of 1 holding one value per
    /// element, or a trailing axis of `keys.len()` with one column per letter.
    pub fn write_components(&self, keys: &str, data: impl Into<Array>) -> Result<()> {
        let shape = self.shape();
        let width = match shape.as_slice() {
            [_, .., last] => *last,
            _ => return Err(Error::UnknownKey(keys.to_string())),
        };
        let indices = swizzle(keys)?;
        if let Some(&i) = indices.iter().find(|&&i| i >= width) {
            let axis = shape.len() - 1;
            return Err(Error::IndexOutOfBounds { axis, index: i as isize, len: width });
        }

        let data = data.into();
        let column = |i: usize| Selection::new(vec![Axis::Ellipsis, Axis::Index(i as isize)]);
        match data.last_dim() {
            None | Some(1) => {
                for &i in &indices {
                    self.write(column(i), data.clone())?;
                }
            }
            Some(n) if n == indices.len() => {
                for (t, &i) in indices.iter().enumerate() {
                    self.write(column(i), data.component(t)?)?;
                }
            }
            Some(_) => return Err(Error::shape(&[indices.len()], data.shape())),
        }
        Ok(())
    }

    /// Overwrites raw bytes starting `offset` bytes into this buffer.
    pub fn set_data(&self, offset: usize, data: &[u8]) -> Result<()> {
        if !self.is_contiguous() {
            return Err(Error::NonContiguous);
        }
        if data.is_empty() {
            return Ok(());
        }
        let start = self.inner.offset + offset;
        let stop = start + data.len();
        if offset + data.len() > self.nbytes() {
            return Err(Error::OutOfRange {
                start: offset,
                stop: offset + data.len(),
                len: self.nbytes(),
            });
        }
        let storage = &self.inner.storage;
        storage.materialize();
        storage.bytes.borrow_mut()[start..stop].copy_from_slice(data);
        self.touch(DirtyRange::new(start, stop));
        Ok(())
    }

    /// Dirty range of the root storage, if anything changed since the last clear.
    #[inline]
    pub fn dirty(&self) -> Option<DirtyRange> {
        self.inner.storage.dirty.get()
    }

    /// Forgets the root's dirty range.
    #[inline]
    pub fn clear(&self) {
        self.inner.storage.dirty.set(None);
    }

    /// Attaches a sink to the root storage, replacing any previous one.
    ///
    /// From now on every mutation is pushed to `sink` immediately.
    pub fn set_sink(&self, sink: impl BufferSink + 'static) {
        *self.inner.storage.sink.borrow_mut() = Some(Box::new(sink));
    }

    /// Detaches and returns the root's sink.
    pub fn take_sink(&self) -> Option<Box<dyn BufferSink>> {
        self.inner.storage.sink.borrow_mut().take()
    }

    #[inline]
    pub fn has_sink(&self) -> bool {
        self.inner.storage.sink.borrow().is_some()
    }

    fn touch(&self, range: DirtyRange) {
        let storage = &self.inner.storage;
        storage.mark(range);
        storage.flush();
    }

    /// Byte stride of every axis of `[count, ..element shape]`.
    fn axis_strides(&self, element: &Element) -> Vec<usize> {
        let mut strides = vec![0; element.shape.len()];
        let mut acc = element.scalar.size();
        for i in (0..element.shape.len()).rev() {
            strides[i] = acc;
            acc *= element.shape[i];
        }
        let mut all = Vec::with_capacity(strides.len() + 1);
        all.push(self.inner.stride);
        all.extend(strides);
        all
    }

    fn byte_at(&self, spans: &[Span], strides: &[usize], counter: &[usize]) -> usize {
        self.inner.offset
            + counter
                .iter()
                .zip(spans)
                .zip(strides)
                .map(|((&k, span), stride)| span.at(k) * stride)
                .sum::<usize>()
    }
}

/// Row-major increment of a multi-index over `spans`.
/// Component indices for a swizzle key drawn from a single letter set.
fn swizzle(keys: &str) -> Result<Vec<usize>> {
    const SETS: [&str; 2] = ["xyzw", "rgba"];
    SETS.iter()
        .find_map(|set| keys.chars().map(|c| set.find(c)).collect::<Option<Vec<_>>>())
        .filter(|indices| !indices.is_empty())
        .ok_or_else(|| Error::UnknownKey(keys.to_string()))
}

fn advance(counter: &mut [usize], spans: &[Span]) {
    for axis in (0..counter.len()).rev() {
        counter[axis] += 1;
        if counter[axis] < spans[axis].len {
            return;
        }
        counter[axis] = 0;
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({}, {}", self.inner.count, self.inner.dtype)?;
        if let Some(key) = &self.inner.key {
            write!(f, ", key={key:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::dtype::{RecordType, ScalarType};
    use crate::buffer::selection::Axis;
    use crate::buffer::sink::Mirror;

    /// Cleared right away, so extents start from nothing.
    fn vec3(count: usize) -> Buffer {
        clean(Buffer::new(count, DType::vec(ScalarType::F32, 3)))
    }

    fn clean(b: Buffer) -> Buffer {
        b.clear();
        b
    }

    // ── materialization ───────────────────────────────────────────────────

    #[test]
    fn storage_is_lazy_and_zeroed() {
        let b = Buffer::new(4, DType::vec(ScalarType::F32, 3));
        assert!(!b.is_materialized());
        assert_eq!(b.dirty(), Some(DirtyRange::new(0, 48)));
        let a = b.read().unwrap();
        assert!(b.is_materialized());
        assert_eq!(a.shape(), &[4, 3]);
        assert!(a.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(b.dirty(), Some(DirtyRange::new(0, 48)));
    }

    #[test]
    fn empty_storage_starts_clean() {
        assert_eq!(Buffer::new(0, DType::scalar(ScalarType::F32)).dirty(), None);
    }

    #[test]
    fn seeded_storage_is_copied() {
        let bytes = bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0]).to_vec();
        let b = Buffer::from_bytes(2, DType::scalar(ScalarType::F32), bytes);
        assert_eq!(b.read().unwrap().as_slice(), &[1.0, 2.0]);
    }

    // ── dirty extents ─────────────────────────────────────────────────────

    #[test]
    fn row_slice_extent() {
        let b = vec3(10);
        b.write(2..5usize, 1.0).unwrap();
        assert_eq!(b.dirty(), Some(DirtyRange::new(24, 60)));
    }

    #[test]
    fn single_row_extent() {
        let b = vec3(10);
        b.write(3usize, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(b.dirty(), Some(DirtyRange::new(36, 48)));
        assert_eq!(b.read().unwrap().get(&[3, 1]), Some(2.0));
    }

    #[test]
    fn column_extent_spans_first_to_last_touched_scalar() {
        let b = vec3(10);
        b.write(Selection::new(vec![Axis::Ellipsis, Axis::Index(1)]), 7.0).unwrap();
        // y of row 0 starts at byte 4, y of row 9 ends at 9 * 12 + 8.
        assert_eq!(b.dirty(), Some(DirtyRange::new(4, 116)));
    }

    #[test]
    fn ellipsis_single_index_writes_one_scalar() {
        let b = clean(Buffer::new(8, DType::scalar(ScalarType::F32)));
        b.write(Selection::new(vec![Axis::Ellipsis, Axis::Index(-1)]), 5.0).unwrap();
        assert_eq!(b.dirty(), Some(DirtyRange::new(28, 32)));
        assert_eq!(b.read().unwrap().as_slice()[7], 5.0);
    }

    #[test]
    fn reversed_slice_extent() {
        let b = clean(Buffer::new(6, DType::scalar(ScalarType::F64)));
        b.write(Selection::new(vec![Axis::slice(Some(4), Some(0), -2)]), 1.0).unwrap();
        // touches elements 4 and 2
        assert_eq!(b.dirty(), Some(DirtyRange::new(16, 40)));
    }

    #[test]
    fn writes_merge_by_union() {
        let b = vec3(10);
        b.write(1usize, 1.0).unwrap();
        b.write(6usize, 1.0).unwrap();
        assert_eq!(b.dirty(), Some(DirtyRange::new(12, 84)));
    }

    #[test]
    fn clear_then_read_stays_clean() {
        let b = vec3(4);
        b.write(.., 1.0).unwrap();
        assert_eq!(b.dirty(), Some(DirtyRange::new(0, 48)));
        b.clear();
        let _ = b.read().unwrap();
        assert_eq!(b.dirty(), None);
    }

    #[test]
    fn fancy_write_fails_and_leaves_state_untouched() {
        let b = vec3(4);
        let err = b.write(Selection::new(vec![Axis::Indices(vec![0, 2])]), 1.0);
        assert_eq!(err, Err(Error::UnsupportedIndexing));
        assert_eq!(b.dirty(), None);
        assert!(b.read().unwrap().as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn data_length_must_match_selection() {
        let b = vec3(4);
        assert!(matches!(
            b.write(0usize, [1.0, 2.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    // ── components ────────────────────────────────────────────────────────

    #[test]
    fn component_columns_from_pairs() {
        let b = vec3(3);
        b.write_components("xy", Array::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]))
            .unwrap();
        assert_eq!(
            b.read().unwrap().as_slice(),
            &[1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 5.0, 6.0, 0.0]
        );
        // x of row 0 up to y of row 2
        assert_eq!(b.dirty(), Some(DirtyRange::new(0, 32)));
    }

    #[test]
    fn component_letters_reorder_columns() {
        let b = vec3(2);
        b.write_components("bgr", [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(b.read().unwrap().as_slice(), &[3.0, 2.0, 1.0, 3.0, 2.0, 1.0]);

        b.write_components("z", 9.0).unwrap();
        b.write_components("x", Array::new(vec![2, 1], vec![7.0, 8.0]).unwrap()).unwrap();
        assert_eq!(b.read().unwrap().as_slice(), &[7.0, 2.0, 9.0, 8.0, 2.0, 9.0]);
    }

    #[test]
    fn component_keys_are_checked() {
        let b = vec3(2);
        assert_eq!(b.write_components("xg", 1.0), Err(Error::UnknownKey("xg".into())));
        assert!(matches!(
            b.write_components("w", 1.0),
            Err(Error::IndexOutOfBounds { index: 3, len: 3, .. })
        ));
        assert!(matches!(
            b.write_components("xy", [1.0, 2.0, 3.0]),
            Err(Error::ShapeMismatch { .. })
        ));
        let scalars = Buffer::new(4, DType::scalar(ScalarType::F32));
        assert!(scalars.write_components("x", 1.0).is_err());
        assert_eq!(b.dirty(), None);
    }

    // ── views ─────────────────────────────────────────────────────────────

    #[test]
    fn view_dirty_resolves_to_root() {
        let root = clean(Buffer::new(64, DType::scalar(ScalarType::U8)));
        let view = root.view(16, 4, DType::scalar(ScalarType::F32)).unwrap();
        view.write(1usize, 2.5).unwrap();
        assert_eq!(root.dirty(), Some(DirtyRange::new(20, 24)));
        assert_eq!(view.dirty(), root.dirty());
        view.clear();
        assert_eq!(root.dirty(), None);
    }

    #[test]
    fn view_reads_root_bytes() {
        let root = Buffer::new(8, DType::scalar(ScalarType::F32));
        root.write(2..4usize, [3.0, 4.0]).unwrap();
        let view = root.view(8, 2, DType::scalar(ScalarType::F32)).unwrap();
        assert_eq!(view.read().unwrap().as_slice(), &[3.0, 4.0]);
        assert!(view.shares_storage(&root));
        assert!(view.source().is_some_and(|s| s.ptr_eq(&root)));
    }

    #[test]
    fn view_out_of_range_fails() {
        let root = Buffer::new(4, DType::scalar(ScalarType::F32));
        assert!(matches!(
            root.view(8, 4, DType::scalar(ScalarType::F32)),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn field_write_marks_record_root() {
        let record = RecordType::packed([
            ("position", Element::new(ScalarType::F32, vec![3])),
            ("color", Element::new(ScalarType::U8, vec![4])),
        ]);
        let root = clean(Buffer::new(4, record));
        let color = root.field("color").unwrap();
        assert!(!color.is_contiguous());
        color.write(1usize, 255.0).unwrap();
        assert_eq!(root.dirty(), Some(DirtyRange::new(28, 32)));
        assert!(color.view(0, 1, DType::scalar(ScalarType::U8)).is_err());
    }

    // ── sinks ─────────────────────────────────────────────────────────────

    #[test]
    fn sink_receives_dirty_bytes_and_range_is_cleared() {
        let b = clean(Buffer::new(4, DType::scalar(ScalarType::F32)));
        let mirror = Mirror::new();
        b.set_sink(mirror.clone());
        b.write(1..3usize, [1.0, 2.0]).unwrap();

        assert_eq!(b.dirty(), None);
        assert_eq!(mirror.updates(), vec![(4, 8)]);
        let replica = mirror.bytes();
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&replica[4..8]), 1.0);
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&replica[8..12]), 2.0);
    }

    #[test]
    fn first_push_carries_the_seed() {
        let bytes = bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0]).to_vec();
        let b = Buffer::from_bytes(3, DType::scalar(ScalarType::F32), bytes);
        let mirror = Mirror::new();
        b.set_sink(mirror.clone());
        b.write(2usize, 9.0).unwrap();

        assert_eq!(mirror.updates(), vec![(0, 12)]);
        let replica = mirror.bytes();
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&replica[0..4]), 1.0);
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&replica[8..12]), 9.0);

        b.write(0usize, 5.0).unwrap();
        assert_eq!(mirror.updates(), vec![(0, 12), (0, 4)]);
    }

    #[test]
    fn closure_sink_through_view() {
        let root = clean(Buffer::new(16, DType::scalar(ScalarType::U8)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        root.set_sink(move |offset: usize, bytes: &[u8]| {
            log.borrow_mut().push((offset, bytes.to_vec()));
        });

        let view = root.view(8, 2, DType::scalar(ScalarType::U16)).unwrap();
        view.set_data(2, &[0xAB, 0xCD]).unwrap();
        assert_eq!(*seen.borrow(), vec![(10, vec![0xAB, 0xCD])]);
        assert!(root.take_sink().is_some());
        assert!(!root.has_sink());
    }

    #[test]
    fn set_data_bounds_are_checked() {
        let b = clean(Buffer::new(4, DType::scalar(ScalarType::U8)));
        assert!(b.set_data(2, &[1, 2, 3]).is_err());
        assert!(b.set_data(1, &[1, 2, 3]).is_ok());
        assert_eq!(b.dirty(), Some(DirtyRange::new(1, 4)));
    }
}
