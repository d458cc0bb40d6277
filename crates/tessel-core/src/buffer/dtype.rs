use core::fmt;

/// Base scalar type of a buffer element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    /// Size in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::I8 => "int8",
            ScalarType::U8 => "uint8",
            ScalarType::I16 => "int16",
            ScalarType::U16 => "uint16",
            ScalarType::I32 => "int32",
            ScalarType::U32 => "uint32",
            ScalarType::I64 => "int64",
            ScalarType::U64 => "uint64",
            ScalarType::F32 => "float32",
            ScalarType::F64 => "float64",
        }
    }

    /// Decodes one native-endian scalar from the start of `bytes`.
    ///
    /// `bytes` must hold at least [`size`](Self::size) bytes.
    pub fn decode(self, bytes: &[u8]) -> f64 {
        let b = &bytes[..self.size()];
        match self {
            ScalarType::I8 => bytemuck::pod_read_unaligned::<i8>(b) as f64,
            ScalarType::U8 => b[0] as f64,
            ScalarType::I16 => bytemuck::pod_read_unaligned::<i16>(b) as f64,
            ScalarType::U16 => bytemuck::pod_read_unaligned::<u16>(b) as f64,
            ScalarType::I32 => bytemuck::pod_read_unaligned::<i32>(b) as f64,
            ScalarType::U32 => bytemuck::pod_read_unaligned::<u32>(b) as f64,
            ScalarType::I64 => bytemuck::pod_read_unaligned::<i64>(b) as f64,
            ScalarType::U64 => bytemuck::pod_read_unaligned::<u64>(b) as f64,
            ScalarType::F32 => bytemuck::pod_read_unaligned::<f32>(b) as f64,
            ScalarType::F64 => bytemuck::pod_read_unaligned::<f64>(b),
        }
    }

    /// Encodes `value` into the start of `out`, with `as`-cast semantics
    /// (saturating for integers, NaN becomes zero).
    pub fn encode(self, value: f64, out: &mut [u8]) {
        let out = &mut out[..self.size()];
        match self {
            ScalarType::I8 => out.copy_from_slice(bytemuck::bytes_of(&(value as i8))),
            ScalarType::U8 => out[0] = value as u8,
            ScalarType::I16 => out.copy_from_slice(bytemuck::bytes_of(&(value as i16))),
            ScalarType::U16 => out.copy_from_slice(bytemuck::bytes_of(&(value as u16))),
            ScalarType::I32 => out.copy_from_slice(bytemuck::bytes_of(&(value as i32))),
            ScalarType::U32 => out.copy_from_slice(bytemuck::bytes_of(&(value as u32))),
            ScalarType::I64 => out.copy_from_slice(bytemuck::bytes_of(&(value as i64))),
            ScalarType::U64 => out.copy_from_slice(bytemuck::bytes_of(&(value as u64))),
            ScalarType::F32 => out.copy_from_slice(bytemuck::bytes_of(&(value as f32))),
            ScalarType::F64 => out.copy_from_slice(bytemuck::bytes_of(&value)),
        }
    }
}

/// Scalar type plus element shape, e.g. `3×float32` or `4×4×float32`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Element {
    pub scalar: ScalarType,
    pub shape: Vec<usize>,
}

impl Element {
    #[inline]
    pub fn new(scalar: ScalarType, shape: Vec<usize>) -> Self {
        Self { scalar, shape }
    }

    /// Number of scalars per element.
    #[inline]
    pub fn components(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        self.components() * self.scalar.size()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.shape {
            write!(f, "{d}×")?;
        }
        write!(f, "{}", self.scalar.name())
    }
}

/// A named field inside a record type.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RecordField {
    pub name: String,
    pub element: Element,
    /// Byte offset of the field within one record.
    pub offset: usize,
}

/// Interleaved record layout (a structured element type).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RecordType {
    fields: Vec<RecordField>,
    itemsize: usize,
}

impl RecordType {
    /// Lays fields out back to back without padding.
    pub fn packed<N: Into<String>>(fields: impl IntoIterator<Item = (N, Element)>) -> Self {
        let mut offset = 0;
        let fields = fields
            .into_iter()
            .map(|(name, element)| {
                let field = RecordField { name: name.into(), offset, element };
                offset += field.element.itemsize();
                field
            })
            .collect();
        Self { fields, itemsize: offset }
    }

    #[inline]
    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }
}

/// Element type descriptor of a buffer.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum DType {
    Element(Element),
    Record(RecordType),
}

impl DType {
    #[inline]
    pub fn scalar(scalar: ScalarType) -> Self {
        DType::Element(Element::new(scalar, Vec::new()))
    }

    #[inline]
    pub fn vec(scalar: ScalarType, n: usize) -> Self {
        DType::Element(Element::new(scalar, vec![n]))
    }

    #[inline]
    pub fn mat(scalar: ScalarType, rows: usize, cols: usize) -> Self {
        DType::Element(Element::new(scalar, vec![rows, cols]))
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        match self {
            DType::Element(e) => e.itemsize(),
            DType::Record(r) => r.itemsize(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DType::Element(e) => Some(e),
            DType::Record(_) => None,
        }
    }
}

impl From<Element> for DType {
    fn from(element: Element) -> Self {
        DType::Element(element)
    }
}

impl From<RecordType> for DType {
    fn from(record: RecordType) -> Self {
        DType::Record(record)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Element(e) => write!(f, "{e}"),
            DType::Record(r) => {
                write!(f, "{{")?;
                for (i, field) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.element)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_record_offsets() {
        let rec = RecordType::packed([
            ("position", Element::new(ScalarType::F32, vec![3])),
            ("color", Element::new(ScalarType::U8, vec![4])),
            ("size", Element::new(ScalarType::F32, vec![])),
        ]);
        let offsets: Vec<_> = rec.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16]);
        assert_eq!(rec.itemsize(), 20);
    }

    #[test]
    fn scalar_roundtrip_saturates_integers() {
        let mut buf = [0u8; 8];
        ScalarType::U8.encode(300.0, &mut buf);
        assert_eq!(ScalarType::U8.decode(&buf), 255.0);
        ScalarType::I16.encode(-2.0, &mut buf);
        assert_eq!(ScalarType::I16.decode(&buf), -2.0);
        ScalarType::F32.encode(0.5, &mut buf);
        assert_eq!(ScalarType::F32.decode(&buf), 0.5);
    }

    #[test]
    fn display_matches_shape_notation() {
        assert_eq!(DType::vec(ScalarType::F32, 3).to_string(), "3×float32");
        assert_eq!(DType::mat(ScalarType::F64, 4, 4).to_string(), "4×4×float64");
    }
}
