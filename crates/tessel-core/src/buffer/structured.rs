use crate::error::{Error, Result};

use super::dtype::{DType, Element, RecordType, ScalarType};
use super::tracked::Buffer;

/// A record buffer decomposed into one view per named field.
///
/// Field views are created eagerly and share the root's storage, so writing
/// `positions.field("color")` marks the interleaved root dirty.
#[derive(Debug, Clone)]
pub struct StructuredBuffer {
    root: Buffer,
    fields: Vec<(String, Buffer)>,
}

impl StructuredBuffer {
    pub fn new(count: usize, record: RecordType) -> Result<Self> {
        Self::from_buffer(Buffer::new(count, record))
    }

    /// Decomposes an existing record buffer.
    pub fn from_buffer(root: Buffer) -> Result<Self> {
        let DType::Record(record) = root.dtype() else {
            return Err(Error::RecordValue);
        };
        let names: Vec<String> = record.fields().iter().map(|f| f.name.clone()).collect();
        let fields = names
            .into_iter()
            .map(|name| {
                let view = root.field(&name)?;
                Ok((name, view))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { root, fields })
    }

    #[inline]
    pub fn root(&self) -> &Buffer {
        &self.root
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.root.count()
    }

    pub fn field(&self, name: &str) -> Option<&Buffer> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Buffer)> {
        self.fields.iter().map(|(n, b)| (n.as_str(), b))
    }
}

/// A raw byte block split into packed, typed regions.
///
/// Regions are laid out back to back in declaration order. Each region is a
/// contiguous view of the block, so every region mutation is reported as a
/// byte range of the block.
#[derive(Debug, Clone)]
pub struct Data {
    root: Buffer,
    regions: Vec<Buffer>,
}

impl Data {
    pub fn new(regions: impl IntoIterator<Item = (usize, Element)>) -> Result<Self> {
        Self::build(regions.into_iter().collect(), None)
    }

    /// Like [`new`](Self::new), with storage initialised from `bytes`.
    pub fn with_bytes(
        regions: impl IntoIterator<Item = (usize, Element)>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        Self::build(regions.into_iter().collect(), Some(bytes))
    }

    fn build(layout: Vec<(usize, Element)>, bytes: Option<Vec<u8>>) -> Result<Self> {
        let nbytes: usize = layout.iter().map(|(n, e)| n * e.itemsize()).sum();
        let byte = DType::scalar(ScalarType::U8);
        let root = match bytes {
            Some(bytes) => Buffer::from_bytes(nbytes, byte, bytes),
            None => Buffer::new(nbytes, byte),
        };

        let mut offset = 0;
        let mut regions = Vec::with_capacity(layout.len());
        for (count, element) in layout {
            let size = count * element.itemsize();
            regions.push(root.view(offset, count, element)?);
            offset += size;
        }
        log::debug!("data block: {} regions, {} bytes", regions.len(), nbytes);
        Ok(Self { root, regions })
    }

    /// The whole block as bytes.
    #[inline]
    pub fn root(&self) -> &Buffer {
        &self.root
    }

    #[inline]
    pub fn region(&self, index: usize) -> Option<&Buffer> {
        self.regions.get(index)
    }

    #[inline]
    pub fn regions(&self) -> &[Buffer] {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DirtyRange;
    use crate::buffer::sink::Mirror;

    fn vertex() -> RecordType {
        RecordType::packed([
            ("position", Element::new(ScalarType::F32, vec![3])),
            ("color", Element::new(ScalarType::U8, vec![4])),
        ])
    }

    #[test]
    fn fields_are_views_of_root() {
        let s = StructuredBuffer::new(8, vertex()).unwrap();
        let names: Vec<_> = s.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["position", "color"]);

        let position = s.field("position").unwrap();
        assert!(position.shares_storage(s.root()));
        assert_eq!(position.key(), Some("position"));
        assert_eq!(position.shape(), vec![8, 3]);
    }

    #[test]
    fn field_write_marks_root_with_record_stride() {
        let s = StructuredBuffer::new(8, vertex()).unwrap();
        s.root().clear();
        s.field("position").unwrap().write(2usize, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.root().dirty(), Some(DirtyRange::new(32, 44)));

        let value = s.root().value().unwrap();
        let crate::array::Value::Record(record) = value else {
            panic!("expected a record");
        };
        assert_eq!(record.field("position").unwrap().get(&[2, 2]), Some(3.0));
    }

    #[test]
    fn non_record_buffer_is_rejected() {
        let b = Buffer::new(4, DType::scalar(ScalarType::F32));
        assert!(StructuredBuffer::from_buffer(b).is_err());
    }

    #[test]
    fn data_regions_are_packed() {
        let data = Data::new([
            (4, Element::new(ScalarType::F32, vec![2])),
            (6, Element::new(ScalarType::U16, vec![])),
        ])
        .unwrap();
        assert_eq!(data.root().nbytes(), 32 + 12);
        assert_eq!(data.region(1).unwrap().offset(), 32);

        let mirror = Mirror::new();
        data.root().clear();
        data.root().set_sink(mirror.clone());
        data.region(1).unwrap().write(0..2usize, 9.0).unwrap();
        assert_eq!(mirror.updates(), vec![(32, 4)]);
    }

    #[test]
    fn data_seed_is_visible_through_regions() {
        let seed = bytemuck::cast_slice::<u16, u8>(&[7, 8]).to_vec();
        let data = Data::with_bytes([(2, Element::new(ScalarType::U16, vec![]))], seed).unwrap();
        assert_eq!(data.region(0).unwrap().read().unwrap().as_slice(), &[7.0, 8.0]);
    }

    #[test]
    fn data_seed_reaches_the_sink_on_first_write() {
        let seed = bytemuck::cast_slice::<u16, u8>(&[7, 8, 9, 10]).to_vec();
        let data = Data::with_bytes([(4, Element::new(ScalarType::U16, vec![]))], seed).unwrap();
        assert_eq!(data.root().dirty(), Some(DirtyRange::new(0, 8)));

        let mirror = Mirror::new();
        data.root().set_sink(mirror.clone());
        data.region(0).unwrap().write(3usize, 42.0).unwrap();

        assert_eq!(mirror.updates(), vec![(0, 8)]);
        let replica: Vec<u16> = mirror
            .bytes()
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(replica, vec![7, 8, 9, 42]);
        assert_eq!(data.root().dirty(), None);
    }
}
