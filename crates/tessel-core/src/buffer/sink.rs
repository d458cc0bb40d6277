use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of incremental buffer updates.
///
/// `offset` is a byte offset into the root storage of the buffer that
/// changed; `bytes` is the new content of the dirty range starting there.
/// Calls happen synchronously inside the mutating call, before it returns.
///
/// A sink must not mutate the buffer it is attached to.
pub trait BufferSink {
    fn accept(&mut self, offset: usize, bytes: &[u8]);
}

impl<F> BufferSink for F
where
    F: FnMut(usize, &[u8]),
{
    fn accept(&mut self, offset: usize, bytes: &[u8]) {
        self(offset, bytes)
    }
}

/// Sink that keeps a byte-for-byte replica of the observed storage.
///
/// This is the minimal remote: every update is applied at its offset, and
/// the replica grows as needed. Clones share the same replica.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    bytes: Rc<RefCell<Vec<u8>>>,
    updates: Rc<RefCell<Vec<(usize, usize)>>>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current replica contents.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    /// Every `(offset, len)` received so far, in order.
    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.updates.borrow().clone()
    }
}

impl BufferSink for Mirror {
    fn accept(&mut self, offset: usize, bytes: &[u8]) {
        let mut replica = self.bytes.borrow_mut();
        let end = offset + bytes.len();
        if replica.len() < end {
            replica.resize(end, 0);
        }
        replica[offset..end].copy_from_slice(bytes);
        self.updates.borrow_mut().push((offset, bytes.len()));
    }
}
