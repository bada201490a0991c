//! Pluggable storage for buffer bytes.
//!
//! The decoder never decides how buffer memory is held. It hands bytes to a
//! [`BufferAllocator`] chosen by the caller through
//! [`LoadParams`](crate::loader::LoadParams) and keeps the returned
//! [`BufferStorage`] handle.

use std::{
    fmt::{self, Debug, Formatter},
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use bytes::Bytes;

/// Addressable, immutable bytes backing one buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct BufferStorage(Bytes);

impl BufferStorage {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zero-copy sub-range. Panics when the range is outside the storage.
    pub fn slice(&self, range: std::ops::Range<usize>) -> BufferStorage {
        BufferStorage(self.0.slice(range))
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for BufferStorage {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for BufferStorage {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl Deref for BufferStorage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for BufferStorage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for BufferStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BufferStorage({} bytes)", self.0.len())
    }
}

/// Strategy turning buffer bytes into storage.
///
/// Implementations may be shared by several decodes running on different
/// threads at once, so any bookkeeping they keep must be synchronized
/// internally.
pub trait BufferAllocator: Send + Sync {
    /// Copy `data` into newly allocated storage. Called for external files
    /// and decoded data URIs.
    fn allocate(&self, data: &[u8]) -> BufferStorage;

    /// Take over bytes that already belong to the decoded source, like the
    /// binary chunk of a container. The default keeps them without copying.
    fn adopt(&self, data: Bytes) -> BufferStorage {
        BufferStorage(data)
    }
}

/// Plain heap allocation, tracking how many bytes it handed out.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    allocated: AtomicUsize,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes copied by this allocator so far.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, data: &[u8]) -> BufferStorage {
        self.allocated.fetch_add(data.len(), Ordering::Relaxed);
        BufferStorage(Bytes::copy_from_slice(data))
    }
}

/// Allocator that copies everything, including container chunks, so the
/// decoded asset never keeps the source bytes alive.
#[derive(Debug, Default)]
pub struct CopyingAllocator {
    heap: HeapAllocator,
}

impl CopyingAllocator {
    pub fn allocated_bytes(&self) -> usize {
        self.heap.allocated_bytes()
    }
}

impl BufferAllocator for CopyingAllocator {
    fn allocate(&self, data: &[u8]) -> BufferStorage {
        self.heap.allocate(data)
    }

    fn adopt(&self, data: Bytes) -> BufferStorage {
        self.heap.allocate(&data)
    }
}

pub(crate) fn default_allocator() -> Arc<dyn BufferAllocator> {
    Arc::new(HeapAllocator::new())
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use bytes::Bytes;

    use super::{BufferAllocator, CopyingAllocator, HeapAllocator};

    #[test]
    fn heap_allocator_copies_and_counts() {
        let allocator = HeapAllocator::new();
        let storage = allocator.allocate(&[1, 2, 3, 4]);
        assert_eq!(&storage[..], &[1, 2, 3, 4]);
        assert_eq!(allocator.allocated_bytes(), 4);

        let source = Bytes::from_static(&[9, 9, 9]);
        let adopted = allocator.adopt(source.clone());
        assert_eq!(adopted.into_bytes().as_ptr(), source.as_ptr());
        assert_eq!(allocator.allocated_bytes(), 4);
    }

    #[test]
    fn copying_allocator_never_shares_source() {
        let allocator = CopyingAllocator::default();
        let source = Bytes::from_static(&[7, 8]);
        let adopted = allocator.adopt(source.clone());
        assert_ne!(adopted.clone().into_bytes().as_ptr(), source.as_ptr());
        assert_eq!(&adopted[..], &[7, 8]);
        assert_eq!(allocator.allocated_bytes(), 2);
    }

    #[test]
    fn shared_allocator_across_threads() {
        let allocator = Arc::new(HeapAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        allocator.allocate(&[0u8; 16]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(allocator.allocated_bytes(), 8 * 100 * 16);
    }
}
