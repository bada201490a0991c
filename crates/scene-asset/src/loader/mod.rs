use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use crate::storage::{default_allocator, BufferAllocator};

/// glTF and GLB decoder.
pub mod gltf;

/// What to do with buffers stored in external files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferLoading {
    /// Fetch through the resolver while decoding.
    #[default]
    Eager,
    /// Keep only the URI. Reads that touch such a buffer fail with
    /// [`crate::error::LoadError::MissingData`].
    Deferred,
}

#[derive(Clone)]
pub struct LoadParams {
    pub allocator: Arc<dyn BufferAllocator>,
    pub buffer_loading: BufferLoading,
    /// Derive primitive, mesh, node and scene bounds while decoding.
    pub compute_bounds: bool,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            allocator: default_allocator(),
            buffer_loading: BufferLoading::default(),
            compute_bounds: true,
        }
    }
}

impl Debug for LoadParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadParams")
            .field("buffer_loading", &self.buffer_loading)
            .field("compute_bounds", &self.compute_bounds)
            .finish_non_exhaustive()
    }
}

impl LoadParams {
    pub fn with_allocator(allocator: Arc<dyn BufferAllocator>) -> Self {
        Self {
            allocator,
            ..Default::default()
        }
    }
}
