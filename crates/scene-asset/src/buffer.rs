use std::ops::Range;

use serde_json::Value;

use crate::{error::LoadError, extension::Extensions, index::Index, storage::BufferStorage};

#[derive(Debug, Clone)]
pub enum BufferData {
    Loaded(BufferStorage),
    /// External file left for the host to fetch.
    Deferred { uri: String },
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub byte_length: usize,
    pub data: BufferData,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Buffer {
    /// Loaded bytes, exactly `byte_length` long.
    pub fn storage(&self) -> Option<&BufferStorage> {
        match &self.data {
            BufferData::Loaded(storage) => Some(storage),
            BufferData::Deferred { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.data, BufferData::Loaded(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

impl BufferTarget {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            34962 => Some(Self::Vertex),
            34963 => Some(Self::Index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: Index<Buffer>,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl BufferView {
    pub fn range(&self) -> Range<usize> {
        self.byte_offset..self.byte_offset + self.byte_length
    }
}

/// Bytes covered by `view`. Views are validated against their buffer at
/// decode time, so for decoded data the only failure left is a buffer that
/// was never loaded.
pub(crate) fn view_bytes<'a>(
    buffers: &'a [Buffer],
    views: &'a [BufferView],
    view: Index<BufferView>,
) -> Result<&'a [u8], LoadError> {
    let missing = |what: String| LoadError::range(what, "not part of the given arrays");
    let view = views
        .get(view.value())
        .ok_or_else(|| missing(format!("buffer view #{}", view)))?;
    let buffer = buffers
        .get(view.buffer.value())
        .ok_or_else(|| missing(format!("buffer #{}", view.buffer)))?;
    match &buffer.data {
        BufferData::Loaded(storage) => view
            .byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| storage.get(view.byte_offset..end))
            .ok_or_else(|| {
                LoadError::range(
                    format!("buffer #{}", view.buffer),
                    format!("view ends past the {} loaded bytes", storage.len()),
                )
            }),
        BufferData::Deferred { uri } => Err(LoadError::MissingData(format!(
            "buffer #{} ({}) has not been loaded",
            view.buffer, uri
        ))),
    }
}
