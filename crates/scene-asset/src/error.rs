use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

use crate::index::AssetArray;

/// The source bytes are not a well-formed container or JSON document.
#[derive(Debug)]
pub enum FormatError {
    BadMagic,
    UnsupportedVersion(u32),
    BadLength { declared: usize, available: usize },
    ChunkOutOfBounds { chunk: usize, end: usize, total: usize },
    MissingJsonChunk,
    UnexpectedChunk { chunk: usize, kind: u32 },
    Header(binrw::Error),
    Json(serde_json::Error),
    BadDataUri(String),
    BadExtension { name: &'static str, reason: String },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic => write!(f, "Bad container magic"),
            FormatError::UnsupportedVersion(version) => {
                write!(f, "Unsupported container version {}", version)
            }
            FormatError::BadLength {
                declared,
                available,
            } => write!(
                f,
                "Container declares {} bytes, but {} bytes are available",
                declared, available
            ),
            FormatError::ChunkOutOfBounds { chunk, end, total } => write!(
                f,
                "Chunk #{} ends at byte {}, past container length {}",
                chunk, end, total
            ),
            FormatError::MissingJsonChunk => write!(f, "Container has no leading JSON chunk"),
            FormatError::UnexpectedChunk { chunk, kind } => {
                write!(f, "Unexpected type {:#010x} for chunk #{}", kind, chunk)
            }
            FormatError::Header(error) => write!(f, "Bad container header: {}", error),
            FormatError::Json(error) => write!(f, "Bad JSON document: {}", error),
            FormatError::BadDataUri(uri) => {
                let prefix: String = uri.chars().take(32).collect();
                write!(f, "Bad data URI {}...", prefix)
            }
            FormatError::BadExtension { name, reason } => {
                write!(f, "Bad {} extension: {}", name, reason)
            }
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FormatError::Header(error) => Some(error),
            FormatError::Json(error) => Some(error),
            _ => None,
        }
    }
}

/// Failure of a whole decode. No partially built asset is ever returned.
#[derive(Debug)]
pub enum LoadError {
    Format(FormatError),
    /// An index field points past the end of its target array.
    Reference {
        array: AssetArray,
        index: usize,
        len: usize,
        field: String,
    },
    /// The node hierarchy is not a forest: a node has two parents or sits
    /// on a cycle.
    Hierarchy { node: usize, detail: String },
    /// A computed byte span or element range exceeds what backs it.
    Range { what: String, detail: String },
    Unsupported(String),
    MissingData(String),
    Io(io::Error),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Format(error) => Display::fmt(error, f),
            LoadError::Reference {
                array,
                index,
                len,
                field,
            } => write!(
                f,
                "{} refers to {} #{}, but only {} exist",
                field, array, index, len
            ),
            LoadError::Hierarchy { node, detail } => write!(f, "Node #{} {}", node, detail),
            LoadError::Range { what, detail } => write!(f, "{} out of range: {}", what, detail),
            LoadError::Unsupported(feature) => write!(f, "Unsupported feature: {}", feature),
            LoadError::MissingData(what) => write!(f, "Missing data: {}", what),
            LoadError::Io(error) => Display::fmt(error, f),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Format(error) => Some(error),
            LoadError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<FormatError> for LoadError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(FormatError::Json(value))
    }
}

impl From<io::Error> for LoadError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Broad category of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Reference,
    Range,
    Unsupported,
    MissingData,
    Io,
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Format(_) => ErrorKind::Format,
            LoadError::Reference { .. } | LoadError::Hierarchy { .. } => ErrorKind::Reference,
            LoadError::Range { .. } => ErrorKind::Range,
            LoadError::Unsupported(_) => ErrorKind::Unsupported,
            LoadError::MissingData(_) => ErrorKind::MissingData,
            LoadError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn range(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Range {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn bad_extension(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Format(FormatError::BadExtension {
            name,
            reason: reason.into(),
        })
    }
}

/// Check `index` against an array of `len` entities and produce a handle.
pub(crate) fn check_index<T>(
    array: AssetArray,
    index: usize,
    len: usize,
    field: impl FnOnce() -> String,
) -> Result<crate::index::Index<T>, LoadError> {
    if index < len {
        Ok(crate::index::Index::new(index as u32))
    } else {
        Err(LoadError::Reference {
            array,
            index,
            len,
            field: field(),
        })
    }
}
