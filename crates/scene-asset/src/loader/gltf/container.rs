use std::io::Cursor;

use binrw::BinRead;
use bytes::Bytes;
use log::debug;

use crate::error::FormatError;

pub const MAGIC: &[u8; 4] = b"glTF";
pub const VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F534A;
pub const CHUNK_BIN: u32 = 0x004E4942;

const HEADER_LENGTH: usize = 12;
const CHUNK_HEADER_LENGTH: usize = 8;

#[derive(Debug, Clone, BinRead)]
#[br(little, magic = b"glTF")]
struct ContainerHeader {
    version: u32,
    length: u32,
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
struct ChunkHeader {
    length: u32,
    kind: u32,
}

/// JSON text and optional binary payload of a binary container. Both are
/// zero-copy slices of the source bytes.
#[derive(Debug, Clone)]
pub struct Container {
    pub json: Bytes,
    pub bin: Option<Bytes>,
}

#[inline]
fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

pub fn is_container(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

impl Container {
    pub fn parse(data: Bytes) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(&data[..]);
        let header = ContainerHeader::read(&mut cursor).map_err(|error| {
            if matches!(error.root_cause(), binrw::Error::BadMagic { .. }) {
                FormatError::BadMagic
            } else {
                FormatError::Header(error)
            }
        })?;
        if header.version != VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }

        let total = header.length as usize;
        if total < HEADER_LENGTH || total > data.len() {
            return Err(FormatError::BadLength {
                declared: total,
                available: data.len(),
            });
        }

        let mut json = None;
        let mut bin = None;
        let mut offset = HEADER_LENGTH;
        let mut chunk = 0;
        while offset < total {
            if offset + CHUNK_HEADER_LENGTH > total {
                return Err(FormatError::ChunkOutOfBounds {
                    chunk,
                    end: offset + CHUNK_HEADER_LENGTH,
                    total,
                });
            }
            cursor.set_position(offset as u64);
            let chunk_header = ChunkHeader::read(&mut cursor).map_err(FormatError::Header)?;
            let start = offset + CHUNK_HEADER_LENGTH;
            let end = start + chunk_header.length as usize;
            if end > total {
                return Err(FormatError::ChunkOutOfBounds { chunk, end, total });
            }

            match (chunk, chunk_header.kind) {
                (0, CHUNK_JSON) => json = Some(data.slice(start..end)),
                (0, _) => return Err(FormatError::MissingJsonChunk),
                (1, CHUNK_BIN) => bin = Some(data.slice(start..end)),
                (1, kind) => return Err(FormatError::UnexpectedChunk { chunk, kind }),
                (_, kind) => debug!(
                    "Ignoring chunk #{} of type {:#010x} ({} bytes)",
                    chunk, kind, chunk_header.length
                ),
            }

            offset = align4(end);
            chunk += 1;
        }

        let json = json.ok_or(FormatError::MissingJsonChunk)?;
        Ok(Self { json, bin })
    }
}
