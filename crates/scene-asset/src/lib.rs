//! Decode glTF 2.0 scenes.
//!
//! This library reads `.gltf` documents and `.glb` containers into an
//! [`Asset`](asset::Asset): a validated, index-resolved scene graph with
//! typed handles, accessor reads that honor strides, sparse storage and
//! normalization, derived bounding boxes, and decoded lights and material
//! extensions. Images are located but never decompressed.
//!
pub mod accessor;
pub mod animation;
pub mod asset;
pub mod buffer;
pub mod camera;
pub mod error;
pub mod extension;
pub mod index;
pub mod light;
/// Document decoders
pub mod loader;
pub mod material;
pub mod math;
pub mod mesh;
pub mod node;
pub mod primitive;
pub mod resolver;
pub mod scene;
pub mod skin;
pub mod storage;
pub mod texture;

pub use asset::{Asset, Info};
pub use error::{ErrorKind, FormatError, LoadError};
pub use index::Index;
pub use loader::{BufferLoading, LoadParams};
