use bytes::Bytes;
use glam::{Mat3, Vec2, Vec3};
use serde_json::Value;

use crate::{buffer::BufferView, extension::Extensions, index::Index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMagFilter {
    Nearest,
    #[default]
    Linear,
}

impl TextureMagFilter {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            9728 => Some(Self::Nearest),
            9729 => Some(Self::Linear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMinFilter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMipmapFilter {
    Nearest,
    #[default]
    Linear,
}

/// Split a minification code into its texel filter and optional mipmap
/// filter.
pub fn min_filter_from_code(code: u32) -> Option<(TextureMinFilter, Option<TextureMipmapFilter>)> {
    match code {
        9728 => Some((TextureMinFilter::Nearest, None)),
        9729 => Some((TextureMinFilter::Linear, None)),
        9984 => Some((TextureMinFilter::Nearest, Some(TextureMipmapFilter::Nearest))),
        9985 => Some((TextureMinFilter::Linear, Some(TextureMipmapFilter::Nearest))),
        9986 => Some((TextureMinFilter::Nearest, Some(TextureMipmapFilter::Linear))),
        9987 => Some((TextureMinFilter::Linear, Some(TextureMipmapFilter::Linear))),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrappingMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

impl TextureWrappingMode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            33071 => Some(Self::ClampToEdge),
            33648 => Some(Self::MirroredRepeat),
            10497 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Filtering and wrapping. Filters left unset are up to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sampler {
    pub name: Option<String>,
    pub mag_filter: Option<TextureMagFilter>,
    pub min_filter: Option<TextureMinFilter>,
    pub mipmap_filter: Option<TextureMipmapFilter>,
    pub wrap_s: TextureWrappingMode,
    pub wrap_t: TextureWrappingMode,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

/// Where the encoded image bytes live. Images are never decoded here.
#[derive(Debug, Clone)]
pub enum ImageSource {
    View {
        view: Index<BufferView>,
        mime_type: Option<String>,
    },
    /// Decoded from a `data:` URI.
    Data {
        mime_type: Option<String>,
        data: Bytes,
    },
    /// External resource, left for the host to fetch.
    Uri(String),
}

#[derive(Debug, Clone)]
pub struct Image {
    pub name: Option<String>,
    pub source: ImageSource,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Image {
    pub fn mime_type(&self) -> Option<&str> {
        match &self.source {
            ImageSource::View { mime_type, .. } | ImageSource::Data { mime_type, .. } => {
                mime_type.as_deref()
            }
            ImageSource::Uri(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: Option<String>,
    pub source: Option<Index<Image>>,
    pub sampler: Option<Index<Sampler>>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

/// `KHR_texture_transform` parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub offset: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    /// Replaces the texture coordinate set of the owning reference.
    pub tex_coord: Option<usize>,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            tex_coord: None,
        }
    }
}

impl TextureTransform {
    /// UV matrix: scale, then rotate clockwise, then offset.
    pub fn matrix(&self) -> Mat3 {
        let (sin, cos) = self.rotation.sin_cos();
        let translation = Mat3::from_translation(self.offset);
        let rotation = Mat3::from_cols(
            Vec3::new(cos, -sin, 0.0),
            Vec3::new(sin, cos, 0.0),
            Vec3::Z,
        );
        let scale = Mat3::from_scale(self.scale);
        translation * rotation * scale
    }
}

#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub texture: Index<Texture>,
    pub tex_coord: usize,
    pub transform: Option<TextureTransform>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl TextureInfo {
    pub fn new(texture: Index<Texture>) -> Self {
        Self {
            texture,
            tex_coord: 0,
            transform: None,
            extensions: Extensions::default(),
            extras: None,
        }
    }

    /// Texture coordinate set to sample with, honoring a transform override.
    pub fn effective_tex_coord(&self) -> usize {
        self.transform
            .and_then(|transform| transform.tex_coord)
            .unwrap_or(self.tex_coord)
    }
}

#[derive(Debug, Clone)]
pub struct NormalTextureInfo {
    pub info: TextureInfo,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct OcclusionTextureInfo {
    pub info: TextureInfo,
    pub strength: f32,
}

#[cfg(test)]
mod test {
    use std::f32::consts::FRAC_PI_2;

    use glam::Vec2;

    use super::{
        min_filter_from_code, TextureInfo, TextureMinFilter, TextureMipmapFilter,
        TextureTransform, TextureWrappingMode,
    };
    use crate::index::Index;

    #[test]
    fn filter_codes() {
        assert_eq!(
            min_filter_from_code(9986),
            Some((TextureMinFilter::Nearest, Some(TextureMipmapFilter::Linear)))
        );
        assert_eq!(min_filter_from_code(9729), Some((TextureMinFilter::Linear, None)));
        assert_eq!(min_filter_from_code(1), None);
        assert_eq!(
            TextureWrappingMode::from_code(33648),
            Some(TextureWrappingMode::MirroredRepeat)
        );
        assert_eq!(TextureWrappingMode::default(), TextureWrappingMode::Repeat);
    }

    #[test]
    fn transform_scales_then_offsets() {
        let transform = TextureTransform {
            offset: Vec2::new(0.5, 0.0),
            scale: Vec2::splat(2.0),
            ..Default::default()
        };
        let uv = transform.matrix().transform_point2(Vec2::new(1.0, 1.0));
        assert!(uv.abs_diff_eq(Vec2::new(2.5, 2.0), 1e-6));
    }

    #[test]
    fn transform_rotation_is_clockwise_in_uv_space() {
        let transform = TextureTransform {
            rotation: FRAC_PI_2,
            ..Default::default()
        };
        let uv = transform.matrix().transform_point2(Vec2::new(1.0, 0.0));
        assert!(uv.abs_diff_eq(Vec2::new(0.0, -1.0), 1e-6));
    }

    #[test]
    fn transform_overrides_tex_coord() {
        let mut info = TextureInfo::new(Index::new(0));
        info.tex_coord = 1;
        assert_eq!(info.effective_tex_coord(), 1);
        info.transform = Some(TextureTransform {
            tex_coord: Some(2),
            ..Default::default()
        });
        assert_eq!(info.effective_tex_coord(), 2);
    }
}
