//! glTF 2.0 decoder.
//!
//! The JSON document is first deserialized into plain arrays (see
//! [`json`]). Every entity is then built from those arrays, and each raw
//! index it holds is checked against the length of its target array before
//! it becomes an [`Index`] handle. Forward references need no special care
//! because all lengths are known before the first entity is built.

use std::collections::BTreeMap;

use bytes::Bytes;
use glam::{Mat4, Quat, Vec3, Vec4};
use log::{debug, trace, warn};

use self::{
    container::Container,
    extensions::{
        DocumentExtensions, DOCUMENT_EXTENSIONS, MATERIAL_EXTENSIONS, NODE_EXTENSIONS,
        TEXTURE_INFO_EXTENSIONS,
    },
    scheme::Scheme,
};
use super::{BufferLoading, LoadParams};
use crate::{
    accessor::{is_supported_layout, Accessor, ComponentType, Dimensions, Sparse},
    animation::{Animation, AnimationSampler, Channel, Interpolation, Property},
    asset::{Asset, Info},
    buffer::{view_bytes, Buffer, BufferData, BufferTarget, BufferView},
    camera::{Camera, OrthographicCamera, PerspectiveCamera, Projection},
    error::{check_index, LoadError},
    extension::Extensions,
    index::{AssetArray, Index},
    light::Light,
    material::{Material, MaterialAlphaMode, MetallicRoughness},
    math::BoundingBox,
    mesh::Mesh,
    node::{DecomposedTransform, MatrixNodeTransform, Node, NodeTransform},
    primitive::{Attributes, MorphTarget, Primitive, PrimitiveMode, Semantic},
    resolver::ResourceResolver,
    scene::Scene,
    skin::Skin,
    storage::BufferStorage,
    texture::{
        min_filter_from_code, Image, ImageSource, NormalTextureInfo, OcclusionTextureInfo,
        Sampler, Texture, TextureInfo, TextureMagFilter, TextureWrappingMode,
    },
};

pub mod container;
pub(crate) mod extensions;
pub(crate) mod json;
pub(crate) mod scheme;

pub use extensions::{
    KHR_LIGHTS_PUNCTUAL, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS, KHR_MATERIALS_UNLIT,
    KHR_TEXTURE_TRANSFORM,
};

#[inline]
fn field(array: &str, index: usize, name: &str) -> String {
    format!("{}[{}].{}", array, index, name)
}

fn check_optional<T>(
    array: AssetArray,
    index: Option<usize>,
    len: usize,
    field: impl FnOnce() -> String,
) -> Result<Option<Index<T>>, LoadError> {
    index
        .map(|index| check_index(array, index, len, field))
        .transpose()
}

/// Largest element count of an accessor without a buffer view. Matches the
/// reach of 32-bit sparse indices.
const MAX_VIEWLESS_COUNT: usize = u32::MAX as usize;

/// `offset + length`, failing instead of overflowing.
#[inline]
fn span_end(
    what: impl FnOnce() -> String,
    offset: usize,
    length: usize,
) -> Result<usize, LoadError> {
    offset
        .checked_add(length)
        .ok_or_else(|| LoadError::range(what(), "byte span overflows"))
}

/// Texture reference with its own extensions decoded. The texture index is
/// checked by the owner once all textures are known.
pub(crate) fn texture_info(raw: &json::TextureInfo) -> Result<TextureInfo, LoadError> {
    let mut info = TextureInfo::new(Index::from_raw(raw.index));
    info.tex_coord = raw.tex_coord;
    info.extensions = TEXTURE_INFO_EXTENSIONS.apply(&mut info, raw.extensions.as_ref())?;
    info.extras = raw.extras.clone();
    Ok(info)
}

struct Decoder<'a, R: ResourceResolver + ?Sized> {
    root: &'a json::Root,
    bin: Option<Bytes>,
    resolver: &'a R,
    params: &'a LoadParams,
}

impl<'a, R: ResourceResolver + ?Sized> Decoder<'a, R> {
    fn load_info(&self) -> Result<Info, LoadError> {
        let info = self
            .root
            .asset
            .as_ref()
            .ok_or_else(|| LoadError::MissingData(String::from("asset metadata")))?;
        let major = info.version.split('.').next().unwrap_or_default();
        if major != "2" {
            return Err(LoadError::Unsupported(format!(
                "document version {}",
                info.version
            )));
        }
        Ok(Info {
            version: info.version.clone(),
            min_version: info.min_version.clone(),
            generator: info.generator.clone(),
            copyright: info.copyright.clone(),
        })
    }

    fn check_required_extensions(&self) {
        for name in &self.root.extensions_required {
            if !extensions::is_supported(name) {
                warn!("Required extension {} is not supported, its data is kept opaque", name);
            }
        }
    }

    /// Declared length of the buffer, taken from longer storage.
    fn fit_storage(
        index: usize,
        storage: BufferStorage,
        byte_length: usize,
    ) -> Result<BufferStorage, LoadError> {
        if storage.len() < byte_length {
            return Err(LoadError::range(
                format!("buffers[{}]", index),
                format!(
                    "declares {} bytes, but only {} are available",
                    byte_length,
                    storage.len()
                ),
            ));
        }
        Ok(storage.slice(0..byte_length))
    }

    fn load_buffers(&self) -> Result<Vec<Buffer>, LoadError> {
        let allocator = &self.params.allocator;
        let mut bin_storage: Option<BufferStorage> = None;
        let mut buffers = Vec::with_capacity(self.root.buffers.len());

        for (index, buffer) in self.root.buffers.iter().enumerate() {
            let data = match &buffer.uri {
                None => {
                    let storage = match &bin_storage {
                        Some(storage) => storage.clone(),
                        None => {
                            let bin = self.bin.clone().ok_or_else(|| {
                                LoadError::MissingData(format!(
                                    "buffers[{}] has no URI and there is no binary chunk",
                                    index
                                ))
                            })?;
                            let storage = allocator.adopt(bin);
                            bin_storage = Some(storage.clone());
                            storage
                        }
                    };
                    BufferData::Loaded(Self::fit_storage(index, storage, buffer.byte_length)?)
                }
                Some(uri) => match Scheme::try_from(uri.as_str())? {
                    Scheme::Data(_, data) => BufferData::Loaded(Self::fit_storage(
                        index,
                        allocator.allocate(&data),
                        buffer.byte_length,
                    )?),
                    _ if self.params.buffer_loading == BufferLoading::Deferred => {
                        BufferData::Deferred { uri: uri.clone() }
                    }
                    scheme => match scheme.load(self.resolver)? {
                        Some((_, data)) => BufferData::Loaded(Self::fit_storage(
                            index,
                            allocator.allocate(&data),
                            buffer.byte_length,
                        )?),
                        None => {
                            return Err(LoadError::MissingData(format!(
                                "buffers[{}] resource {} not found",
                                index, uri
                            )))
                        }
                    },
                },
            };
            trace!("Buffer #{}: {} bytes", index, buffer.byte_length);
            buffers.push(Buffer {
                name: buffer.name.clone(),
                uri: buffer.uri.clone(),
                byte_length: buffer.byte_length,
                data,
                extensions: Extensions::opaque(buffer.extensions.as_ref()),
                extras: buffer.extras.clone(),
            });
        }
        Ok(buffers)
    }

    fn load_buffer_views(&self, buffers: &[Buffer]) -> Result<Vec<BufferView>, LoadError> {
        self.root
            .buffer_views
            .iter()
            .enumerate()
            .map(|(index, view)| {
                let buffer: Index<Buffer> = check_index(
                    AssetArray::Buffers,
                    view.buffer,
                    buffers.len(),
                    || field("bufferViews", index, "buffer"),
                )?;
                let buffer_length = buffers[buffer.value()].byte_length;
                let end = span_end(
                    || format!("bufferViews[{}]", index),
                    view.byte_offset,
                    view.byte_length,
                )?;
                if end > buffer_length {
                    return Err(LoadError::range(
                        format!("bufferViews[{}]", index),
                        format!(
                            "bytes {}..{} exceed buffer #{} of {} bytes",
                            view.byte_offset, end, buffer, buffer_length
                        ),
                    ));
                }
                if let Some(stride) = view.byte_stride {
                    if !(4..=252).contains(&stride) {
                        return Err(LoadError::range(
                            field("bufferViews", index, "byteStride"),
                            format!("{} is outside 4..=252", stride),
                        ));
                    }
                }
                let target = view.target.and_then(|code| {
                    let target = BufferTarget::from_code(code);
                    if target.is_none() {
                        warn!("Ignoring unknown target {} of buffer view #{}", code, index);
                    }
                    target
                });
                Ok(BufferView {
                    name: view.name.clone(),
                    buffer,
                    byte_offset: view.byte_offset,
                    byte_length: view.byte_length,
                    byte_stride: view.byte_stride,
                    target,
                    extensions: Extensions::opaque(view.extensions.as_ref()),
                    extras: view.extras.clone(),
                })
            })
            .collect()
    }

    fn load_sparse(
        index: usize,
        sparse: &json::Sparse,
        accessor_count: usize,
        element_size: usize,
        base_stride: Option<usize>,
        buffers: &[Buffer],
        views: &[BufferView],
    ) -> Result<Sparse, LoadError> {
        let what = || format!("accessors[{}].sparse", index);
        if sparse.count > accessor_count {
            return Err(LoadError::range(
                what(),
                format!(
                    "{} overrides for {} elements",
                    sparse.count, accessor_count
                ),
            ));
        }
        if base_stride.is_some_and(|stride| stride != element_size) {
            return Err(LoadError::Unsupported(format!(
                "accessors[{}]: sparse storage over a strided buffer view",
                index
            )));
        }

        let indices_component_type = ComponentType::from_code(sparse.indices.component_type)
            .filter(|component_type| {
                matches!(
                    component_type,
                    ComponentType::U8 | ComponentType::U16 | ComponentType::U32
                )
            })
            .ok_or_else(|| {
                LoadError::Unsupported(format!(
                    "accessors[{}].sparse.indices component type {}",
                    index, sparse.indices.component_type
                ))
            })?;
        let indices_view: Index<BufferView> = check_index(
            AssetArray::BufferViews,
            sparse.indices.buffer_view,
            views.len(),
            || format!("accessors[{}].sparse.indices.bufferView", index),
        )?;
        let values_view: Index<BufferView> = check_index(
            AssetArray::BufferViews,
            sparse.values.buffer_view,
            views.len(),
            || format!("accessors[{}].sparse.values.bufferView", index),
        )?;

        let index_size = indices_component_type.size();
        let indices_end = span_end(
            what,
            sparse.indices.byte_offset,
            sparse.count.saturating_mul(index_size),
        )?;
        let indices_length = views[indices_view.value()].byte_length;
        if indices_end > indices_length {
            return Err(LoadError::range(
                format!("accessors[{}].sparse.indices", index),
                format!(
                    "bytes up to {} exceed buffer view #{} of {} bytes",
                    indices_end, indices_view, indices_length
                ),
            ));
        }
        let values_end = span_end(
            what,
            sparse.values.byte_offset,
            sparse.count.saturating_mul(element_size),
        )?;
        let values_length = views[values_view.value()].byte_length;
        if values_end > values_length {
            return Err(LoadError::range(
                format!("accessors[{}].sparse.values", index),
                format!(
                    "bytes up to {} exceed buffer view #{} of {} bytes",
                    values_end, values_view, values_length
                ),
            ));
        }

        let data = view_bytes(buffers, views, indices_view)?;
        let mut indices = Vec::with_capacity(sparse.count);
        for (slot, bytes) in data[sparse.indices.byte_offset..indices_end]
            .chunks_exact(index_size)
            .enumerate()
        {
            let element = indices_component_type.decode_u32(bytes).unwrap_or(u32::MAX);
            if element as usize >= accessor_count {
                return Err(LoadError::Reference {
                    array: AssetArray::Elements,
                    index: element as usize,
                    len: accessor_count,
                    field: format!("accessors[{}].sparse.indices[{}]", index, slot),
                });
            }
            indices.push(element);
        }

        Ok(Sparse::new(
            sparse.count,
            indices_view,
            sparse.indices.byte_offset,
            indices_component_type,
            values_view,
            sparse.values.byte_offset,
            indices,
        ))
    }

    fn load_accessors(
        &self,
        buffers: &[Buffer],
        views: &[BufferView],
    ) -> Result<Vec<Accessor>, LoadError> {
        let mut accessors = Vec::with_capacity(self.root.accessors.len());
        for (index, accessor) in self.root.accessors.iter().enumerate() {
            let component_type =
                ComponentType::from_code(accessor.component_type).ok_or_else(|| {
                    LoadError::Unsupported(format!(
                        "accessors[{}] component type {}",
                        index, accessor.component_type
                    ))
                })?;
            let dimensions = Dimensions::from_name(&accessor.kind).ok_or_else(|| {
                LoadError::Unsupported(format!("accessors[{}] type {}", index, accessor.kind))
            })?;
            if !is_supported_layout(component_type, dimensions, accessor.normalized) {
                return Err(LoadError::Unsupported(format!(
                    "accessors[{}] layout {} of {}{}",
                    index,
                    dimensions,
                    component_type,
                    if accessor.normalized {
                        " (normalized)"
                    } else {
                        ""
                    }
                )));
            }
            let element_size = component_type.size() * dimensions.component_count();

            let (view, stride, base_stride) = match accessor.buffer_view {
                Some(view) => {
                    let view: Index<BufferView> = check_index(
                        AssetArray::BufferViews,
                        view,
                        views.len(),
                        || field("accessors", index, "bufferView"),
                    )?;
                    let view_data = &views[view.value()];
                    let stride = view_data.byte_stride.unwrap_or(element_size);
                    if stride < element_size {
                        return Err(LoadError::range(
                            format!("accessors[{}]", index),
                            format!(
                                "stride {} is smaller than the {} byte element",
                                stride, element_size
                            ),
                        ));
                    }
                    if accessor.count > 0 {
                        let what = || format!("accessors[{}]", index);
                        let last = (accessor.count - 1)
                            .checked_mul(stride)
                            .ok_or_else(|| LoadError::range(what(), "byte span overflows"))?;
                        let end = span_end(what, accessor.byte_offset, last)?;
                        let end = span_end(what, end, element_size)?;
                        if end > view_data.byte_length {
                            return Err(LoadError::range(
                                what(),
                                format!(
                                    "{} elements end at byte {}, past buffer view #{} of {} bytes",
                                    accessor.count, end, view, view_data.byte_length
                                ),
                            ));
                        }
                    }
                    (Some(view), stride, view_data.byte_stride)
                }
                None => {
                    // Zero-filled elements have no bytes to bound their count.
                    if accessor.count > MAX_VIEWLESS_COUNT {
                        return Err(LoadError::range(
                            field("accessors", index, "count"),
                            format!(
                                "{} elements without a buffer view, at most {} allowed",
                                accessor.count, MAX_VIEWLESS_COUNT
                            ),
                        ));
                    }
                    (None, element_size, None)
                }
            };

            let sparse = accessor
                .sparse
                .as_ref()
                .map(|sparse| {
                    Self::load_sparse(
                        index,
                        sparse,
                        accessor.count,
                        element_size,
                        base_stride,
                        buffers,
                        views,
                    )
                })
                .transpose()?;

            let to_f32 = |values: &Option<Vec<f64>>| -> Option<Vec<f32>> {
                values
                    .as_ref()
                    .map(|values| values.iter().map(|value| *value as f32).collect())
            };
            trace!(
                "Accessor #{}: {} x {} {}",
                index,
                accessor.count,
                dimensions,
                component_type
            );
            accessors.push(Accessor {
                name: accessor.name.clone(),
                view,
                byte_offset: accessor.byte_offset,
                component_type,
                normalized: accessor.normalized,
                dimensions,
                count: accessor.count,
                min: to_f32(&accessor.min),
                max: to_f32(&accessor.max),
                sparse,
                stride,
                extensions: Extensions::opaque(accessor.extensions.as_ref()),
                extras: accessor.extras.clone(),
            });
        }
        Ok(accessors)
    }

    fn load_samplers(&self) -> Result<Vec<Sampler>, LoadError> {
        fn unsupported(index: usize, name: &str, code: u32) -> LoadError {
            LoadError::Unsupported(format!("samplers[{}].{} {}", index, name, code))
        }

        self.root
            .samplers
            .iter()
            .enumerate()
            .map(|(index, sampler)| {
                let mag_filter = sampler
                    .mag_filter
                    .map(|code| {
                        TextureMagFilter::from_code(code)
                            .ok_or_else(|| unsupported(index, "magFilter", code))
                    })
                    .transpose()?;
                let (min_filter, mipmap_filter) = match sampler.min_filter {
                    Some(code) => {
                        let (min_filter, mipmap_filter) = min_filter_from_code(code)
                            .ok_or_else(|| unsupported(index, "minFilter", code))?;
                        (Some(min_filter), mipmap_filter)
                    }
                    None => (None, None),
                };
                let wrapping_mode = |code: Option<u32>, name: &str| {
                    code.map(|code| {
                        TextureWrappingMode::from_code(code)
                            .ok_or_else(|| unsupported(index, name, code))
                    })
                    .transpose()
                    .map(Option::unwrap_or_default)
                };
                Ok(Sampler {
                    name: sampler.name.clone(),
                    mag_filter,
                    min_filter,
                    mipmap_filter,
                    wrap_s: wrapping_mode(sampler.wrap_s, "wrapS")?,
                    wrap_t: wrapping_mode(sampler.wrap_t, "wrapT")?,
                    extensions: Extensions::opaque(sampler.extensions.as_ref()),
                    extras: sampler.extras.clone(),
                })
            })
            .collect()
    }

    fn load_images(&self, views_len: usize) -> Result<Vec<Image>, LoadError> {
        self.root
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let source = match (image.buffer_view, &image.uri) {
                    (Some(view), _) => ImageSource::View {
                        view: check_index(AssetArray::BufferViews, view, views_len, || {
                            field("images", index, "bufferView")
                        })?,
                        mime_type: image.mime_type.clone(),
                    },
                    (None, Some(uri)) => match Scheme::try_from(uri.as_str())? {
                        Scheme::Data(mime_type, data) => ImageSource::Data {
                            mime_type: mime_type
                                .map(str::to_string)
                                .or_else(|| image.mime_type.clone()),
                            data: Bytes::from(data),
                        },
                        _ => ImageSource::Uri(uri.clone()),
                    },
                    (None, None) => {
                        return Err(LoadError::MissingData(format!(
                            "images[{}] has neither a buffer view nor a URI",
                            index
                        )))
                    }
                };
                Ok(Image {
                    name: image.name.clone(),
                    source,
                    extensions: Extensions::opaque(image.extensions.as_ref()),
                    extras: image.extras.clone(),
                })
            })
            .collect()
    }

    fn load_textures(
        &self,
        images_len: usize,
        samplers_len: usize,
    ) -> Result<Vec<Texture>, LoadError> {
        self.root
            .textures
            .iter()
            .enumerate()
            .map(|(index, texture)| {
                Ok(Texture {
                    name: texture.name.clone(),
                    source: check_optional(AssetArray::Images, texture.source, images_len, || {
                        field("textures", index, "source")
                    })?,
                    sampler: check_optional(
                        AssetArray::Samplers,
                        texture.sampler,
                        samplers_len,
                        || field("textures", index, "sampler"),
                    )?,
                    extensions: Extensions::opaque(texture.extensions.as_ref()),
                    extras: texture.extras.clone(),
                })
            })
            .collect()
    }

    fn load_material(index: usize, material: &json::Material) -> Result<Material, LoadError> {
        let defaults = MetallicRoughness::default();
        let metallic_roughness = match &material.pbr_metallic_roughness {
            Some(pbr) => MetallicRoughness {
                base_color_factor: pbr
                    .base_color_factor
                    .map(Vec4::from_array)
                    .unwrap_or(defaults.base_color_factor),
                base_color_texture: pbr.base_color_texture.as_ref().map(texture_info).transpose()?,
                metallic_factor: pbr.metallic_factor.unwrap_or(defaults.metallic_factor),
                roughness_factor: pbr.roughness_factor.unwrap_or(defaults.roughness_factor),
                metallic_roughness_texture: pbr
                    .metallic_roughness_texture
                    .as_ref()
                    .map(texture_info)
                    .transpose()?,
            },
            None => defaults,
        };

        let alpha_mode = match material.alpha_mode.as_deref() {
            None | Some("OPAQUE") => MaterialAlphaMode::Opaque,
            Some("MASK") => MaterialAlphaMode::Mask(
                material
                    .alpha_cutoff
                    .unwrap_or(MaterialAlphaMode::DEFAULT_CUTOFF),
            ),
            Some("BLEND") => MaterialAlphaMode::Blend,
            Some(other) => {
                return Err(LoadError::Unsupported(format!(
                    "materials[{}].alphaMode {}",
                    index, other
                )))
            }
        };

        let normal_texture = match &material.normal_texture {
            Some(raw) => Some(NormalTextureInfo {
                info: texture_info(raw)?,
                scale: raw.scale.unwrap_or(1.0),
            }),
            None => None,
        };
        let occlusion_texture = match &material.occlusion_texture {
            Some(raw) => Some(OcclusionTextureInfo {
                info: texture_info(raw)?,
                strength: raw.strength.unwrap_or(1.0),
            }),
            None => None,
        };

        let mut result = Material {
            name: material.name.clone(),
            metallic_roughness,
            specular_glossiness: None,
            normal_texture,
            occlusion_texture,
            emissive_texture: material.emissive_texture.as_ref().map(texture_info).transpose()?,
            emissive_factor: material
                .emissive_factor
                .map(Vec3::from_array)
                .unwrap_or(Vec3::ZERO),
            alpha_mode,
            double_sided: material.double_sided,
            unlit: false,
            extensions: Extensions::default(),
            extras: material.extras.clone(),
        };
        result.extensions = MATERIAL_EXTENSIONS.apply(&mut result, material.extensions.as_ref())?;
        Ok(result)
    }

    fn load_materials(&self, textures_len: usize) -> Result<Vec<Material>, LoadError> {
        let mut materials = Vec::with_capacity(self.root.materials.len());
        for (index, material) in self.root.materials.iter().enumerate() {
            let material = Self::load_material(index, material)?;
            for info in material.texture_infos() {
                check_index::<Texture>(
                    AssetArray::Textures,
                    info.texture.value(),
                    textures_len,
                    || format!("materials[{}] texture reference", index),
                )?;
            }
            materials.push(material);
        }
        Ok(materials)
    }

    fn load_cameras(&self) -> Result<Vec<Camera>, LoadError> {
        self.root
            .cameras
            .iter()
            .enumerate()
            .map(|(index, camera)| {
                let missing = |name: &str| LoadError::MissingData(field("cameras", index, name));
                let projection = match camera.kind.as_str() {
                    "perspective" => {
                        let perspective = camera
                            .perspective
                            .as_ref()
                            .ok_or_else(|| missing("perspective"))?;
                        Projection::Perspective(PerspectiveCamera {
                            aspect_ratio: perspective.aspect_ratio,
                            yfov: perspective.yfov,
                            znear: perspective.znear,
                            zfar: perspective.zfar,
                        })
                    }
                    "orthographic" => {
                        let orthographic = camera
                            .orthographic
                            .as_ref()
                            .ok_or_else(|| missing("orthographic"))?;
                        Projection::Orthographic(OrthographicCamera {
                            xmag: orthographic.xmag,
                            ymag: orthographic.ymag,
                            znear: orthographic.znear,
                            zfar: orthographic.zfar,
                        })
                    }
                    other => {
                        return Err(LoadError::Unsupported(format!(
                            "cameras[{}] type {}",
                            index, other
                        )))
                    }
                };
                Ok(Camera {
                    name: camera.name.clone(),
                    projection,
                    extensions: Extensions::opaque(camera.extensions.as_ref()),
                    extras: camera.extras.clone(),
                })
            })
            .collect()
    }

    fn load_attributes(
        raw: &BTreeMap<String, usize>,
        accessors_len: usize,
        owner: &str,
    ) -> Result<Attributes, LoadError> {
        raw.iter()
            .map(|(name, accessor)| {
                let semantic = Semantic::parse(name);
                if let Semantic::Extra(name) = &semantic {
                    if !name.starts_with('_') {
                        warn!("Unknown attribute semantic {} in {}", name, owner);
                    }
                }
                let accessor = check_index(AssetArray::Accessors, *accessor, accessors_len, || {
                    format!("{}.{}", owner, name)
                })?;
                Ok((semantic, accessor))
            })
            .collect()
    }

    fn load_primitive(
        mesh_index: usize,
        primitive_index: usize,
        primitive: &json::Primitive,
        accessors: &[Accessor],
        materials_len: usize,
    ) -> Result<Primitive, LoadError> {
        let owner = format!("meshes[{}].primitives[{}]", mesh_index, primitive_index);
        let attributes = Self::load_attributes(
            &primitive.attributes,
            accessors.len(),
            &format!("{}.attributes", owner),
        )?;
        if let Some(position) = attributes.get(&Semantic::Position) {
            let accessor = &accessors[position.value()];
            if accessor.dimensions != Dimensions::Vec3 {
                return Err(LoadError::Unsupported(format!(
                    "{} POSITION of type {}",
                    owner, accessor.dimensions
                )));
            }
        }

        let indices: Option<Index<Accessor>> = check_optional(
            AssetArray::Accessors,
            primitive.indices,
            accessors.len(),
            || format!("{}.indices", owner),
        )?;
        if let Some(indices) = indices {
            let accessor = &accessors[indices.value()];
            let integer = matches!(
                accessor.component_type,
                ComponentType::U8 | ComponentType::U16 | ComponentType::U32
            );
            if accessor.dimensions != Dimensions::Scalar || !integer || accessor.normalized {
                return Err(LoadError::Unsupported(format!(
                    "{} indices of type {} {}",
                    owner, accessor.dimensions, accessor.component_type
                )));
            }
        }

        let mode = match primitive.mode {
            Some(code) => PrimitiveMode::from_code(code).ok_or_else(|| {
                LoadError::Unsupported(format!("{}.mode {}", owner, code))
            })?,
            None => PrimitiveMode::default(),
        };

        let targets = primitive
            .targets
            .iter()
            .enumerate()
            .map(|(target, attributes)| {
                Ok(MorphTarget {
                    attributes: Self::load_attributes(
                        attributes,
                        accessors.len(),
                        &format!("{}.targets[{}]", owner, target),
                    )?,
                })
            })
            .collect::<Result<_, LoadError>>()?;

        Ok(Primitive {
            attributes,
            indices,
            material: check_optional(
                AssetArray::Materials,
                primitive.material,
                materials_len,
                || format!("{}.material", owner),
            )?,
            mode,
            targets,
            bounds: BoundingBox::EMPTY,
            extensions: Extensions::opaque(primitive.extensions.as_ref()),
            extras: primitive.extras.clone(),
        })
    }

    fn load_meshes(
        &self,
        accessors: &[Accessor],
        materials_len: usize,
    ) -> Result<Vec<Mesh>, LoadError> {
        self.root
            .meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| {
                let primitives = mesh
                    .primitives
                    .iter()
                    .enumerate()
                    .map(|(primitive_index, primitive)| {
                        Self::load_primitive(
                            index,
                            primitive_index,
                            primitive,
                            accessors,
                            materials_len,
                        )
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Mesh {
                    name: mesh.name.clone(),
                    primitives,
                    weights: mesh.weights.clone().unwrap_or_default(),
                    bounds: BoundingBox::EMPTY,
                    extensions: Extensions::opaque(mesh.extensions.as_ref()),
                    extras: mesh.extras.clone(),
                })
            })
            .collect()
    }

    fn load_skins(&self, accessors: &[Accessor]) -> Result<Vec<Skin>, LoadError> {
        let nodes_len = self.root.nodes.len();
        self.root
            .skins
            .iter()
            .enumerate()
            .map(|(index, skin)| {
                let joints = skin
                    .joints
                    .iter()
                    .enumerate()
                    .map(|(joint, node)| {
                        check_index(AssetArray::Nodes, *node, nodes_len, || {
                            format!("skins[{}].joints[{}]", index, joint)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let inverse_bind_matrices: Option<Index<Accessor>> = check_optional(
                    AssetArray::Accessors,
                    skin.inverse_bind_matrices,
                    accessors.len(),
                    || field("skins", index, "inverseBindMatrices"),
                )?;
                if let Some(matrices) = inverse_bind_matrices {
                    let accessor = &accessors[matrices.value()];
                    if accessor.dimensions != Dimensions::Mat4
                        || accessor.component_type != ComponentType::F32
                    {
                        return Err(LoadError::Unsupported(format!(
                            "skins[{}].inverseBindMatrices of {} {}, expected MAT4 FLOAT",
                            index, accessor.dimensions, accessor.component_type
                        )));
                    }
                    if accessor.count < joints.len() {
                        return Err(LoadError::range(
                            field("skins", index, "inverseBindMatrices"),
                            format!(
                                "{} matrices for {} joints",
                                accessor.count,
                                joints.len()
                            ),
                        ));
                    }
                }

                Ok(Skin {
                    name: skin.name.clone(),
                    inverse_bind_matrices,
                    joints,
                    skeleton: check_optional(AssetArray::Nodes, skin.skeleton, nodes_len, || {
                        field("skins", index, "skeleton")
                    })?,
                    extensions: Extensions::opaque(skin.extensions.as_ref()),
                    extras: skin.extras.clone(),
                })
            })
            .collect()
    }

    fn load_node(
        &self,
        index: usize,
        node: &json::Node,
        meshes_len: usize,
        cameras_len: usize,
        skins_len: usize,
        lights_len: usize,
    ) -> Result<Node, LoadError> {
        let transform = match node.matrix {
            Some(matrix) => NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_cols_array(&matrix))),
            None => NodeTransform::Decomposed(DecomposedTransform {
                translation: node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
                rotation: node.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
                scale: node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
            }),
        };
        let nodes_len = self.root.nodes.len();
        let children = node
            .children
            .iter()
            .enumerate()
            .map(|(position, child)| {
                check_index(AssetArray::Nodes, *child, nodes_len, || {
                    format!("nodes[{}].children[{}]", index, position)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Node {
            name: node.name.clone(),
            transform,
            children,
            parent: None,
            mesh: check_optional(AssetArray::Meshes, node.mesh, meshes_len, || {
                field("nodes", index, "mesh")
            })?,
            camera: check_optional(AssetArray::Cameras, node.camera, cameras_len, || {
                field("nodes", index, "camera")
            })?,
            skin: check_optional(AssetArray::Skins, node.skin, skins_len, || {
                field("nodes", index, "skin")
            })?,
            light: None,
            weights: node.weights.clone().unwrap_or_default(),
            bounds: BoundingBox::EMPTY,
            extensions: Extensions::default(),
            extras: node.extras.clone(),
        };
        result.extensions = NODE_EXTENSIONS.apply(&mut result, node.extensions.as_ref())?;
        if let Some(light) = result.light {
            check_index::<Light>(AssetArray::Lights, light.value(), lights_len, || {
                format!("nodes[{}].extensions.{}.light", index, KHR_LIGHTS_PUNCTUAL)
            })?;
        }
        Ok(result)
    }

    fn load_nodes(
        &self,
        meshes_len: usize,
        cameras_len: usize,
        skins_len: usize,
        lights_len: usize,
    ) -> Result<Vec<Node>, LoadError> {
        let mut nodes = self
            .root
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                self.load_node(index, node, meshes_len, cameras_len, skins_len, lights_len)
            })
            .collect::<Result<Vec<_>, _>>()?;
        link_hierarchy(&mut nodes)?;
        Ok(nodes)
    }

    fn load_animations(
        &self,
        accessors: &[Accessor],
        nodes_len: usize,
    ) -> Result<Vec<Animation>, LoadError> {
        let mut animations = Vec::with_capacity(self.root.animations.len());
        for (index, animation) in self.root.animations.iter().enumerate() {
            let mut samplers = Vec::with_capacity(animation.samplers.len());
            for (position, sampler) in animation.samplers.iter().enumerate() {
                let owner = format!("animations[{}].samplers[{}]", index, position);
                let input: Index<Accessor> =
                    check_index(AssetArray::Accessors, sampler.input, accessors.len(), || {
                        format!("{}.input", owner)
                    })?;
                let output =
                    check_index(AssetArray::Accessors, sampler.output, accessors.len(), || {
                        format!("{}.output", owner)
                    })?;
                let interpolation = match sampler.interpolation.as_deref() {
                    Some(name) => Interpolation::from_name(name).ok_or_else(|| {
                        LoadError::Unsupported(format!("{} interpolation {}", owner, name))
                    })?,
                    None => Interpolation::default(),
                };
                let input_accessor = &accessors[input.value()];
                if input_accessor.dimensions != Dimensions::Scalar
                    || input_accessor.component_type != ComponentType::F32
                {
                    return Err(LoadError::Unsupported(format!(
                        "{}.input of {} {}, expected SCALAR FLOAT",
                        owner, input_accessor.dimensions, input_accessor.component_type
                    )));
                }
                samplers.push(AnimationSampler {
                    input,
                    output,
                    interpolation,
                });
            }

            let mut channels = Vec::with_capacity(animation.channels.len());
            for (position, channel) in animation.channels.iter().enumerate() {
                let owner = format!("animations[{}].channels[{}]", index, position);
                let sampler: Index<AnimationSampler> = check_index(
                    AssetArray::AnimationSamplers,
                    channel.sampler,
                    samplers.len(),
                    || format!("{}.sampler", owner),
                )?;
                let property = Property::from_path(&channel.target.path).ok_or_else(|| {
                    LoadError::Unsupported(format!(
                        "{} target path {}",
                        owner, channel.target.path
                    ))
                })?;
                check_channel_output(&owner, &samplers[sampler.value()], property, accessors)?;
                channels.push(Channel {
                    sampler: sampler.value(),
                    target: check_optional(
                        AssetArray::Nodes,
                        channel.target.node,
                        nodes_len,
                        || format!("{}.target.node", owner),
                    )?,
                    property,
                });
            }

            animations.push(Animation {
                name: animation.name.clone(),
                channels,
                samplers,
                extensions: Extensions::opaque(animation.extensions.as_ref()),
                extras: animation.extras.clone(),
            });
        }
        Ok(animations)
    }

    fn load_scenes(&self, nodes_len: usize) -> Result<Vec<Scene>, LoadError> {
        self.root
            .scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                let nodes = scene
                    .nodes
                    .iter()
                    .enumerate()
                    .map(|(position, node)| {
                        check_index(AssetArray::Nodes, *node, nodes_len, || {
                            format!("scenes[{}].nodes[{}]", index, position)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Scene {
                    name: scene.name.clone(),
                    nodes,
                    bounds: BoundingBox::EMPTY,
                    extensions: Extensions::opaque(scene.extensions.as_ref()),
                    extras: scene.extras.clone(),
                })
            })
            .collect()
    }

    fn decode(self) -> Result<Asset, LoadError> {
        let info = self.load_info()?;
        self.check_required_extensions();

        let mut document = DocumentExtensions::default();
        let extensions = DOCUMENT_EXTENSIONS.apply(&mut document, self.root.extensions.as_ref())?;

        let buffers = self.load_buffers()?;
        let buffer_views = self.load_buffer_views(&buffers)?;
        let accessors = self.load_accessors(&buffers, &buffer_views)?;
        let samplers = self.load_samplers()?;
        let images = self.load_images(buffer_views.len())?;
        let textures = self.load_textures(images.len(), samplers.len())?;
        let materials = self.load_materials(textures.len())?;
        let cameras = self.load_cameras()?;
        let mut meshes = self.load_meshes(&accessors, materials.len())?;
        let skins = self.load_skins(&accessors)?;
        let mut nodes = self.load_nodes(
            meshes.len(),
            cameras.len(),
            skins.len(),
            document.lights.len(),
        )?;
        let animations = self.load_animations(&accessors, nodes.len())?;
        let mut scenes = self.load_scenes(nodes.len())?;
        let default_scene = check_optional(AssetArray::Scenes, self.root.scene, scenes.len(), || {
            String::from("scene")
        })?;

        if self.params.compute_bounds {
            compute_bounds(
                &buffers,
                &buffer_views,
                &accessors,
                &mut meshes,
                &mut nodes,
                &mut scenes,
            )?;
        }

        debug!(
            "Decoded {} buffers, {} accessors, {} meshes, {} materials, {} nodes, {} scenes, {} animations",
            buffers.len(),
            accessors.len(),
            meshes.len(),
            materials.len(),
            nodes.len(),
            scenes.len(),
            animations.len()
        );

        Ok(Asset {
            info,
            extensions_used: self.root.extensions_used.clone(),
            extensions_required: self.root.extensions_required.clone(),
            accessors,
            animations,
            buffers,
            buffer_views,
            cameras,
            images,
            lights: document.lights,
            materials,
            meshes,
            nodes,
            samplers,
            scenes,
            skins,
            textures,
            default_scene,
            extensions,
            extras: self.root.extras.clone(),
        })
    }
}

/// Output of a channel must hold one value per keyframe (three for cubic
/// splines), or one per morph target and keyframe for weights.
fn check_channel_output(
    owner: &str,
    sampler: &AnimationSampler,
    property: Property,
    accessors: &[Accessor],
) -> Result<(), LoadError> {
    let input = &accessors[sampler.input.value()];
    let output = &accessors[sampler.output.value()];
    let expected_dimensions = match property {
        Property::Translation | Property::Scale => Dimensions::Vec3,
        Property::Rotation => Dimensions::Vec4,
        Property::Weights => Dimensions::Scalar,
    };
    if output.dimensions != expected_dimensions {
        return Err(LoadError::Unsupported(format!(
            "{} output of type {} for {:?}",
            owner, output.dimensions, property
        )));
    }

    let keyframe_values = input
        .count
        .checked_mul(sampler.interpolation.values_per_keyframe())
        .ok_or_else(|| {
            LoadError::range(
                format!("{} input", owner),
                format!("{} keyframes overflow the value count", input.count),
            )
        })?;
    let consistent = match property {
        Property::Weights if keyframe_values > 0 => output.count % keyframe_values == 0,
        _ => output.count == keyframe_values,
    };
    if !consistent {
        return Err(LoadError::range(
            format!("{} output", owner),
            format!(
                "{} values for {} keyframes with {:?} interpolation",
                output.count, input.count, sampler.interpolation
            ),
        ));
    }
    Ok(())
}

/// Fill in parents and reject anything that is not a forest.
fn link_hierarchy(nodes: &mut [Node]) -> Result<(), LoadError> {
    for parent in 0..nodes.len() {
        for position in 0..nodes[parent].children.len() {
            let child = nodes[parent].children[position];
            if child.value() == parent {
                return Err(LoadError::Hierarchy {
                    node: parent,
                    detail: String::from("is its own child"),
                });
            }
            if let Some(previous) = nodes[child.value()].parent {
                return Err(LoadError::Hierarchy {
                    node: child.value(),
                    detail: format!("has two parents, #{} and #{}", previous, parent),
                });
            }
            nodes[child.value()].parent = Some(Index::new(parent as u32));
        }
    }

    // With one parent per node, whatever the roots cannot reach hangs off a
    // cycle.
    let reachable = preorder(nodes);
    if reachable.len() < nodes.len() {
        let mut visited = vec![false; nodes.len()];
        for node in reachable {
            visited[node] = true;
        }
        if let Some(node) = visited.iter().position(|visited| !visited) {
            return Err(LoadError::Hierarchy {
                node,
                detail: String::from("is part of a cycle"),
            });
        }
    }
    Ok(())
}

/// Nodes reachable from the roots, each parent before its children.
fn preorder(nodes: &[Node]) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = (0..nodes.len())
        .rev()
        .filter(|index| nodes[*index].parent.is_none())
        .collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(nodes[index].children.iter().rev().map(|child| child.value()));
    }
    order
}

fn compute_bounds(
    buffers: &[Buffer],
    views: &[BufferView],
    accessors: &[Accessor],
    meshes: &mut [Mesh],
    nodes: &mut [Node],
    scenes: &mut [Scene],
) -> Result<(), LoadError> {
    for mesh in meshes.iter_mut() {
        let mut mesh_bounds = BoundingBox::EMPTY;
        for primitive in mesh.primitives.iter_mut() {
            if let Some(position) = primitive.position() {
                primitive.bounds = accessors[position.value()].bounds(buffers, views)?;
            }
            mesh_bounds = mesh_bounds.union(primitive.bounds);
        }
        mesh.bounds = mesh_bounds;
    }

    // Children come after their parent in preorder, so walking it backwards
    // sees every subtree before its root.
    for index in preorder(nodes).into_iter().rev() {
        let node = &nodes[index];
        let mut bounds = node
            .mesh
            .map(|mesh| meshes[mesh.value()].bounds)
            .unwrap_or(BoundingBox::EMPTY);
        for child in &node.children {
            bounds = bounds.union(nodes[child.value()].bounds);
        }
        let bounds = bounds.transform(&node.local_matrix());
        nodes[index].bounds = bounds;
    }

    for scene in scenes.iter_mut() {
        scene.bounds = scene
            .nodes
            .iter()
            .fold(BoundingBox::EMPTY, |bounds, node| {
                bounds.union(nodes[node.value()].bounds)
            });
    }
    Ok(())
}

/// Decode a glTF document or GLB container.
pub(crate) fn decode<R: ResourceResolver + ?Sized>(
    data: Bytes,
    resolver: &R,
    params: &LoadParams,
) -> Result<Asset, LoadError> {
    let (json, bin) = if container::is_container(&data) {
        let container = Container::parse(data)?;
        debug!(
            "Container with {} bytes of JSON and {} bytes of binary data",
            container.json.len(),
            container.bin.as_ref().map(Bytes::len).unwrap_or(0)
        );
        (container.json, container.bin)
    } else {
        (data, None)
    };
    let root: json::Root = serde_json::from_slice(&json)?;
    Decoder {
        root: &root,
        bin,
        resolver,
        params,
    }
    .decode()
}

#[cfg(test)]
mod test {
    use super::{check_channel_output, link_hierarchy, preorder};
    use crate::{
        accessor::{Accessor, ComponentType, Dimensions},
        animation::{AnimationSampler, Interpolation, Property},
        error::{ErrorKind, LoadError},
        extension::Extensions,
        index::Index,
        node::Node,
    };

    fn float_accessor(dimensions: Dimensions, count: usize) -> Accessor {
        Accessor {
            name: None,
            view: None,
            byte_offset: 0,
            component_type: ComponentType::F32,
            normalized: false,
            dimensions,
            count,
            min: None,
            max: None,
            sparse: None,
            stride: 4 * dimensions.component_count(),
            extensions: Extensions::default(),
            extras: None,
        }
    }

    fn forest(children: &[&[u32]]) -> Vec<Node> {
        children
            .iter()
            .map(|children| Node {
                children: children.iter().map(|child| Index::new(*child)).collect(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn parents_and_order() {
        let mut nodes = forest(&[&[2], &[], &[3], &[]]);
        link_hierarchy(&mut nodes).unwrap();
        assert_eq!(nodes[2].parent, Some(Index::new(0)));
        assert_eq!(nodes[3].parent, Some(Index::new(2)));
        assert!(nodes[1].is_root());
        assert_eq!(preorder(&nodes), vec![0, 2, 3, 1]);
    }

    #[test]
    fn self_child() {
        let mut nodes = forest(&[&[], &[1]]);
        let error = link_hierarchy(&mut nodes).unwrap_err();
        assert!(matches!(error, LoadError::Hierarchy { node: 1, .. }));
    }

    #[test]
    fn two_parents() {
        let mut nodes = forest(&[&[2], &[2], &[]]);
        let error = link_hierarchy(&mut nodes).unwrap_err();
        assert!(matches!(error, LoadError::Hierarchy { node: 2, .. }));
    }

    #[test]
    fn detached_cycle() {
        let mut nodes = forest(&[&[], &[2], &[3], &[1]]);
        let error = link_hierarchy(&mut nodes).unwrap_err();
        assert!(matches!(error, LoadError::Hierarchy { node: 1, .. }));
    }

    #[test]
    fn cubic_spline_keyframe_overflow() {
        let accessors = vec![
            float_accessor(Dimensions::Scalar, usize::MAX),
            float_accessor(Dimensions::Vec3, 3),
        ];
        let sampler = AnimationSampler {
            input: Index::new(0),
            output: Index::new(1),
            interpolation: Interpolation::CubicSpline,
        };
        let error = check_channel_output(
            "animations[0].channels[0]",
            &sampler,
            Property::Translation,
            &accessors,
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Range);
    }

    #[test]
    fn cubic_spline_output_count() {
        let sampler = AnimationSampler {
            input: Index::new(0),
            output: Index::new(1),
            interpolation: Interpolation::CubicSpline,
        };
        let accessors = vec![
            float_accessor(Dimensions::Scalar, 2),
            float_accessor(Dimensions::Vec3, 6),
        ];
        check_channel_output("channel", &sampler, Property::Scale, &accessors).unwrap();
    }
}
