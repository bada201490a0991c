//! The decoded document and its public read interface.

use std::{fs, path::Path};

use bytes::Bytes;
use glam::{Mat4, Quat};
use serde_json::Value;

use crate::{
    accessor::{Accessor, Element},
    animation::{
        Animation, AnimationKeyFrame, AnimationKeyFrames, ChannelKeyFrames, Interpolation,
        Property,
    },
    buffer::{view_bytes, Buffer, BufferView},
    camera::Camera,
    error::LoadError,
    extension::Extensions,
    index::Index,
    light::Light,
    loader::{gltf, LoadParams},
    material::Material,
    math::BoundingBox,
    mesh::Mesh,
    node::Node,
    resolver::{DirectoryResolver, NoResolver, ResourceResolver},
    scene::Scene,
    skin::Skin,
    texture::{Image, Sampler, Texture},
};

/// Document metadata from the `asset` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub version: String,
    pub min_version: Option<String>,
    pub generator: Option<String>,
    pub copyright: Option<String>,
}

/// A fully decoded and validated glTF document.
///
/// Every handle stored inside the asset is known to be in range, so the
/// per-handle getters only panic when given a handle produced by another
/// asset.
#[derive(Debug, Clone)]
pub struct Asset {
    pub(crate) info: Info,
    pub(crate) extensions_used: Vec<String>,
    pub(crate) extensions_required: Vec<String>,
    pub(crate) accessors: Vec<Accessor>,
    pub(crate) animations: Vec<Animation>,
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) buffer_views: Vec<BufferView>,
    pub(crate) cameras: Vec<Camera>,
    pub(crate) images: Vec<Image>,
    pub(crate) lights: Vec<Light>,
    pub(crate) materials: Vec<Material>,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) samplers: Vec<Sampler>,
    pub(crate) scenes: Vec<Scene>,
    pub(crate) skins: Vec<Skin>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) default_scene: Option<Index<Scene>>,
    pub(crate) extensions: Extensions,
    pub(crate) extras: Option<Value>,
}

impl Asset {
    /// Decode a self-contained document. The bytes are copied once.
    pub fn from_slice(data: &[u8], params: &LoadParams) -> Result<Self, LoadError> {
        Self::from_bytes(Bytes::copy_from_slice(data), params)
    }

    /// Decode a self-contained document. The binary chunk of a container is
    /// handed to the allocator without copying.
    pub fn from_bytes(data: Bytes, params: &LoadParams) -> Result<Self, LoadError> {
        Self::from_bytes_with_resolver(data, &NoResolver, params)
    }

    pub fn from_bytes_with_resolver<R: ResourceResolver + ?Sized>(
        data: Bytes,
        resolver: &R,
        params: &LoadParams,
    ) -> Result<Self, LoadError> {
        gltf::decode(data, resolver, params)
    }

    /// Decode a file, resolving relative URIs against its directory.
    pub fn from_path<P: AsRef<Path>>(path: P, params: &LoadParams) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let base = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_bytes_with_resolver(Bytes::from(data), &DirectoryResolver::new(base), params)
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn extensions_used(&self) -> &[String] {
        &self.extensions_used
    }

    pub fn extensions_required(&self) -> &[String] {
        &self.extensions_required
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extras(&self) -> Option<&Value> {
        self.extras.as_ref()
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn buffer_views(&self) -> &[BufferView] {
        &self.buffer_views
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn samplers(&self) -> &[Sampler] {
        &self.samplers
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn default_scene(&self) -> Option<Index<Scene>> {
        self.default_scene
    }

    /// Scene to show when nothing else is asked for: the declared default,
    /// else the first one.
    pub fn main_scene(&self) -> Option<&Scene> {
        match self.default_scene {
            Some(scene) => Some(self.scene(scene)),
            None => self.scenes.first(),
        }
    }

    pub fn accessor(&self, index: Index<Accessor>) -> &Accessor {
        &self.accessors[index.value()]
    }

    pub fn animation(&self, index: Index<Animation>) -> &Animation {
        &self.animations[index.value()]
    }

    pub fn buffer(&self, index: Index<Buffer>) -> &Buffer {
        &self.buffers[index.value()]
    }

    pub fn buffer_view(&self, index: Index<BufferView>) -> &BufferView {
        &self.buffer_views[index.value()]
    }

    pub fn camera(&self, index: Index<Camera>) -> &Camera {
        &self.cameras[index.value()]
    }

    pub fn image(&self, index: Index<Image>) -> &Image {
        &self.images[index.value()]
    }

    pub fn light(&self, index: Index<Light>) -> &Light {
        &self.lights[index.value()]
    }

    pub fn material(&self, index: Index<Material>) -> &Material {
        &self.materials[index.value()]
    }

    pub fn mesh(&self, index: Index<Mesh>) -> &Mesh {
        &self.meshes[index.value()]
    }

    pub fn node(&self, index: Index<Node>) -> &Node {
        &self.nodes[index.value()]
    }

    pub fn sampler(&self, index: Index<Sampler>) -> &Sampler {
        &self.samplers[index.value()]
    }

    pub fn scene(&self, index: Index<Scene>) -> &Scene {
        &self.scenes[index.value()]
    }

    pub fn skin(&self, index: Index<Skin>) -> &Skin {
        &self.skins[index.value()]
    }

    pub fn texture(&self, index: Index<Texture>) -> &Texture {
        &self.textures[index.value()]
    }

    /// Append a light. Nodes keep pointing where they pointed.
    pub fn add_light(&mut self, light: Light) -> Index<Light> {
        self.lights.push(light);
        Index::new((self.lights.len() - 1) as u32)
    }

    pub fn add_camera(&mut self, camera: Camera) -> Index<Camera> {
        self.cameras.push(camera);
        Index::new((self.cameras.len() - 1) as u32)
    }

    /// Element `index` of `accessor`, with stride, sparse overrides and
    /// normalization applied.
    pub fn read(&self, accessor: Index<Accessor>, index: usize) -> Result<Element, LoadError> {
        self.accessor(accessor)
            .read_element(&self.buffers, &self.buffer_views, index)
    }

    /// Exact value of an integer scalar accessor, as used for vertex indices.
    pub fn read_index(&self, accessor: Index<Accessor>, index: usize) -> Result<u32, LoadError> {
        self.accessor(accessor)
            .read_u32(&self.buffers, &self.buffer_views, index)
    }

    pub fn iter_accessor(
        &self,
        accessor: Index<Accessor>,
    ) -> crate::accessor::AccessorIter<'_> {
        self.accessor(accessor)
            .iter(&self.buffers, &self.buffer_views)
    }

    /// Bounds found by reading every element, ignoring declared `min`/`max`.
    pub fn scan_bounds(&self, accessor: Index<Accessor>) -> Result<BoundingBox, LoadError> {
        self.accessor(accessor)
            .scan_bounds(&self.buffers, &self.buffer_views)
    }

    /// Raw bytes of a buffer view, for consumers like image decoders.
    pub fn buffer_view_data(&self, view: Index<BufferView>) -> Result<&[u8], LoadError> {
        view_bytes(&self.buffers, &self.buffer_views, view)
    }

    /// Transform from node space to scene space.
    pub fn node_world_matrix(&self, node: Index<Node>) -> Mat4 {
        let mut current = self.node(node);
        let mut matrix = current.local_matrix();
        while let Some(parent) = current.parent {
            current = self.node(parent);
            matrix = current.local_matrix() * matrix;
        }
        matrix
    }

    fn read_times(&self, accessor: Index<Accessor>) -> Result<Vec<f32>, LoadError> {
        self.iter_accessor(accessor)
            .map(|element| {
                element?
                    .as_scalar()
                    .ok_or_else(|| LoadError::Unsupported(String::from("non-scalar keyframe time")))
            })
            .collect()
    }

    fn read_values<T>(
        &self,
        accessor: Index<Accessor>,
        convert: impl Fn(Element) -> Option<T>,
    ) -> Result<Vec<T>, LoadError> {
        self.iter_accessor(accessor)
            .map(|element| {
                let element = element?;
                convert(element).ok_or_else(|| {
                    LoadError::Unsupported(format!(
                        "keyframe value of type {}",
                        element.dimensions()
                    ))
                })
            })
            .collect()
    }

    /// Keyframes of one channel of `animation`, read from its sampler.
    pub fn animation_keyframes(
        &self,
        animation: Index<Animation>,
        channel: usize,
    ) -> Result<ChannelKeyFrames, LoadError> {
        let animation = self.animation(animation);
        let channel = animation.channels.get(channel).ok_or_else(|| {
            LoadError::range(
                "animation channel",
                format!("{} of {} channels", channel, animation.channels.len()),
            )
        })?;
        // Channels only hold sampler positions that were checked at decode.
        let sampler = &animation.samplers[channel.sampler];
        let times = self.read_times(sampler.input)?;
        let interpolation = sampler.interpolation;

        Ok(match channel.property {
            Property::Translation => ChannelKeyFrames::Translation(keyframes(
                interpolation,
                &times,
                self.read_values(sampler.output, |element| element.as_vec3())?,
            )),
            Property::Scale => ChannelKeyFrames::Scale(keyframes(
                interpolation,
                &times,
                self.read_values(sampler.output, |element| element.as_vec3())?,
            )),
            Property::Rotation => ChannelKeyFrames::Rotation(keyframes(
                interpolation,
                &times,
                self.read_values(sampler.output, |element| {
                    element.as_vec4().map(Quat::from_vec4)
                })?,
            )),
            Property::Weights => {
                let values = self.read_values(sampler.output, |element| element.as_scalar())?;
                let frames = times.len() * interpolation.values_per_keyframe();
                let targets = if frames == 0 { 0 } else { values.len() / frames };
                let grouped = values
                    .chunks(targets.max(1))
                    .take(frames)
                    .map(<[f32]>::to_vec)
                    .collect();
                ChannelKeyFrames::Weights(keyframes(interpolation, &times, grouped))
            }
        })
    }
}

fn keyframes<T: std::fmt::Debug + Clone>(
    interpolation: Interpolation,
    times: &[f32],
    values: Vec<T>,
) -> AnimationKeyFrames<T> {
    match interpolation {
        Interpolation::Step | Interpolation::Linear => {
            let frames = times
                .iter()
                .zip(values)
                .map(|(time, value)| AnimationKeyFrame { time: *time, value })
                .collect();
            if interpolation == Interpolation::Step {
                AnimationKeyFrames::Step(frames)
            } else {
                AnimationKeyFrames::Linear(frames)
            }
        }
        Interpolation::CubicSpline => {
            let mut values = values.into_iter();
            let mut frames = Vec::with_capacity(times.len());
            for time in times {
                let (Some(in_tangent), Some(value), Some(out_tangent)) =
                    (values.next(), values.next(), values.next())
                else {
                    break;
                };
                frames.push(AnimationKeyFrame {
                    time: *time,
                    value: (in_tangent, value, out_tangent),
                });
            }
            AnimationKeyFrames::CubicSpline(frames)
        }
    }
}
