use glam::{Vec3, Vec4};
use serde_json::Value;

use crate::{
    extension::Extensions,
    texture::{NormalTextureInfo, OcclusionTextureInfo, TextureInfo},
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MaterialAlphaMode {
    #[default]
    Opaque,
    // Alpha cutoff
    Mask(f32),
    Blend,
}

impl MaterialAlphaMode {
    pub const DEFAULT_CUTOFF: f32 = 0.5;
}

/// The core lighting model.
#[derive(Debug, Clone)]
pub struct MetallicRoughness {
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for MetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

/// `KHR_materials_pbrSpecularGlossiness`.
#[derive(Debug, Clone)]
pub struct SpecularGlossiness {
    pub diffuse_factor: Vec4,
    pub diffuse_texture: Option<TextureInfo>,
    pub specular_factor: Vec3,
    pub glossiness_factor: f32,
    pub specular_glossiness_texture: Option<TextureInfo>,
}

impl Default for SpecularGlossiness {
    fn default() -> Self {
        Self {
            diffuse_factor: Vec4::ONE,
            diffuse_texture: None,
            specular_factor: Vec3::ONE,
            glossiness_factor: 1.0,
            specular_glossiness_texture: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingModel {
    MetallicRoughness,
    SpecularGlossiness,
    Unlit,
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: Option<String>,
    pub metallic_roughness: MetallicRoughness,
    pub specular_glossiness: Option<SpecularGlossiness>,
    pub normal_texture: Option<NormalTextureInfo>,
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: Vec3,
    pub alpha_mode: MaterialAlphaMode,
    pub double_sided: bool,
    /// Set by `KHR_materials_unlit`.
    pub unlit: bool,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Material {
    /// Unlit wins over specular-glossiness, which wins over the core model.
    pub fn shading_model(&self) -> ShadingModel {
        if self.unlit {
            ShadingModel::Unlit
        } else if self.specular_glossiness.is_some() {
            ShadingModel::SpecularGlossiness
        } else {
            ShadingModel::MetallicRoughness
        }
    }

    /// Every texture reference held by this material.
    pub fn texture_infos(&self) -> impl Iterator<Item = &TextureInfo> {
        let metallic_roughness = [
            self.metallic_roughness.base_color_texture.as_ref(),
            self.metallic_roughness.metallic_roughness_texture.as_ref(),
        ];
        let specular_glossiness = self
            .specular_glossiness
            .as_ref()
            .map(|specular_glossiness| {
                [
                    specular_glossiness.diffuse_texture.as_ref(),
                    specular_glossiness.specular_glossiness_texture.as_ref(),
                ]
            })
            .unwrap_or_default();
        let others = [
            self.normal_texture.as_ref().map(|normal| &normal.info),
            self.occlusion_texture.as_ref().map(|occlusion| &occlusion.info),
            self.emissive_texture.as_ref(),
        ];
        metallic_roughness
            .into_iter()
            .chain(specular_glossiness)
            .chain(others)
            .flatten()
    }
}

#[cfg(test)]
mod test {
    use super::{Material, ShadingModel, SpecularGlossiness};
    use crate::{
        index::Index,
        texture::{NormalTextureInfo, TextureInfo},
    };

    #[test]
    fn default_material() {
        let material = Material::default();
        assert_eq!(material.shading_model(), ShadingModel::MetallicRoughness);
        assert_eq!(material.metallic_roughness.metallic_factor, 1.0);
        assert_eq!(material.texture_infos().count(), 0);
    }

    #[test]
    fn shading_model_precedence() {
        let mut material = Material {
            specular_glossiness: Some(SpecularGlossiness::default()),
            ..Default::default()
        };
        assert_eq!(material.shading_model(), ShadingModel::SpecularGlossiness);
        material.unlit = true;
        assert_eq!(material.shading_model(), ShadingModel::Unlit);
    }

    #[test]
    fn collects_texture_infos() {
        let mut material = Material::default();
        material.metallic_roughness.base_color_texture = Some(TextureInfo::new(Index::new(0)));
        material.normal_texture = Some(NormalTextureInfo {
            info: TextureInfo::new(Index::new(1)),
            scale: 1.0,
        });
        material.specular_glossiness = Some(SpecularGlossiness {
            diffuse_texture: Some(TextureInfo::new(Index::new(2))),
            ..Default::default()
        });
        let textures: Vec<usize> = material
            .texture_infos()
            .map(|info| info.texture.value())
            .collect();
        assert_eq!(textures, vec![0, 2, 1]);
    }
}
