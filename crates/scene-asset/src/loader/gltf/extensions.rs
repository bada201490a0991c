//! Extension tables for each owner kind.

use glam::{Vec2, Vec3, Vec4};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::{json, texture_info};
use crate::{
    error::LoadError,
    extension::ExtensionRegistry,
    index::Index,
    light::{Light, LightKind},
    material::{Material, SpecularGlossiness},
    node::Node,
    texture::{TextureInfo, TextureTransform},
};

pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";
pub const KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS: &str = "KHR_materials_pbrSpecularGlossiness";
pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";
pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";

/// Entities declared in the extensions of the document root.
#[derive(Debug, Default)]
pub(crate) struct DocumentExtensions {
    pub lights: Vec<Light>,
}

pub(crate) const DOCUMENT_EXTENSIONS: ExtensionRegistry<DocumentExtensions> =
    ExtensionRegistry::new(&[(KHR_LIGHTS_PUNCTUAL, decode_lights)]);

pub(crate) const NODE_EXTENSIONS: ExtensionRegistry<Node> =
    ExtensionRegistry::new(&[(KHR_LIGHTS_PUNCTUAL, decode_node_light)]);

pub(crate) const MATERIAL_EXTENSIONS: ExtensionRegistry<Material> = ExtensionRegistry::new(&[
    (
        KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS,
        decode_specular_glossiness,
    ),
    (KHR_MATERIALS_UNLIT, decode_unlit),
]);

pub(crate) const TEXTURE_INFO_EXTENSIONS: ExtensionRegistry<TextureInfo> =
    ExtensionRegistry::new(&[(KHR_TEXTURE_TRANSFORM, decode_texture_transform)]);

/// Whether any table decodes `name`.
pub(crate) fn is_supported(name: &str) -> bool {
    DOCUMENT_EXTENSIONS.is_recognized(name)
        || NODE_EXTENSIONS.is_recognized(name)
        || MATERIAL_EXTENSIONS.is_recognized(name)
        || TEXTURE_INFO_EXTENSIONS.is_recognized(name)
}

fn payload<T: DeserializeOwned>(name: &'static str, value: &Value) -> Result<T, LoadError> {
    T::deserialize(value).map_err(|error| LoadError::bad_extension(name, error.to_string()))
}

#[derive(Debug, Deserialize)]
struct LightsPayload {
    #[serde(default)]
    lights: Vec<LightPayload>,
}

#[derive(Debug, Deserialize)]
struct LightPayload {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    color: Option<[f32; 3]>,
    intensity: Option<f32>,
    range: Option<f32>,
    spot: Option<SpotPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotPayload {
    inner_cone_angle: Option<f32>,
    outer_cone_angle: Option<f32>,
}

fn decode_lights(owner: &mut DocumentExtensions, value: &Value) -> Result<(), LoadError> {
    let lights: LightsPayload = payload(KHR_LIGHTS_PUNCTUAL, value)?;
    for (index, light) in lights.lights.into_iter().enumerate() {
        let kind = match light.kind.as_str() {
            "directional" => LightKind::Directional,
            "point" => LightKind::Point,
            "spot" => {
                let spot = light.spot.unwrap_or_default();
                LightKind::Spot {
                    inner_cone_angle: spot
                        .inner_cone_angle
                        .unwrap_or(LightKind::DEFAULT_INNER_CONE_ANGLE),
                    outer_cone_angle: spot
                        .outer_cone_angle
                        .unwrap_or(LightKind::DEFAULT_OUTER_CONE_ANGLE),
                }
            }
            "ambient" => LightKind::Ambient,
            _ => {
                warn!("Light #{} has unknown type {}", index, light.kind);
                LightKind::Other(light.kind)
            }
        };
        let mut decoded = Light::new(kind);
        decoded.name = light.name;
        if let Some(color) = light.color {
            decoded.color = Vec3::from_array(color);
        }
        if let Some(intensity) = light.intensity {
            decoded.intensity = intensity;
        }
        decoded.range = light.range;
        owner.lights.push(decoded);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct NodeLightPayload {
    light: usize,
}

fn decode_node_light(owner: &mut Node, value: &Value) -> Result<(), LoadError> {
    let NodeLightPayload { light } = payload(KHR_LIGHTS_PUNCTUAL, value)?;
    // Checked against the document lights once every node is built.
    owner.light = Some(Index::from_raw(light));
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecularGlossinessPayload {
    diffuse_factor: Option<[f32; 4]>,
    diffuse_texture: Option<json::TextureInfo>,
    specular_factor: Option<[f32; 3]>,
    glossiness_factor: Option<f32>,
    specular_glossiness_texture: Option<json::TextureInfo>,
}

fn decode_specular_glossiness(owner: &mut Material, value: &Value) -> Result<(), LoadError> {
    let data: SpecularGlossinessPayload = payload(KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS, value)?;
    let defaults = SpecularGlossiness::default();
    owner.specular_glossiness = Some(SpecularGlossiness {
        diffuse_factor: data
            .diffuse_factor
            .map(Vec4::from_array)
            .unwrap_or(defaults.diffuse_factor),
        diffuse_texture: data.diffuse_texture.as_ref().map(texture_info).transpose()?,
        specular_factor: data
            .specular_factor
            .map(Vec3::from_array)
            .unwrap_or(defaults.specular_factor),
        glossiness_factor: data.glossiness_factor.unwrap_or(defaults.glossiness_factor),
        specular_glossiness_texture: data
            .specular_glossiness_texture
            .as_ref()
            .map(texture_info)
            .transpose()?,
    });
    Ok(())
}

fn decode_unlit(owner: &mut Material, value: &Value) -> Result<(), LoadError> {
    if !value.is_object() {
        return Err(LoadError::bad_extension(
            KHR_MATERIALS_UNLIT,
            "expected an object",
        ));
    }
    owner.unlit = true;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextureTransformPayload {
    offset: Option<[f32; 2]>,
    rotation: Option<f32>,
    scale: Option<[f32; 2]>,
    tex_coord: Option<usize>,
}

fn decode_texture_transform(owner: &mut TextureInfo, value: &Value) -> Result<(), LoadError> {
    let data: TextureTransformPayload = payload(KHR_TEXTURE_TRANSFORM, value)?;
    let defaults = TextureTransform::default();
    owner.transform = Some(TextureTransform {
        offset: data.offset.map(Vec2::from_array).unwrap_or(defaults.offset),
        rotation: data.rotation.unwrap_or(defaults.rotation),
        scale: data.scale.map(Vec2::from_array).unwrap_or(defaults.scale),
        tex_coord: data.tex_coord,
    });
    Ok(())
}

#[cfg(test)]
mod test {
    use glam::{Vec2, Vec3};
    use serde_json::json;

    use super::{
        is_supported, DocumentExtensions, DOCUMENT_EXTENSIONS, MATERIAL_EXTENSIONS,
        NODE_EXTENSIONS, TEXTURE_INFO_EXTENSIONS,
    };
    use crate::{
        error::{FormatError, LoadError},
        index::Index,
        light::LightKind,
        material::{Material, ShadingModel},
        node::Node,
        texture::TextureInfo,
    };

    #[test]
    fn document_lights() {
        let extensions = json!({
            "KHR_lights_punctual": {
                "lights": [
                    { "type": "directional", "color": [1.0, 0.5, 0.0], "intensity": 3.0 },
                    { "type": "spot", "spot": { "outerConeAngle": 0.5 }, "range": 10.0 },
                ]
            }
        });
        let mut document = DocumentExtensions::default();
        let result = DOCUMENT_EXTENSIONS
            .apply(&mut document, extensions.as_object())
            .unwrap();
        assert_eq!(result.recognized(), &["KHR_lights_punctual"]);
        assert_eq!(document.lights.len(), 2);
        assert_eq!(document.lights[0].kind, LightKind::Directional);
        assert_eq!(document.lights[0].color, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(document.lights[0].intensity, 3.0);
        assert_eq!(
            document.lights[1].kind,
            LightKind::Spot {
                inner_cone_angle: 0.0,
                outer_cone_angle: 0.5
            }
        );
        assert_eq!(document.lights[1].range, Some(10.0));
    }

    #[test]
    fn unknown_light_types_are_kept() {
        let extensions = json!({
            "KHR_lights_punctual": {
                "lights": [
                    { "type": "area", "intensity": 2.0 },
                    { "type": "ambient", "color": [0.2, 0.2, 0.2] },
                    { "type": "point" }
                ]
            }
        });
        let mut document = DocumentExtensions::default();
        DOCUMENT_EXTENSIONS
            .apply(&mut document, extensions.as_object())
            .unwrap();
        assert_eq!(document.lights.len(), 3);
        assert_eq!(document.lights[0].kind, LightKind::Other(String::from("area")));
        assert_eq!(document.lights[0].intensity, 2.0);
        assert_eq!(document.lights[1].kind, LightKind::Ambient);
        assert_eq!(document.lights[1].color, Vec3::splat(0.2));
        assert_eq!(document.lights[2].kind, LightKind::Point);
    }

    #[test]
    fn light_without_type_fails() {
        let extensions = json!({ "KHR_lights_punctual": { "lights": [{ "intensity": 1.0 }] } });
        let mut document = DocumentExtensions::default();
        let error = DOCUMENT_EXTENSIONS
            .apply(&mut document, extensions.as_object())
            .unwrap_err();
        assert!(matches!(
            error,
            LoadError::Format(FormatError::BadExtension {
                name: "KHR_lights_punctual",
                ..
            })
        ));
    }

    #[test]
    fn node_light_reference() {
        let extensions = json!({ "KHR_lights_punctual": { "light": 1 } });
        let mut node = Node::default();
        NODE_EXTENSIONS
            .apply(&mut node, extensions.as_object())
            .unwrap();
        assert_eq!(node.light, Some(Index::new(1)));
    }

    #[test]
    fn specular_glossiness_and_unlit() {
        let extensions = json!({
            "KHR_materials_pbrSpecularGlossiness": {
                "diffuseFactor": [0.5, 0.5, 0.5, 1.0],
                "glossinessFactor": 0.25,
                "specularGlossinessTexture": { "index": 3, "texCoord": 1 }
            },
            "KHR_materials_unlit": {},
            "VENDOR_materials_sparkle": { "amount": 11 }
        });
        let mut material = Material::default();
        let result = MATERIAL_EXTENSIONS
            .apply(&mut material, extensions.as_object())
            .unwrap();

        let specular_glossiness = material.specular_glossiness.as_ref().unwrap();
        assert_eq!(specular_glossiness.glossiness_factor, 0.25);
        assert_eq!(specular_glossiness.specular_factor, Vec3::ONE);
        let texture = specular_glossiness
            .specular_glossiness_texture
            .as_ref()
            .unwrap();
        assert_eq!(texture.texture, Index::new(3));
        assert_eq!(texture.tex_coord, 1);
        assert!(material.unlit);
        assert_eq!(material.shading_model(), ShadingModel::Unlit);
        assert_eq!(
            result.get("VENDOR_materials_sparkle"),
            Some(&json!({ "amount": 11 }))
        );
    }

    #[test]
    fn texture_transform() {
        let extensions = json!({
            "KHR_texture_transform": { "offset": [0.5, 0.0], "scale": [2.0, 2.0], "texCoord": 1 }
        });
        let mut info = TextureInfo::new(Index::new(0));
        TEXTURE_INFO_EXTENSIONS
            .apply(&mut info, extensions.as_object())
            .unwrap();
        let transform = info.transform.unwrap();
        assert_eq!(transform.offset, Vec2::new(0.5, 0.0));
        assert_eq!(transform.rotation, 0.0);
        assert_eq!(info.effective_tex_coord(), 1);
    }

    #[test]
    fn malformed_transform_fails() {
        let extensions = json!({ "KHR_texture_transform": { "offset": "left" } });
        let mut info = TextureInfo::new(Index::new(0));
        assert!(TEXTURE_INFO_EXTENSIONS
            .apply(&mut info, extensions.as_object())
            .is_err());
    }

    #[test]
    fn supported_names() {
        assert!(is_supported("KHR_materials_unlit"));
        assert!(is_supported("KHR_lights_punctual"));
        assert!(!is_supported("KHR_draco_mesh_compression"));
    }
}
