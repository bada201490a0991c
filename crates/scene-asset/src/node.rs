use glam::{Mat4, Quat, Vec3};
use serde_json::Value;

use crate::{
    camera::Camera, extension::Extensions, index::Index, light::Light, math::BoundingBox,
    mesh::Mesh, skin::Skin,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixNodeTransform(pub Mat4);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(MatrixNodeTransform),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl From<MatrixNodeTransform> for Mat4 {
    fn from(value: MatrixNodeTransform) -> Self {
        value.0
    }
}

// Scale first, then rotate, then translate
impl From<DecomposedTransform> for Mat4 {
    fn from(value: DecomposedTransform) -> Self {
        Mat4::from_translation(value.translation)
            * Mat4::from_quat(value.rotation)
            * Mat4::from_scale(value.scale)
    }
}

impl From<NodeTransform> for Mat4 {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => matrix.0,
            NodeTransform::Decomposed(decomposed) => decomposed.into(),
        }
    }
}

impl From<NodeTransform> for MatrixNodeTransform {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => matrix,
            NodeTransform::Decomposed(decomposed) => MatrixNodeTransform(decomposed.into()),
        }
    }
}

impl From<NodeTransform> for DecomposedTransform {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => {
                let (scale, rotation, translation) = matrix.0.to_scale_rotation_translation();
                DecomposedTransform {
                    translation,
                    rotation,
                    scale,
                }
            }
            NodeTransform::Decomposed(decomposed) => decomposed,
        }
    }
}

impl NodeTransform {
    pub fn matrix(&self) -> Mat4 {
        (*self).into()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub children: Vec<Index<Node>>,
    /// Derived from the children lists. Roots have none.
    pub parent: Option<Index<Node>>,
    pub mesh: Option<Index<Mesh>>,
    pub camera: Option<Index<Camera>>,
    pub skin: Option<Index<Skin>>,
    /// Punctual light attached through `KHR_lights_punctual`.
    pub light: Option<Index<Light>>,
    pub weights: Vec<f32>,
    /// Bounds of this node's mesh and all descendants, in the parent's
    /// coordinate space. Empty when nothing below carries geometry.
    pub bounds: BoundingBox,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Node {
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Quat, Vec3};

    use super::{DecomposedTransform, MatrixNodeTransform, NodeTransform};

    #[test]
    fn decomposed_matrix_is_trs() {
        let transform = NodeTransform::Decomposed(DecomposedTransform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        });
        let matrix = transform.matrix();
        assert_eq!(matrix.transform_point3(Vec3::ONE), Vec3::new(3.0, 2.0, 2.0));
        assert_eq!(
            matrix,
            Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::X)
        );
    }

    #[test]
    fn matrix_round_trips_through_decomposition() {
        let decomposed = DecomposedTransform {
            translation: Vec3::new(0.5, -1.0, 4.0),
            rotation: Quat::from_rotation_y(0.8),
            scale: Vec3::new(1.0, 2.0, 3.0),
        };
        let matrix: MatrixNodeTransform = NodeTransform::Decomposed(decomposed).into();
        let back: DecomposedTransform = NodeTransform::Matrix(matrix).into();
        assert!(back.translation.abs_diff_eq(decomposed.translation, 1e-5));
        assert!(back.rotation.abs_diff_eq(decomposed.rotation, 1e-5));
        assert!(back.scale.abs_diff_eq(decomposed.scale, 1e-5));
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(NodeTransform::default().matrix(), Mat4::IDENTITY);
    }
}
