use serde_json::Value;

use super::{extension::Extensions, math::BoundingBox, primitive::Primitive};

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    pub weights: Vec<f32>,
    /// Union of the primitive bounds, in mesh space.
    pub bounds: BoundingBox,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}
