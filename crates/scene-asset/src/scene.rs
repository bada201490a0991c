use serde_json::Value;

use super::{extension::Extensions, index::Index, math::BoundingBox, node::Node};

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<Index<Node>>,
    /// Union of the root node bounds.
    pub bounds: BoundingBox,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}
