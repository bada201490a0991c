use serde_json::Value;

use crate::{accessor::Accessor, extension::Extensions, index::Index, node::Node};

#[derive(Debug, Clone)]
pub struct Skin {
    pub name: Option<String>,
    /// One MAT4 per joint when present; identity matrices otherwise.
    pub inverse_bind_matrices: Option<Index<Accessor>>,
    pub joints: Vec<Index<Node>>,
    pub skeleton: Option<Index<Node>>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}
