use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use serde_json::Value;

use crate::{
    accessor::Accessor, extension::Extensions, index::Index, material::Material,
    math::BoundingBox,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

/// Vertex attribute name. Numbered sets keep their number; names starting
/// with an underscore, and any name this crate does not know, are kept as
/// [`Semantic::Extra`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
    Extra(String),
}

impl Semantic {
    pub fn parse(name: &str) -> Self {
        fn numbered(name: &str, prefix: &str) -> Option<u32> {
            name.strip_prefix(prefix)?.parse().ok()
        }

        match name {
            "POSITION" => Semantic::Position,
            "NORMAL" => Semantic::Normal,
            "TANGENT" => Semantic::Tangent,
            _ => {
                if let Some(set) = numbered(name, "TEXCOORD_") {
                    Semantic::TexCoord(set)
                } else if let Some(set) = numbered(name, "COLOR_") {
                    Semantic::Color(set)
                } else if let Some(set) = numbered(name, "JOINTS_") {
                    Semantic::Joints(set)
                } else if let Some(set) = numbered(name, "WEIGHTS_") {
                    Semantic::Weights(set)
                } else {
                    Semantic::Extra(name.to_string())
                }
            }
        }
    }
}

impl Display for Semantic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Semantic::Position => write!(f, "POSITION"),
            Semantic::Normal => write!(f, "NORMAL"),
            Semantic::Tangent => write!(f, "TANGENT"),
            Semantic::TexCoord(set) => write!(f, "TEXCOORD_{}", set),
            Semantic::Color(set) => write!(f, "COLOR_{}", set),
            Semantic::Joints(set) => write!(f, "JOINTS_{}", set),
            Semantic::Weights(set) => write!(f, "WEIGHTS_{}", set),
            Semantic::Extra(name) => f.write_str(name),
        }
    }
}

pub type Attributes = BTreeMap<Semantic, Index<Accessor>>;

#[derive(Debug, Clone, Default)]
pub struct MorphTarget {
    pub attributes: Attributes,
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub attributes: Attributes,
    pub indices: Option<Index<Accessor>>,
    pub material: Option<Index<Material>>,
    pub mode: PrimitiveMode,
    pub targets: Vec<MorphTarget>,
    /// From the position accessor; empty without positions.
    pub bounds: BoundingBox,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Primitive {
    pub fn attribute(&self, semantic: &Semantic) -> Option<Index<Accessor>> {
        self.attributes.get(semantic).copied()
    }

    pub fn position(&self) -> Option<Index<Accessor>> {
        self.attribute(&Semantic::Position)
    }
}

#[cfg(test)]
mod test {
    use super::{PrimitiveMode, Semantic};

    #[test]
    fn parse_semantics() {
        assert_eq!(Semantic::parse("POSITION"), Semantic::Position);
        assert_eq!(Semantic::parse("TEXCOORD_1"), Semantic::TexCoord(1));
        assert_eq!(Semantic::parse("JOINTS_0"), Semantic::Joints(0));
        assert_eq!(Semantic::parse("WEIGHTS_2"), Semantic::Weights(2));
        assert_eq!(Semantic::parse("COLOR_0"), Semantic::Color(0));
        assert_eq!(
            Semantic::parse("_TEMPERATURE"),
            Semantic::Extra(String::from("_TEMPERATURE"))
        );
        assert_eq!(
            Semantic::parse("TEXCOORD_x"),
            Semantic::Extra(String::from("TEXCOORD_x"))
        );
        assert_eq!(Semantic::TexCoord(3).to_string(), "TEXCOORD_3");
    }

    #[test]
    fn modes() {
        assert_eq!(PrimitiveMode::from_code(4), Some(PrimitiveMode::Triangles));
        assert_eq!(PrimitiveMode::from_code(7), None);
        assert_eq!(PrimitiveMode::default(), PrimitiveMode::Triangles);
    }
}
