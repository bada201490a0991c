use std::f32::consts::FRAC_PI_4;

use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
    /// Uniform light with no position or direction.
    Ambient,
    /// A type this crate does not know, kept by name so node references
    /// to later lights stay valid.
    Other(String),
}

impl LightKind {
    pub const DEFAULT_INNER_CONE_ANGLE: f32 = 0.0;
    pub const DEFAULT_OUTER_CONE_ANGLE: f32 = FRAC_PI_4;

    pub fn spot() -> Self {
        LightKind::Spot {
            inner_cone_angle: Self::DEFAULT_INNER_CONE_ANGLE,
            outer_cone_angle: Self::DEFAULT_OUTER_CONE_ANGLE,
        }
    }
}

/// Punctual light. Directional and spot lights shine along the local -Z
/// axis of the node they are attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: Option<String>,
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    /// Unlimited when absent.
    pub range: Option<f32>,
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        Self {
            name: None,
            kind,
            color: Vec3::ONE,
            intensity: 1.0,
            range: None,
        }
    }
}
