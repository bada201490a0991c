use glam::{Mat4, Vec4};
use serde_json::Value;

use crate::extension::Extensions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Falls back to the viewport aspect ratio when absent.
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    pub znear: f32,
    /// Infinite projection when absent.
    pub zfar: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub xmag: f32,
    pub ymag: f32,
    pub znear: f32,
    pub zfar: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveCamera),
    Orthographic(OrthographicCamera),
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        Self {
            name: None,
            projection,
            extensions: Extensions::default(),
            extras: None,
        }
    }

    /// Right-handed projection with a `[-1, 1]` clip depth range.
    pub fn projection_matrix(&self, viewport_aspect_ratio: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective(perspective) => {
                let aspect_ratio = perspective.aspect_ratio.unwrap_or(viewport_aspect_ratio);
                match perspective.zfar {
                    Some(zfar) => Mat4::perspective_rh_gl(
                        perspective.yfov,
                        aspect_ratio,
                        perspective.znear,
                        zfar,
                    ),
                    None => {
                        let focal = 1.0 / (0.5 * perspective.yfov).tan();
                        Mat4::from_cols(
                            Vec4::new(focal / aspect_ratio, 0.0, 0.0, 0.0),
                            Vec4::new(0.0, focal, 0.0, 0.0),
                            Vec4::new(0.0, 0.0, -1.0, -1.0),
                            Vec4::new(0.0, 0.0, -2.0 * perspective.znear, 0.0),
                        )
                    }
                }
            }
            Projection::Orthographic(orthographic) => {
                let depth = orthographic.znear - orthographic.zfar;
                Mat4::from_cols(
                    Vec4::new(1.0 / orthographic.xmag, 0.0, 0.0, 0.0),
                    Vec4::new(0.0, 1.0 / orthographic.ymag, 0.0, 0.0),
                    Vec4::new(0.0, 0.0, 2.0 / depth, 0.0),
                    Vec4::new(
                        0.0,
                        0.0,
                        (orthographic.zfar + orthographic.znear) / depth,
                        1.0,
                    ),
                )
            }
        }
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};

    use super::{Camera, OrthographicCamera, PerspectiveCamera, Projection};

    #[test]
    fn finite_perspective() {
        let camera = Camera::new(Projection::Perspective(PerspectiveCamera {
            aspect_ratio: Some(1.5),
            yfov: 0.8,
            znear: 0.1,
            zfar: Some(100.0),
        }));
        assert_eq!(
            camera.projection_matrix(2.0),
            Mat4::perspective_rh_gl(0.8, 1.5, 0.1, 100.0)
        );
    }

    #[test]
    fn infinite_perspective_maps_near_plane_to_minus_one() {
        let camera = Camera::new(Projection::Perspective(PerspectiveCamera {
            aspect_ratio: None,
            yfov: 1.0,
            znear: 0.5,
            zfar: None,
        }));
        let projected = camera
            .projection_matrix(1.0)
            .project_point3(Vec3::new(0.0, 0.0, -0.5));
        assert!((projected.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthographic_maps_depth_range() {
        let camera = Camera::new(Projection::Orthographic(OrthographicCamera {
            xmag: 2.0,
            ymag: 1.0,
            znear: 1.0,
            zfar: 11.0,
        }));
        let matrix = camera.projection_matrix(1.0);
        let near = matrix.project_point3(Vec3::new(2.0, 1.0, -1.0));
        let far = matrix.project_point3(Vec3::new(0.0, 0.0, -11.0));
        assert!(near.abs_diff_eq(Vec3::new(1.0, 1.0, -1.0), 1e-6));
        assert!((far.z - 1.0).abs() < 1e-6);
    }
}
