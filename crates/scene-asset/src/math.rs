//! Geometry helpers used to validate and index the scene graph.
//!
//! Everything here is a pure function over `glam` types. The workspace builds
//! `glam` with `libm`, so trigonometry does not depend on the platform's C
//! library and derived matrices are bit-identical across targets.

use glam::{Mat4, Quat, Vec3, Vec4};

pub const AXIS_X: Vec3 = Vec3::X;
pub const AXIS_Y: Vec3 = Vec3::Y;
pub const AXIS_Z: Vec3 = Vec3::Z;

/// Axis-aligned box. An empty box has `min > max` on every axis so that it is
/// the identity of [`BoundingBox::union`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |bounds, point| bounds.including(point))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn including(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of the eight transformed corners.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(
            self.corners()
                .into_iter()
                .map(|corner| matrix.transform_point3(corner)),
        )
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere through the corners of `bounds`, centered on the box.
    pub fn from_box(bounds: &BoundingBox) -> Self {
        if bounds.is_empty() {
            return Self {
                center: Vec3::ZERO,
                radius: 0.0,
            };
        }
        Self {
            center: bounds.center(),
            radius: bounds.extent().length() * 0.5,
        }
    }
}

pub fn matrix_from_translation(translation: Vec3) -> Mat4 {
    Mat4::from_translation(translation)
}

pub fn matrix_from_uniform_scale(scale: f32) -> Mat4 {
    Mat4::from_scale(Vec3::splat(scale))
}

pub fn matrix_from_scale(scale: Vec3) -> Mat4 {
    Mat4::from_scale(scale)
}

/// Rotation of `angle` radians around `axis`. The axis does not need to be
/// normalized; a zero axis yields the identity.
pub fn matrix_from_axis_angle(axis: Vec3, angle: f32) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) => Mat4::from_axis_angle(axis, angle),
        None => Mat4::IDENTITY,
    }
}

pub fn matrix_from_quaternion(rotation: Quat) -> Mat4 {
    Mat4::from_quat(rotation)
}

/// Quaternion for intrinsic rotations `pitch` (X), `yaw` (Y) and `roll` (Z),
/// applied roll first, then pitch, then yaw.
pub fn quaternion_from_euler(pitch: f32, yaw: f32, roll: f32) -> Quat {
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();
    let (sr, cr) = (roll * 0.5).sin_cos();
    Quat::from_xyzw(
        cy * sp * cr + sy * cp * sr,
        sy * cp * cr - cy * sp * sr,
        cy * cp * sr - sy * sp * cr,
        cy * cp * cr + sy * sp * sr,
    )
}

pub fn quaternion_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle),
        None => Quat::IDENTITY,
    }
}

/// Decompose a unit quaternion. Identity rotations report the X axis and a
/// zero angle.
pub fn axis_angle_from_quaternion(rotation: Quat) -> (Vec3, f32) {
    let rotation = if rotation.w < 0.0 { -rotation } else { rotation };
    let w = rotation.w.clamp(-1.0, 1.0);
    let angle = 2.0 * w.acos();
    let s = (1.0 - w * w).sqrt();
    if s < 1e-6 {
        (AXIS_X, 0.0)
    } else {
        (Vec3::new(rotation.x, rotation.y, rotation.z) / s, angle)
    }
}

/// Hamilton product `q * r`: applying the result rotates by `r`, then `q`.
pub fn quaternion_multiply(q: Quat, r: Quat) -> Quat {
    Quat::from_xyzw(
        q.w * r.x + q.x * r.w + q.y * r.z - q.z * r.y,
        q.w * r.y - q.x * r.z + q.y * r.w + q.z * r.x,
        q.w * r.z + q.x * r.y - q.y * r.x + q.z * r.w,
        q.w * r.w - q.x * r.x - q.y * r.y - q.z * r.z,
    )
}

/// Spherical interpolation along the shortest arc.
pub fn quaternion_slerp(from: Quat, to: Quat, t: f32) -> Quat {
    let a = Vec4::from(from);
    let mut b = Vec4::from(to);
    let mut cos_theta = a.dot(b);
    if cos_theta < 0.0 {
        b = -b;
        cos_theta = -cos_theta;
    }

    // Nearly parallel, fall back to normalized lerp
    if cos_theta > 0.9995 {
        let result = a + (b - a) * t;
        return Quat::from_vec4(result.normalize());
    }

    let theta = cos_theta.acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    Quat::from_vec4(a * wa + b * wb)
}

#[cfg(test)]
mod test {
    use std::f32::consts::{FRAC_PI_2, PI};

    use glam::{Mat4, Quat, Vec3};

    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{:?} != {:?}", a, b);
    }

    #[test]
    fn empty_box_is_union_identity() {
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::ONE);
        assert!(BoundingBox::EMPTY.is_empty());
        assert_eq!(BoundingBox::EMPTY.union(bounds), bounds);
        assert_eq!(bounds.union(BoundingBox::EMPTY), bounds);
        assert!(BoundingBox::EMPTY.transform(&Mat4::IDENTITY).is_empty());
    }

    #[test]
    fn box_from_points_and_union() {
        let a = BoundingBox::from_points([Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0)]);
        assert_eq!(a.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(a.max, Vec3::new(1.0, 2.0, 5.0));

        let b = BoundingBox::new(Vec3::new(0.0, -4.0, 0.0), Vec3::new(0.5, 0.5, 0.5));
        let union = a.union(b);
        assert_eq!(union.min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(union.max, Vec3::new(1.0, 2.0, 5.0));
        assert!(union.contains(Vec3::ZERO));
        assert!(!union.contains(Vec3::splat(10.0)));
    }

    #[test]
    fn box_transform_scale_then_translate() {
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::ONE);
        let matrix = matrix_from_translation(Vec3::X) * matrix_from_uniform_scale(2.0);
        let transformed = bounds.transform(&matrix);
        assert_vec3_near(transformed.min, Vec3::new(-1.0, -2.0, -2.0));
        assert_vec3_near(transformed.max, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn box_transform_rotation_grows_to_fit() {
        let bounds = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let transformed = bounds.transform(&matrix_from_axis_angle(AXIS_Z, FRAC_PI_2));
        assert_vec3_near(transformed.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_vec3_near(transformed.max, Vec3::new(0.0, 2.0, 1.0));
    }

    #[test]
    fn sphere_from_box() {
        let bounds = BoundingBox::new(Vec3::new(-1.0, -2.0, -2.0), Vec3::new(3.0, 2.0, 2.0));
        let sphere = BoundingSphere::from_box(&bounds);
        assert_vec3_near(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert!((sphere.radius - 48.0f32.sqrt() * 0.5).abs() < 1e-5);
        assert_eq!(BoundingSphere::from_box(&BoundingBox::EMPTY).radius, 0.0);
    }

    #[test]
    fn euler_matches_axis_rotations() {
        let pitch = quaternion_from_euler(0.3, 0.0, 0.0);
        assert!(pitch.abs_diff_eq(Quat::from_rotation_x(0.3), 1e-6));
        let yaw = quaternion_from_euler(0.0, 0.7, 0.0);
        assert!(yaw.abs_diff_eq(Quat::from_rotation_y(0.7), 1e-6));
        let roll = quaternion_from_euler(0.0, 0.0, -1.1);
        assert!(roll.abs_diff_eq(Quat::from_rotation_z(-1.1), 1e-6));

        let combined = quaternion_from_euler(0.3, 0.7, -1.1);
        let expected = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.3) * Quat::from_rotation_z(-1.1);
        assert!(combined.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn axis_angle_round_trip() {
        let axis = Vec3::new(1.0, 2.0, -0.5).normalize();
        let rotation = quaternion_from_axis_angle(axis, 1.25);
        let (out_axis, out_angle) = axis_angle_from_quaternion(rotation);
        assert_vec3_near(out_axis, axis);
        assert!((out_angle - 1.25).abs() < 1e-5);

        let (identity_axis, identity_angle) = axis_angle_from_quaternion(Quat::IDENTITY);
        assert_eq!(identity_axis, AXIS_X);
        assert_eq!(identity_angle, 0.0);
        assert_eq!(quaternion_from_axis_angle(Vec3::ZERO, 1.0), Quat::IDENTITY);
    }

    #[test]
    fn multiply_matches_glam() {
        let q = Quat::from_rotation_x(0.4);
        let r = Quat::from_rotation_y(-0.9);
        assert!(quaternion_multiply(q, r).abs_diff_eq(q * r, 1e-6));
        let point = Vec3::new(0.2, -1.0, 3.0);
        assert_vec3_near(
            quaternion_multiply(q, r) * point,
            q * (r * point),
        );
    }

    #[test]
    fn slerp_endpoints_and_midpoint() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_z(PI * 0.5);
        assert!(quaternion_slerp(from, to, 0.0).abs_diff_eq(from, 1e-6));
        assert!(quaternion_slerp(from, to, 1.0).abs_diff_eq(to, 1e-6));
        let mid = quaternion_slerp(from, to, 0.5);
        assert!(mid.abs_diff_eq(Quat::from_rotation_z(PI * 0.25), 1e-6));

        // Opposite hemisphere takes the short way round
        let mid = quaternion_slerp(from, -to, 0.5);
        assert!(mid.abs_diff_eq(Quat::from_rotation_z(PI * 0.25), 1e-6));
    }

    #[test]
    fn rotation_matrix_from_quaternion() {
        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        let matrix = matrix_from_quaternion(rotation);
        assert_vec3_near(matrix.transform_point3(Vec3::X), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn deterministic_matrices() {
        let build = || {
            matrix_from_translation(Vec3::new(1.5, -2.0, 0.25))
                * matrix_from_quaternion(quaternion_from_euler(0.1, 0.2, 0.3))
                * matrix_from_scale(Vec3::new(2.0, 3.0, 4.0))
        };
        let a = build().to_cols_array();
        let b = build().to_cols_array();
        assert_eq!(
            a.map(f32::to_bits),
            b.map(f32::to_bits),
        );
    }
}
