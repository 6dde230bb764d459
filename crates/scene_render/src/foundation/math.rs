//! Math utilities and types
//!
//! Provides the nalgebra aliases used by the clustering and batching code,
//! plus the transform and projection helpers they share.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from all three components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Math utility functions
pub mod utils {
    use super::{Mat4, Vec3, Vec4};

    /// Component-wise minimum of two vectors
    pub fn components_min(a: &Vec3, b: &Vec3) -> Vec3 {
        a.inf(b)
    }

    /// Component-wise maximum of two vectors
    pub fn components_max(a: &Vec3, b: &Vec3) -> Vec3 {
        a.sup(b)
    }

    /// The eight corners of the axis-aligned box spanned by `min` and `max`
    pub fn box_corners(min: &Vec3, max: &Vec3) -> [Vec3; 8] {
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Multiply a point (w = 1) by a matrix, keeping the homogeneous result
    pub fn transform_homogeneous(matrix: &Mat4, point: &Vec3) -> Vec4 {
        matrix * Vec4::new(point.x, point.y, point.z, 1.0)
    }

    /// Largest of the three components
    pub fn max_component(v: &Vec3) -> f32 {
        v.x.max(v.y).max(v.z)
    }

    /// Smallest of the three components
    pub fn min_component(v: &Vec3) -> f32 {
        v.x.min(v.y).min(v.z)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Right-handed perspective projection with clip-space depth in [-1, 1].
    ///
    /// View space looks down -Z, so `w = -z_view` after projection.
    fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Non-uniform scale matrix helper
    fn scaling(x: f32, y: f32, z: f32) -> Mat4;

    /// Translation matrix helper
    fn translation(x: f32, y: f32, z: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn scaling(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(x, y, z))
    }

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_to_matrix_applies_scale_then_translation() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::identity(), Vec3::new(2.0, 2.0, 2.0));
        let p = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 3.0);
    }

    #[test]
    fn test_box_corners_cover_extremes() {
        let corners = utils::box_corners(&Vec3::new(-1.0, -2.0, -3.0), &Vec3::new(1.0, 2.0, 3.0));
        let mut lo = Vec3::repeat(f32::MAX);
        let mut hi = Vec3::repeat(f32::MIN);
        for c in &corners {
            lo = utils::components_min(&lo, c);
            hi = utils::components_max(&hi, c);
        }
        assert_eq!(lo, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(hi, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_perspective_w_is_negated_view_depth() {
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.5, 100.0);
        let clip = utils::transform_homogeneous(&proj, &Vec3::new(0.0, 0.0, -7.0));
        assert_relative_eq!(clip.w, 7.0);
    }
}
