//! Plane and frustum tests for visibility culling

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Create a plane from `(a, b, c, d)` coefficients, normalizing them
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let len = normal.norm();
        if len <= f32::EPSILON {
            return Self {
                normal: Vec3::zeros(),
                distance: 0.0,
            };
        }
        Self {
            normal: normal / len,
            distance: coefficients.w / len,
        }
    }

    /// Signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Whether a sphere lies entirely on the negative side
    pub fn culls_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.distance_to_point(center) + radius <= 0.0
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes (left, right, bottom, top, near, far), normals pointing inward
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a projection * view matrix.
    ///
    /// Gribb-Hartmann: each plane is the last row plus or minus one of the
    /// first three rows.
    pub fn from_matrix(proj_view: &Mat4) -> Self {
        let row = |i: usize| proj_view.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Whether a sphere is at least partially inside
    pub fn contains_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(center) >= -radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;

    fn frustum() -> Frustum {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        let view = Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0));
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn test_sphere_in_front_is_visible() {
        assert!(frustum().contains_sphere(&Vec3::new(0.0, 0.0, -10.0), 1.0));
    }

    #[test]
    fn test_sphere_behind_is_culled() {
        assert!(!frustum().contains_sphere(&Vec3::new(0.0, 0.0, 10.0), 1.0));
    }

    #[test]
    fn test_sphere_beyond_far_is_culled() {
        assert!(!frustum().contains_sphere(&Vec3::new(0.0, 0.0, -200.0), 1.0));
    }

    #[test]
    fn test_sphere_straddling_side_is_visible() {
        // 90 degree fov: the left plane passes through x = z
        assert!(frustum().contains_sphere(&Vec3::new(-10.5, 0.0, -10.0), 1.0));
        assert!(!frustum().contains_sphere(&Vec3::new(-20.0, 0.0, -10.0), 1.0));
    }

    #[test]
    fn test_plane_culls_sphere_on_negative_side() {
        let plane = Plane::new(Vec3::new(0.0, 1.0, 0.0), 0.0);
        assert!(plane.culls_sphere(&Vec3::new(0.0, -2.0, 0.0), 1.0));
        assert!(!plane.culls_sphere(&Vec3::new(0.0, -0.5, 0.0), 1.0));
        // touching counts as culled
        assert!(plane.culls_sphere(&Vec3::new(0.0, -1.0, 0.0), 1.0));
    }
}
