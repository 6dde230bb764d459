//! Camera state consumed by clustering and static mesh drawing
//!
//! Holds the matrices of the current frame plus the previous frame's
//! projection * view (for velocity output). The frustum is rebuilt whenever
//! the matrices change.

use super::culling::Frustum;
use crate::cluster::builder::ClusterView;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};

/// Render camera for one frame
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    view: Mat4,
    projection: Mat4,
    prev_proj_view: Mat4,
    near: f32,
    far: f32,
    viewport: Vec4,
    frustum: Frustum,
}

impl Camera {
    /// Create a perspective camera at `position` looking at `target`
    ///
    /// `viewport` is `(x, y, width, height)` in pixels.
    pub fn perspective(position: Vec3, target: Vec3, fov_y: f32, viewport: Vec4, near: f32, far: f32) -> Self {
        let aspect = if viewport.w > 0.0 { viewport.z / viewport.w } else { 1.0 };
        let projection = Mat4::perspective_rh(fov_y, aspect, near, far);
        let view = Mat4::look_at(position, target, Vec3::new(0.0, 1.0, 0.0));
        let proj_view = projection * view;
        Self {
            position,
            view,
            projection,
            prev_proj_view: proj_view,
            near,
            far,
            viewport,
            frustum: Frustum::from_matrix(&proj_view),
        }
    }

    /// Move the camera; the previous frame's matrix is remembered
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.prev_proj_view = self.proj_view();
        self.position = position;
        self.view = Mat4::look_at(position, target, Vec3::new(0.0, 1.0, 0.0));
        self.frustum = Frustum::from_matrix(&self.proj_view());
        log::trace!("Camera moved to {:?}", position);
    }

    /// Replace the view matrix directly
    pub fn set_view(&mut self, position: Vec3, view: Mat4) {
        self.prev_proj_view = self.proj_view();
        self.position = position;
        self.view = view;
        self.frustum = Frustum::from_matrix(&self.proj_view());
    }

    /// World position
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// View matrix
    pub const fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Projection matrix
    pub const fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Projection * view
    pub fn proj_view(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Projection * view of the previous frame
    pub const fn prev_proj_view(&self) -> &Mat4 {
        &self.prev_proj_view
    }

    /// Near plane distance
    pub const fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance
    pub const fn far(&self) -> f32 {
        self.far
    }

    /// Viewport `(x, y, width, height)`
    pub const fn viewport(&self) -> Vec4 {
        self.viewport
    }

    /// Whether a bounding sphere is at least partially visible
    pub fn sphere_in_frustum(&self, center: &Vec3, radius: f32) -> bool {
        self.frustum.contains_sphere(center, radius)
    }

    /// The subset of camera state the cluster builder needs
    pub fn cluster_view(&self) -> ClusterView {
        ClusterView {
            projection: self.projection,
            view: self.view,
            z_near: self.near,
            z_far: self.far,
            viewport: self.viewport,
        }
    }
}
