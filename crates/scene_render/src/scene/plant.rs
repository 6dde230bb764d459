//! Plant sway animation
//!
//! Foliage bends away from things that brush through it and springs back.
//! The bend is a small rotation vector (axis times angle) integrated with a
//! damped spring; a separate shake amount drives vertex jitter in the shader
//! through the instance tint alpha.

use crate::foundation::math::{Quat, Unit, Vec3};

const MAX_ANGLE: f32 = 0.5;
const SPRING: f32 = 20.0;
const DAMPING: f32 = 0.99;
const IMPULSE_SCALE: f32 = 0.01;
const ACTIVE_THRESHOLD: f32 = 1e-4;

/// Sway state of one plant instance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlantComponent {
    angle: Vec3,
    ang_vel: Vec3,
    shake: f32,
    active: bool,
}

impl PlantComponent {
    /// A plant at rest
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plant is still moving
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Current bend as axis times angle
    pub const fn angle(&self) -> Vec3 {
        self.angle
    }

    /// Advance the spring by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.angle += self.ang_vel * dt;
        let len = self.angle.norm();
        if len > MAX_ANGLE {
            self.angle *= MAX_ANGLE / len;
        }
        self.ang_vel -= self.angle * dt * SPRING;
        self.ang_vel *= DAMPING;
        self.shake *= DAMPING;

        let was_active = self.active;
        self.active = self.shake > ACTIVE_THRESHOLD || self.angle.norm_squared() > ACTIVE_THRESHOLD;
        if was_active && !self.active {
            self.shake = 0.0;
        }
    }

    /// Push the plant with something at `position` (relative to the plant
    /// origin) moving with `velocity`
    pub fn handle_collision(&mut self, position: &Vec3, velocity: &Vec3) {
        let Some(dir) = position.try_normalize(f32::EPSILON) else {
            return;
        };
        let impulse = dir.cross(velocity) * IMPULSE_SCALE;
        self.ang_vel += impulse;
        self.shake = (self.shake + impulse.norm()).min(1.0);
        self.active = true;
    }

    /// Bend rotation for a plant of the given size; larger plants bend less
    pub fn quaternion(&self, scale: f32) -> Quat {
        let len_sq = self.angle.norm_squared();
        if len_sq <= 1e-5 {
            return Quat::identity();
        }
        let len = len_sq.sqrt();
        let axis = Unit::new_unchecked(self.angle / len);
        Quat::from_axis_angle(&axis, len / (scale * 0.6).max(1.0))
    }

    /// Shake amount written into the tint alpha
    pub fn shake_value(&self, scale: f32) -> f32 {
        self.shake * scale * 0.03
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rest_is_identity() {
        let plant = PlantComponent::new();
        assert!(!plant.is_active());
        assert_eq!(plant.quaternion(1.0), Quat::identity());
        assert_relative_eq!(plant.shake_value(1.0), 0.0);
    }

    #[test]
    fn test_collision_activates_and_bends() {
        let mut plant = PlantComponent::new();
        plant.handle_collision(&Vec3::new(0.0, 1.0, 0.0), &Vec3::new(10.0, 0.0, 0.0));
        assert!(plant.is_active());
        // cross(+y, +x) = -z, scaled by 0.01 * 10
        assert_relative_eq!(plant.shake, 0.1, epsilon = 1e-6);

        plant.update(0.1);
        assert!(plant.angle().z < 0.0);
        assert_ne!(plant.quaternion(1.0), Quat::identity());
    }

    #[test]
    fn test_angle_is_clamped() {
        let mut plant = PlantComponent::new();
        for _ in 0..10 {
            plant.handle_collision(&Vec3::new(0.0, 1.0, 0.0), &Vec3::new(1000.0, 0.0, 0.0));
        }
        plant.update(1.0);
        assert!(plant.angle().norm() <= MAX_ANGLE + 1e-6);
        assert!(plant.shake <= 1.0);
    }

    #[test]
    fn test_settles_and_clears_shake() {
        let mut plant = PlantComponent::new();
        plant.handle_collision(&Vec3::new(0.0, 1.0, 0.0), &Vec3::new(1.0, 0.0, 0.0));
        for _ in 0..5000 {
            plant.update(1.0 / 60.0);
        }
        assert!(!plant.is_active());
        assert_relative_eq!(plant.shake, 0.0);
    }

    #[test]
    fn test_large_plants_bend_less() {
        let mut plant = PlantComponent::new();
        plant.handle_collision(&Vec3::new(0.0, 1.0, 0.0), &Vec3::new(10.0, 0.0, 0.0));
        plant.update(0.1);
        let small = plant.quaternion(1.0).angle();
        let large = plant.quaternion(10.0).angle();
        assert!(large < small);
    }
}
