//! Dynamic point lights
//!
//! Lights are owned by a [`DynamicLightCollection`] and addressed by stable
//! [`LightId`] handles. Clustering iterates them in storage order.

use crate::cluster::gpu_types::ShaderLight;
use crate::foundation::collections::{HandleMap, LightId};
use crate::foundation::math::{utils, Vec3};

/// Lights must stay below this count
pub const MAX_DYNAMIC_LIGHTS: usize = 65535;

/// A point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLight {
    /// World position
    pub position: Vec3,
    /// Linear color, overbright applied
    pub color: Vec3,
    /// Radius of influence
    pub radius: f32,
}

impl DynamicLight {
    /// Build the GPU record; the packed radius is halved to match the helper mesh
    pub fn to_shader(&self) -> ShaderLight {
        ShaderLight {
            position: [self.position.x, self.position.y, self.position.z],
            radius: self.radius / 2.0,
            color: [self.color.x, self.color.y, self.color.z],
            _pad: 0.0,
        }
    }
}

/// Radius of a light placed with a non-uniform scale: the smallest absolute component
pub fn radius_from_scale(scale: &Vec3) -> f32 {
    utils::min_component(&scale.abs())
}

/// Color of a light object with overbright applied
pub fn light_color(color: Vec3, overbright: f32) -> Vec3 {
    color * (1.0 + overbright * 0.3)
}

/// Owner of every dynamic light in the scene
#[derive(Debug, Default)]
pub struct DynamicLightCollection {
    lights: HandleMap<LightId, DynamicLight>,
}

impl DynamicLightCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a light and return its handle, or `None` when the collection is full
    pub fn add_light(&mut self, position: Vec3, color: Vec3, radius: f32) -> Option<LightId> {
        if self.lights.len() >= MAX_DYNAMIC_LIGHTS {
            log::warn!("Dynamic light limit of {MAX_DYNAMIC_LIGHTS} reached, light not added");
            return None;
        }
        Some(self.lights.insert(DynamicLight { position, color, radius }))
    }

    /// Look up a light
    pub fn get(&self, id: LightId) -> Option<&DynamicLight> {
        self.lights.get(id)
    }

    /// Look up a light for modification (e.g. after its owner moved)
    pub fn get_mut(&mut self, id: LightId) -> Option<&mut DynamicLight> {
        self.lights.get_mut(id)
    }

    /// Remove a light; returns whether it existed
    pub fn delete_light(&mut self, id: LightId) -> bool {
        self.lights.remove(id).is_some()
    }

    /// Number of lights
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether there are no lights
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Iterate all lights
    pub fn iter(&self) -> impl Iterator<Item = &DynamicLight> {
        self.lights.values()
    }

    /// Remove every light
    pub fn clear(&mut self) {
        self.lights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_delete() {
        let mut lights = DynamicLightCollection::new();
        let id = lights.add_light(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 1.0, 1.0), 4.0).expect("room");
        assert_eq!(lights.len(), 1);
        assert_eq!(lights.get(id).map(|l| l.radius), Some(4.0));

        if let Some(light) = lights.get_mut(id) {
            light.position = Vec3::zeros();
        }
        assert_eq!(lights.get(id).map(|l| l.position), Some(Vec3::zeros()));

        assert!(lights.delete_light(id));
        assert!(!lights.delete_light(id));
        assert!(lights.get(id).is_none());
    }

    #[test]
    fn test_radius_from_scale_uses_smallest_magnitude() {
        assert_eq!(radius_from_scale(&Vec3::new(3.0, -2.0, 5.0)), 2.0);
    }

    #[test]
    fn test_shader_record_halves_radius() {
        let light = DynamicLight {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: light_color(Vec3::new(1.0, 0.5, 0.0), 1.0),
            radius: 8.0,
        };
        let record = light.to_shader();
        assert_eq!(record.radius, 4.0);
        assert_eq!(record.position, [1.0, 2.0, 3.0]);
        assert!((record.color[0] - 1.3).abs() < 1e-6);
    }
}
