//! Static mesh instances
//!
//! An [`EnvObject`] places a [`Model`](super::model::Model) in the world
//! with a material shared between every instance loaded from the same
//! object file. Instances sharing shader, model and winding are drawn
//! together by the instance batcher.

use std::sync::Arc;

use super::model::ModelLibrary;
use super::plant::PlantComponent;
use super::SceneError;
use crate::foundation::collections::ModelId;
use crate::foundation::math::{utils, Point3, Quat, Transform, Vec3, Vec4};
use crate::render::backend::{BackendResult, BufferTextureFormat, RenderBackend, TextureHandle};

/// Most detail map layers a material can scale
pub const MAX_DETAIL_MAPS: usize = 4;

/// Object-file settings shared by every instance of one object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvMaterial {
    /// Object file path
    pub path: String,
    /// Base shader name, before pass flags are appended
    pub shader_name: String,
    /// Drawn in the transparent pass
    pub transparent: bool,
    /// Disable back-face culling
    pub double_sided: bool,
    /// No physics shape at all
    pub no_collision: bool,
    /// Collides only with the plant world; no collision mesh needed
    pub bush_collision: bool,
    /// Per-layer detail map scale factors
    pub detail_map_scale: Vec<f32>,
    /// Color map, bound for every pass
    pub color_map: Option<TextureHandle>,
    /// Normal map, bound when the pass samples textures
    pub normal_map: Option<TextureHandle>,
}

impl EnvMaterial {
    /// Create a material with the given object path and shader
    pub fn new(path: impl Into<String>, shader_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            shader_name: shader_name.into(),
            ..Default::default()
        }
    }
}

/// World-space collision face normals shown by the collision pass.
///
/// Each face may carry a custom normal (`xyz`) blended in by weight (`w`).
#[derive(Debug, Clone, Default)]
struct NormalOverride {
    custom: Vec<Vec4>,
    normals: Vec<[f32; 3]>,
    buffer: Option<TextureHandle>,
    dirty: bool,
}

/// A static mesh instance
#[derive(Debug, Clone)]
pub struct EnvObject {
    /// Disabled objects are skipped by culling
    pub enabled: bool,
    /// Parented to another object; suppresses plant shake
    pub attached: bool,
    /// Sway animation for foliage
    pub plant: Option<PlantComponent>,
    material: Arc<EnvMaterial>,
    model: ModelId,
    collision_model: Option<ModelId>,
    transform: Transform,
    tint: Vec3,
    overbright: f32,
    base_tint: Vec3,
    display_tint: Vec3,
    winding_flip: bool,
    model_path: String,
    sphere_center: Vec3,
    sphere_radius: f32,
    normal_override: NormalOverride,
}

impl EnvObject {
    /// Create an instance; call [`EnvObject::initialize`] before adding it to a scene
    pub fn new(material: Arc<EnvMaterial>, model: ModelId, transform: Transform) -> Self {
        let winding_flip = needs_winding_flip(&transform.scale);
        let one = Vec3::new(1.0, 1.0, 1.0);
        Self {
            enabled: true,
            attached: false,
            plant: None,
            material,
            model,
            collision_model: None,
            sphere_center: transform.position,
            transform,
            tint: one,
            overbright: 0.0,
            base_tint: one,
            display_tint: one,
            winding_flip,
            model_path: String::new(),
            sphere_radius: 0.0,
            normal_override: NormalOverride {
                dirty: true,
                ..NormalOverride::default()
            },
        }
    }

    /// Use a separate collision hull instead of the render model
    #[must_use]
    pub fn with_collision_model(mut self, collision_model: ModelId) -> Self {
        self.collision_model = Some(collision_model);
        self
    }

    /// Validate assets and compute derived state.
    ///
    /// Fails when the object needs a collision mesh and its collision model
    /// has no faces; such an object must not be added to the scene.
    pub fn initialize(&mut self, models: &ModelLibrary) -> Result<(), SceneError> {
        self.model_path = self.validate(self.model, self.collision_model, models)?;
        self.update_bounding_sphere(models);
        self.normal_override.dirty = true;
        Ok(())
    }

    /// Shared object-file settings
    pub const fn material(&self) -> &Arc<EnvMaterial> {
        &self.material
    }

    /// Swap the object-file settings; shader and transparency follow the new material
    pub fn set_material(&mut self, material: Arc<EnvMaterial>) {
        self.material = material;
        self.normal_override.dirty = true;
    }

    /// Render model
    pub const fn model(&self) -> ModelId {
        self.model
    }

    /// Swap the render model, keeping the old one if the new one fails validation
    pub fn set_model(&mut self, model: ModelId, models: &ModelLibrary) -> Result<(), SceneError> {
        self.model_path = self.validate(model, self.collision_model, models)?;
        self.model = model;
        self.update_bounding_sphere(models);
        self.normal_override.dirty = true;
        Ok(())
    }

    /// Separate collision hull, if any
    pub const fn collision_model(&self) -> Option<ModelId> {
        self.collision_model
    }

    /// Swap the collision hull, keeping the old one if the new one fails validation
    pub fn set_collision_model(
        &mut self,
        collision_model: Option<ModelId>,
        models: &ModelLibrary,
    ) -> Result<(), SceneError> {
        self.validate(self.model, collision_model, models)?;
        self.collision_model = collision_model;
        self.normal_override.dirty = true;
        Ok(())
    }

    /// Model drawn by the collision pass: the hull, else the render model.
    ///
    /// Bush collision objects have none.
    pub fn collision_model_id(&self) -> Option<ModelId> {
        (!self.material.bush_collision).then(|| self.collision_model.unwrap_or(self.model))
    }

    /// World transform
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the world transform; winding and bounds follow the new scale
    pub fn set_transform(&mut self, transform: Transform, models: &ModelLibrary) {
        self.winding_flip = needs_winding_flip(&transform.scale);
        self.transform = transform;
        self.update_bounding_sphere(models);
        self.normal_override.dirty = true;
    }

    /// World translation
    pub const fn translation(&self) -> Vec3 {
        self.transform.position
    }

    /// World rotation
    pub const fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// World scale
    pub const fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Set color tint and overbright
    pub fn set_tint(&mut self, tint: Vec3, overbright: f32) {
        self.tint = tint;
        self.overbright = overbright;
        self.update_display_tint();
    }

    /// Set the base tint multiplied on top of the color tint
    pub fn set_base_tint(&mut self, base_tint: Vec3) {
        self.base_tint = base_tint;
        self.update_display_tint();
    }

    /// Tint as drawn: `tint * (1 + overbright * 0.3) * base_tint`
    pub const fn display_tint(&self) -> Vec3 {
        self.display_tint
    }

    /// Drawn in the transparent pass
    pub fn is_transparent(&self) -> bool {
        self.material.transparent
    }

    /// Triangle winding is inverted by a negative scale
    pub const fn winding_flip(&self) -> bool {
        self.winding_flip
    }

    /// Path of the render model, part of the batch key
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Base shader name
    pub fn shader_name(&self) -> &str {
        &self.material.shader_name
    }

    /// World-space bounding sphere center
    pub const fn sphere_center(&self) -> Vec3 {
        self.sphere_center
    }

    /// World-space bounding sphere radius
    pub const fn sphere_radius(&self) -> f32 {
        self.sphere_radius
    }

    /// Whether two objects can share one instanced draw
    pub fn same_batch(&self, other: &Self) -> bool {
        self.material.shader_name == other.material.shader_name
            && self.model_path == other.model_path
            && self.winding_flip == other.winding_flip
    }

    /// Advance the plant sway animation
    pub fn update(&mut self, dt: f32) {
        if let Some(plant) = self.plant.as_mut().filter(|p| p.is_active()) {
            plant.update(dt);
        }
    }

    /// Rotation fed to the shader, including plant bend while it sways
    pub fn instance_rotation(&self) -> Quat {
        match &self.plant {
            Some(plant) if plant.is_active() => plant.quaternion(self.sphere_radius) * self.transform.rotation,
            _ => self.transform.rotation,
        }
    }

    /// Tint fed to the shader; alpha carries plant shake, or -1 when attached
    pub fn instance_tint(&self) -> Vec4 {
        let shake = if self.attached {
            -1.0
        } else {
            self.plant.as_ref().map_or(0.0, |p| p.shake_value(self.sphere_radius))
        };
        self.display_tint.push(shake)
    }

    /// Detail map scale fed to the shader for a model of the given texel density
    pub fn instance_detail_scale(&self, texel_density: f32) -> Vec4 {
        let texel_scale = utils::max_component(&self.transform.scale) / texel_density * 0.15;
        let mut scale = Vec4::repeat(1.0);
        for (k, layer) in self.material.detail_map_scale.iter().take(MAX_DETAIL_MAPS).enumerate() {
            scale[k] = texel_scale * layer;
        }
        scale
    }

    /// Blend a custom normal into one collision face; `weight` 1 replaces the computed normal
    pub fn set_custom_normal(&mut self, face: usize, normal: Vec3, weight: f32) {
        let custom = &mut self.normal_override.custom;
        if custom.len() <= face {
            custom.resize(face + 1, Vec4::zeros());
        }
        custom[face] = normal.push(weight);
        self.normal_override.dirty = true;
    }

    /// Collision face normals uploaded by [`EnvObject::refresh_normal_override`]
    pub fn collision_normals(&self) -> &[[f32; 3]] {
        &self.normal_override.normals
    }

    /// Buffer texture of collision face normals, bound per object by the collision pass
    pub const fn normal_override_buffer(&self) -> Option<TextureHandle> {
        self.normal_override.buffer
    }

    /// Recompute and upload the collision face normals if the object changed.
    ///
    /// Nothing is uploaded for objects without a collision model or whose
    /// collision model keeps no triangles.
    pub fn refresh_normal_override(
        &mut self,
        backend: &mut dyn RenderBackend,
        models: &ModelLibrary,
    ) -> BackendResult<()> {
        if !self.normal_override.dirty {
            return Ok(());
        }
        let Some(model) = self.collision_model_id().and_then(|id| models.get(id)) else {
            return Ok(());
        };
        if model.collision_triangles.is_empty() {
            self.normal_override.dirty = false;
            return Ok(());
        }

        let matrix = self.transform.to_matrix();
        let overrides = &mut self.normal_override;
        overrides.custom.resize(model.collision_triangles.len(), Vec4::zeros());
        overrides.normals.clear();
        for (triangle, custom) in model.collision_triangles.iter().zip(&overrides.custom) {
            let [a, b, c] = triangle.map(|v| matrix.transform_point(&Point3::from(v)).coords);
            let face = (b - a).cross(&(c - a)).normalize();
            let normal = face.lerp(&custom.xyz(), custom.w);
            overrides.normals.push([normal.x, normal.y, normal.z]);
        }

        let buffer = match overrides.buffer {
            Some(buffer) => buffer,
            None => {
                let buffer = backend.create_buffer_texture(BufferTextureFormat::Rgb32Float)?;
                overrides.buffer = Some(buffer);
                buffer
            }
        };
        backend.update_buffer_texture(buffer, bytemuck::cast_slice(&overrides.normals))?;
        overrides.dirty = false;
        log::trace!("Uploaded {} collision normals for {}", overrides.normals.len(), self.material.path);
        Ok(())
    }

    /// Check `model` and `collision_model` against the library, returning the render model path
    fn validate(
        &self,
        model: ModelId,
        collision_model: Option<ModelId>,
        models: &ModelLibrary,
    ) -> Result<String, SceneError> {
        let path = models.get(model).ok_or(SceneError::UnknownModel)?.path.clone();

        if !self.material.bush_collision && !self.attached {
            let faces = models.get(collision_model.unwrap_or(model)).map_or(0, |m| m.collision_faces);
            if faces == 0 {
                log::error!(
                    "{} has no valid collision mesh, make sure the model/collision mesh exists; the object will not be spawned",
                    self.material.path
                );
                return Err(SceneError::MissingCollisionMesh {
                    path: self.material.path.clone(),
                });
            }
        }
        Ok(path)
    }

    fn update_display_tint(&mut self) {
        self.display_tint = (self.tint * (1.0 + self.overbright * 0.3)).component_mul(&self.base_tint);
    }

    fn update_bounding_sphere(&mut self, models: &ModelLibrary) {
        let dims = models.get(self.model).map_or_else(Vec3::zeros, |m| m.box_dims);
        let half = (dims * 0.5).component_mul(&self.transform.scale);
        self.sphere_radius = (self.transform.rotation * half).norm();
        self.sphere_center = self.transform.position;
    }
}

/// An odd number of negative scale axes mirrors the mesh
fn needs_winding_flip(scale: &Vec3) -> bool {
    scale.iter().filter(|s| **s < 0.0).count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{BackendCall, RecordingBackend};
    use crate::scene::model::Model;
    use approx::assert_relative_eq;

    fn library() -> (ModelLibrary, ModelId, ModelId) {
        let mut models = ModelLibrary::new();
        let solid = models.add(
            Model::new("Data/Models/rock.obj", 36)
                .with_collision_faces(12)
                .with_box_dims(Vec3::new(2.0, 2.0, 2.0)),
        );
        let hollow = models.add(Model::new("Data/Models/broken.obj", 36));
        (models, solid, hollow)
    }

    #[test]
    fn test_initialize_requires_collision_mesh() {
        let (models, solid, hollow) = library();
        let material = Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject"));

        let mut ok = EnvObject::new(material.clone(), solid, Transform::identity());
        assert!(ok.initialize(&models).is_ok());
        assert_eq!(ok.model_path(), "Data/Models/rock.obj");

        let mut broken = EnvObject::new(material, hollow, Transform::identity());
        assert!(matches!(broken.initialize(&models), Err(SceneError::MissingCollisionMesh { .. })));
    }

    #[test]
    fn test_bush_collision_needs_no_mesh() {
        let (models, _, hollow) = library();
        let mut material = EnvMaterial::new("Data/Objects/bush.xml", "plant");
        material.bush_collision = true;
        material.transparent = true;
        let mut bush = EnvObject::new(Arc::new(material), hollow, Transform::identity());
        assert!(bush.initialize(&models).is_ok());
        assert!(bush.is_transparent());
    }

    #[test]
    fn test_bounding_sphere_follows_scale() {
        let (models, solid, _) = library();
        let material = Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject"));
        let transform = Transform::new(Vec3::new(5.0, 0.0, 0.0), Quat::identity(), Vec3::new(2.0, 2.0, 2.0));
        let mut obj = EnvObject::new(material, solid, transform);
        obj.initialize(&models).expect("valid");
        assert_relative_eq!(obj.sphere_radius(), 12.0f32.sqrt(), epsilon = 1e-5);
        assert_eq!(obj.sphere_center(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_display_tint_combines_overbright_and_base() {
        let (models, solid, _) = library();
        let mut obj = EnvObject::new(Arc::new(EnvMaterial::default()), solid, Transform::identity());
        obj.initialize(&models).ok();
        obj.set_tint(Vec3::new(1.0, 0.5, 0.0), 1.0);
        obj.set_base_tint(Vec3::new(0.5, 1.0, 1.0));
        assert_relative_eq!(obj.display_tint(), Vec3::new(0.65, 0.65, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_negative_scale_flips_winding() {
        assert!(needs_winding_flip(&Vec3::new(-1.0, 1.0, 1.0)));
        assert!(!needs_winding_flip(&Vec3::new(-1.0, -1.0, 1.0)));
        assert!(!needs_winding_flip(&Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_instance_tint_alpha() {
        let (_, solid, _) = library();
        let mut obj = EnvObject::new(Arc::new(EnvMaterial::default()), solid, Transform::identity());
        assert_relative_eq!(obj.instance_tint().w, 0.0);

        obj.plant = Some(PlantComponent::new());
        assert_relative_eq!(obj.instance_tint().w, 0.0);

        obj.attached = true;
        assert_relative_eq!(obj.instance_tint().w, -1.0);
    }

    #[test]
    fn test_detail_scale_defaults_to_one() {
        let (_, solid, _) = library();
        let mut material = EnvMaterial::default();
        material.detail_map_scale = vec![2.0, 4.0];
        let transform = Transform::new(Vec3::zeros(), Quat::identity(), Vec3::new(1.0, 3.0, 2.0));
        let obj = EnvObject::new(Arc::new(material), solid, transform);

        let scale = obj.instance_detail_scale(0.5);
        // 3 / 0.5 * 0.15 = 0.9
        assert_relative_eq!(scale.x, 1.8, epsilon = 1e-5);
        assert_relative_eq!(scale.y, 3.6, epsilon = 1e-5);
        assert_relative_eq!(scale.z, 1.0);
        assert_relative_eq!(scale.w, 1.0);
    }

    #[test]
    fn test_set_model_updates_batch_key() {
        let (mut models, solid, hollow) = library();
        let tree = models.add(Model::new("Data/Models/tree.obj", 120).with_collision_faces(40));
        let mut obj = EnvObject::new(Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject")), solid, Transform::identity());
        obj.initialize(&models).expect("valid");

        obj.set_model(tree, &models).expect("tree has a collision mesh");
        assert_eq!(obj.model(), tree);
        assert_eq!(obj.model_path(), "Data/Models/tree.obj");

        assert!(matches!(obj.set_model(hollow, &models), Err(SceneError::MissingCollisionMesh { .. })));
        assert_eq!(obj.model(), tree);
        assert_eq!(obj.model_path(), "Data/Models/tree.obj");
    }

    #[test]
    fn test_transparency_follows_material() {
        let (models, solid, _) = library();
        let mut obj = EnvObject::new(Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject")), solid, Transform::identity());
        obj.initialize(&models).expect("valid");
        assert!(!obj.is_transparent());

        let mut glass = EnvMaterial::new("Data/Objects/glass.xml", "envobject");
        glass.transparent = true;
        obj.set_material(Arc::new(glass));
        assert!(obj.is_transparent());
    }

    #[test]
    fn test_collision_model_id() {
        let (mut models, solid, _) = library();
        let hull = models.add(Model::new("Data/Models/rock_col.obj", 0).with_collision_faces(6));
        let material = Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject"));

        let plain = EnvObject::new(material.clone(), solid, Transform::identity());
        assert_eq!(plain.collision_model_id(), Some(solid));

        let hulled = EnvObject::new(material, solid, Transform::identity()).with_collision_model(hull);
        assert_eq!(hulled.collision_model_id(), Some(hull));

        let mut bush = EnvMaterial::new("Data/Objects/bush.xml", "plant");
        bush.bush_collision = true;
        let bush = EnvObject::new(Arc::new(bush), solid, Transform::identity());
        assert_eq!(bush.collision_model_id(), None);
    }

    #[test]
    fn test_normal_override_follows_transform() {
        let mut models = ModelLibrary::new();
        let quad = models.add(Model::new("Data/Models/quad.obj", 3).with_collision_triangles(vec![[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]]));
        let mut obj = EnvObject::new(Arc::new(EnvMaterial::new("Data/Objects/quad.xml", "envobject")), quad, Transform::identity());
        obj.initialize(&models).expect("valid");
        let mut backend = RecordingBackend::new();

        obj.refresh_normal_override(&mut backend, &models).expect("uploaded");
        assert_eq!(obj.collision_normals(), &[[0.0, 0.0, 1.0]]);
        let buffer = obj.normal_override_buffer().expect("buffer created");

        // clean objects upload nothing
        obj.refresh_normal_override(&mut backend, &models).expect("no-op");

        let tilted = Transform::new(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 1.0, 1.0),
        );
        obj.set_transform(tilted, &models);
        obj.refresh_normal_override(&mut backend, &models).expect("uploaded");
        let normal = obj.collision_normals()[0];
        assert_relative_eq!(normal[1], -1.0, epsilon = 1e-5);
        assert_relative_eq!(normal[2], 0.0, epsilon = 1e-5);

        obj.set_custom_normal(0, Vec3::new(1.0, 0.0, 0.0), 1.0);
        obj.refresh_normal_override(&mut backend, &models).expect("uploaded");
        assert_relative_eq!(obj.collision_normals()[0][0], 1.0, epsilon = 1e-5);

        assert_eq!(obj.normal_override_buffer(), Some(buffer));
        let created = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateBufferTexture(BufferTextureFormat::Rgb32Float)))
            .count();
        let updates = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::UpdateBufferTexture { texture, len: 12 } if *texture == buffer))
            .count();
        assert_eq!((created, updates), (1, 3));
    }
}
