//! Static mesh models shared by env objects
//!
//! A model is loaded once and referenced by every instance through a
//! [`ModelId`]. Its GPU buffers are created by the instance batcher the
//! first time a batch of it is drawn.

use crate::foundation::collections::{HandleMap, ModelId};
use crate::foundation::math::Vec3;
use crate::render::backend::{BackendResult, MeshHandle, RenderBackend};

/// Texel density assumed when a model does not report one
pub const DEFAULT_TEXEL_DENSITY: f32 = 1.0;

/// Geometry summary of a loaded mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Asset path, also part of the batch key
    pub path: String,
    /// Index count of the triangle list
    pub index_count: u32,
    /// Texels per world unit of the base color map
    pub texel_density: f32,
    /// Number of collision faces when used as a collision mesh
    pub collision_faces: usize,
    /// Size of the model-space bounding box
    pub box_dims: Vec3,
    /// Model-space collision triangles, when the geometry is kept on the CPU
    pub collision_triangles: Vec<[Vec3; 3]>,
    mesh: Option<MeshHandle>,
}

impl Model {
    /// Describe a loaded model
    pub fn new(path: impl Into<String>, index_count: u32) -> Self {
        Self {
            path: path.into(),
            index_count,
            texel_density: DEFAULT_TEXEL_DENSITY,
            collision_faces: 0,
            box_dims: Vec3::zeros(),
            collision_triangles: Vec::new(),
            mesh: None,
        }
    }

    /// Set the model-space bounding box size
    pub fn with_box_dims(mut self, box_dims: Vec3) -> Self {
        self.box_dims = box_dims;
        self
    }

    /// Set the collision face count
    pub fn with_collision_faces(mut self, faces: usize) -> Self {
        self.collision_faces = faces;
        self
    }

    /// Keep collision triangles for face normal overrides; sets the face count
    pub fn with_collision_triangles(mut self, triangles: Vec<[Vec3; 3]>) -> Self {
        self.collision_faces = triangles.len();
        self.collision_triangles = triangles;
        self
    }

    /// Set the texel density
    pub fn with_texel_density(mut self, texel_density: f32) -> Self {
        self.texel_density = texel_density;
        self
    }

    /// GPU buffers, if already created
    pub const fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    /// Return the GPU buffers, creating them on first use
    pub fn ensure_mesh(&mut self, backend: &mut dyn RenderBackend) -> BackendResult<MeshHandle> {
        if let Some(mesh) = self.mesh {
            return Ok(mesh);
        }
        let mesh = backend.create_mesh(&self.path, self.index_count)?;
        log::debug!("Created GPU buffers for {} ({} indices)", self.path, self.index_count);
        self.mesh = Some(mesh);
        Ok(mesh)
    }

    /// Drop the GPU handle so the buffers are recreated next draw
    pub fn invalidate_mesh(&mut self) {
        self.mesh = None;
    }
}

/// Owner of every loaded model
#[derive(Debug, Default)]
pub struct ModelLibrary {
    models: HandleMap<ModelId, Model>,
}

impl ModelLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model, returning the existing id when the path is already loaded
    pub fn add(&mut self, model: Model) -> ModelId {
        if let Some(id) = self.find(&model.path) {
            return id;
        }
        self.models.insert(model)
    }

    /// Look up a model by path
    pub fn find(&self, path: &str) -> Option<ModelId> {
        self.models.iter().find(|(_, m)| m.path == path).map(|(id, _)| id)
    }

    /// Look up a model
    pub fn get(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    /// Look up a model for modification
    pub fn get_mut(&mut self, id: ModelId) -> Option<&mut Model> {
        self.models.get_mut(id)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{BackendCall, RecordingBackend};

    #[test]
    fn test_add_deduplicates_by_path() {
        let mut library = ModelLibrary::new();
        let a = library.add(Model::new("Data/Models/rock.obj", 36));
        let b = library.add(Model::new("Data/Models/rock.obj", 36));
        let c = library.add(Model::new("Data/Models/tree.obj", 120));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_mesh_created_once() {
        let mut backend = RecordingBackend::new();
        let mut model = Model::new("Data/Models/rock.obj", 36);
        assert!(model.mesh().is_none());

        let first = model.ensure_mesh(&mut backend).expect("mesh");
        let second = model.ensure_mesh(&mut backend).expect("mesh");
        assert_eq!(first, second);
        let created = backend.calls().iter().filter(|c| matches!(c, BackendCall::CreateMesh(_))).count();
        assert_eq!(created, 1);
    }
}
