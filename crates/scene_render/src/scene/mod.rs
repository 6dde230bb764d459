//! Scene data and per-frame orchestration
//!
//! The [`SceneGraph`] owns the static meshes, decals and dynamic lights of
//! a level. Each frame it clusters decals and lights for the active camera,
//! then draws static meshes in sorted, instanced batches.
//!
//! ```text
//! prepare_lights_and_decals ──► ClusterBuilder::prepare / upload
//!            │
//!            ▼
//! draw / draw_depth_map ──► sort ─► cull ─► batch ─► InstanceBatcher
//! ```

pub mod camera;
pub mod culling;
pub mod decal;
pub mod decal_store;
pub mod dynamic_light;
pub mod env_object;
pub mod model;
pub mod plant;
pub mod scene_graph;

pub use camera::Camera;
pub use culling::{Frustum, Plane};
pub use decal::{Decal, DecalKind, UvRect};
pub use decal_store::{DecalInsert, DecalStore};
pub use dynamic_light::{DynamicLight, DynamicLightCollection};
pub use env_object::{EnvMaterial, EnvObject};
pub use model::{Model, ModelLibrary};
pub use plant::PlantComponent;
pub use scene_graph::{SceneGraph, MAX_STATIC_MESHES};
pub use crate::foundation::collections::StaticMeshId;

use crate::render::{BatchError, RenderError};

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors reported by scene operations
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The object needs a collision mesh and its model has none
    #[error("{path} has no valid collision mesh")]
    MissingCollisionMesh {
        /// Object file path
        path: String,
    },

    /// Static meshes are addressed by 16-bit sort indices
    #[error("Too many static meshes (limit {})", u16::MAX)]
    TooManyStaticMeshes,

    /// The static decal share of the decal cap is full
    #[error("Decal capacity of {max} reached")]
    DecalCapacity {
        /// Capacity that was hit
        max: usize,
    },

    /// The object refers to a model that is not loaded
    #[error("Unknown model")]
    UnknownModel,

    /// No static mesh has this id
    #[error("Unknown static mesh")]
    UnknownStaticMesh,

    /// Backend failure outside a batch
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// Batch drawing failure
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}
