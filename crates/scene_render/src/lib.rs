//! # Scene Render
//!
//! Clustered decal and light binning plus instanced static mesh batching
//! for a scene graph renderer.
//!
//! ## Features
//!
//! - **Clustered binning**: decals and dynamic lights are sorted into a 3D
//!   grid of screen tiles and logarithmic depth slices once per frame
//! - **Packed GPU buffers**: per-cluster index lists, decal/light records
//!   and a `ClusterInfo` uniform block, grown but never shrunk
//! - **Instanced batching**: static meshes sharing shader, model and
//!   winding are drawn together through attribute or uniform block
//!   instancing
//! - **Backend agnostic**: every GPU operation goes through [`render::RenderBackend`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_render::prelude::*;
//!
//! fn frame(scene: &mut SceneGraph, backend: &mut dyn RenderBackend, camera: &Camera) -> Result<(), SceneError> {
//!     scene.update(1.0, 1.0 / 60.0);
//!     scene.prepare_lights_and_decals(backend, camera, &ScreenRegion::full(1920, 1080))?;
//!     scene.draw(backend, camera, None)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod cluster;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        cluster::{ClusterBuilder, ClusterStats, DecalAtlases, ScreenRegion},
        config::{Config, ConfigError, RenderSettings},
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        render::{BatchStats, DepthType, DrawType, RenderBackend, RenderError},
        scene::{
            Camera, Decal, EnvMaterial, EnvObject, Model, Plane, SceneError, SceneGraph, SceneResult,
        },
    };
}
