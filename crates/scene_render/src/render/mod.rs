//! # Rendering
//!
//! The GPU seam and the static mesh draw path.
//!
//! - **RenderBackend**: the only way clustering and batching reach the GPU
//! - **RenderPassConfig**: shader suffix and batching choices for one pass
//! - **UniformRing**: ring-buffered uniform uploads
//! - **InstanceBatcher**: instanced draws for runs of static meshes

pub mod backend;
pub mod instance_batcher;
pub mod pass_config;
pub mod uniform_ring;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::{
    BackendResult, BufferHandle, BufferTextureFormat, DrawState, FrameUniforms, InstanceStream, MeshHandle,
    PolygonMode, ProgramHandle, RenderBackend, RenderError, TextureHandle, TextureSlot, UniformBinding,
};
pub use instance_batcher::{BatchError, BatchResult, BatchStats, DrawContext, InstanceBatcher};
pub use pass_config::{BatchMultiplier, DepthType, DrawType, RenderPassConfig};
pub use uniform_ring::UniformRing;
