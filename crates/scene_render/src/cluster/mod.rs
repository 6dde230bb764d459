//! Clustered decal and light binning
//!
//! The view frustum is cut into a 3D grid of clusters: square tiles of
//! `cluster_size` pixels on screen and logarithmic slices in depth. Every
//! frame the [`ClusterBuilder`] bins the live decals and dynamic lights
//! into the clusters they overlap and packs the result into the buffers
//! object shaders sample.
//!
//! ```text
//! decals / lights ──► ClusterGrid (cell ranges)
//!                          │
//!                          ▼
//!                  ClusterListArena (per-cell lists)
//!                          │ flatten
//!                          ▼
//!   cluster buffer: [lookup pairs][decal indices][light indices]
//!   data buffer:    [ShaderDecal ...][ShaderLight ...]
//!   ClusterInfo uniform block
//! ```

pub mod arena;
pub mod builder;
pub mod gpu_types;
pub mod grid;
pub mod packing;

pub use builder::{ClusterBuilder, ClusterStats, ClusterView, DecalAtlases, ScreenRegion};
pub use gpu_types::{ShaderClusterInfo, ShaderDecal, ShaderLight};
pub use grid::{ClusterGrid, GridParams};
pub use packing::ClusterLookup;
