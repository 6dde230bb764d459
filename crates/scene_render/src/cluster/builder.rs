//! Per-frame clustering of decals and lights
//!
//! [`ClusterBuilder::prepare`] bins every visible decal and light into the
//! cluster grid and packs the GPU records; [`ClusterBuilder::upload`] pushes
//! the results to the backend. Object shaders then pick them up through
//! [`ClusterBuilder::bind_decals`] and [`ClusterBuilder::bind_lights`].
//!
//! Cluster buffer layout (u32 words):
//! `[decal lookup, light lookup] * numclusters`, then the flattened decal
//! indices, then the flattened light indices.
//!
//! Data buffer layout (f32): alive decal records followed by alive light
//! records.

use bytemuck::Zeroable;

use super::arena::ClusterListArena;
use super::gpu_types::{ShaderClusterInfo, ShaderDecal, ShaderLight};
use super::grid::{view_bounds_of_light, view_bounds_of_unit_box, ClusterGrid, GridParams};
use super::packing::ClusterLookup;
use crate::config::RenderSettings;
use crate::foundation::math::{Mat4, Vec2, Vec4};
use crate::render::backend::{
    BackendResult, BufferTextureFormat, ProgramHandle, RenderBackend, RenderError, TextureHandle, TextureSlot,
    UniformBinding,
};
use crate::render::uniform_ring::{UniformRing, CLUSTER_INFO_RING_SIZE};
use crate::scene::decal::Decal;
use crate::scene::decal_store::MAX_DECALS;
use crate::scene::dynamic_light::{DynamicLight, MAX_DYNAMIC_LIGHTS};

/// Shaders may not declare a `ClusterInfo` block this large
const MAX_CLUSTER_BLOCK_SIZE: usize = 16384;

/// Camera state needed to build the grid
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    /// Projection matrix
    pub projection: Mat4,
    /// View matrix
    pub view: Mat4,
    /// Near plane distance
    pub z_near: f32,
    /// Far plane distance
    pub z_far: f32,
    /// Viewport `(x, y, width, height)` written to the info block
    pub viewport: Vec4,
}

/// Part of the render target the current view draws into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRegion {
    /// Start of the active region, normalized
    pub active_start: Vec2,
    /// End of the active region, normalized
    pub active_end: Vec2,
    /// Render target width in pixels
    pub width: u32,
    /// Render target height in pixels
    pub height: u32,
}

impl ScreenRegion {
    /// The whole render target
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            active_start: Vec2::zeros(),
            active_end: Vec2::new(1.0, 1.0),
            width,
            height,
        }
    }
}

/// Decal atlases bound for object shaders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecalAtlases {
    /// Color atlas
    pub color: Option<TextureHandle>,
    /// Normal atlas
    pub normal: Option<TextureHandle>,
}

/// Counters from the last [`ClusterBuilder::prepare`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Decals that survived culling
    pub alive_decals: usize,
    /// Lights that survived culling
    pub alive_lights: usize,
    /// Flattened decal list length
    pub decal_entries: usize,
    /// Flattened light list length
    pub light_entries: usize,
    /// List entries dropped because they do not fit a lookup word's count or offset field
    pub dropped_entries: usize,
}

/// Builds and owns the cluster and data buffers
#[derive(Debug)]
pub struct ClusterBuilder {
    grid: Option<ClusterGrid>,
    arena: ClusterListArena,
    decal_lookup: Vec<ClusterLookup>,
    light_lookup: Vec<ClusterLookup>,
    cluster_decals: Vec<u32>,
    cluster_lights: Vec<u32>,
    cluster_buffer: Vec<u32>,
    cluster_words: usize,
    data_buffer: Vec<f32>,
    data_floats: usize,
    info: ShaderClusterInfo,
    stats: ClusterStats,
    cluster_texture: Option<TextureHandle>,
    data_texture: Option<TextureHandle>,
    info_ring: UniformRing,
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterBuilder {
    /// Create a builder with no buffers yet
    pub fn new() -> Self {
        Self {
            grid: None,
            arena: ClusterListArena::new(),
            decal_lookup: Vec::new(),
            light_lookup: Vec::new(),
            cluster_decals: Vec::new(),
            cluster_lights: Vec::new(),
            cluster_buffer: Vec::new(),
            cluster_words: 0,
            data_buffer: Vec::new(),
            data_floats: 0,
            info: ShaderClusterInfo::zeroed(),
            stats: ClusterStats::default(),
            cluster_texture: None,
            data_texture: None,
            info_ring: UniformRing::new(CLUSTER_INFO_RING_SIZE),
        }
    }

    /// Bin decals and lights for this frame and pack their GPU records
    pub fn prepare<'a, D, L>(
        &mut self,
        view: &ClusterView,
        region: &ScreenRegion,
        settings: &RenderSettings,
        decals: D,
        lights: L,
    ) where
        D: IntoIterator<Item = &'a Decal>,
        L: IntoIterator<Item = &'a DynamicLight>,
    {
        let grid = ClusterGrid::new(&GridParams {
            width: region.width,
            height: region.height,
            cluster_size: settings.cluster_size,
            num_z_clusters: settings.num_z_clusters,
            projection: view.projection,
            z_near: view.z_near,
            z_far: view.z_far,
            active_start: region.active_start,
            active_end: region.active_end,
        });
        let num_clusters = grid.num_clusters();

        let alive_decals = self.cluster_decals_pass(&grid, view, settings, decals);
        let decal_dropped = self.arena.flatten_into(&mut self.decal_lookup, &mut self.cluster_decals);

        let light_base = alive_decals * ShaderDecal::FLOATS;
        let alive_lights = self.cluster_lights_pass(&grid, view, settings, lights, light_base);
        let light_dropped = self.arena.flatten_into(&mut self.light_lookup, &mut self.cluster_lights);

        self.data_floats = light_base + alive_lights * ShaderLight::FLOATS;
        self.pack_cluster_buffer(num_clusters);

        let dropped = decal_dropped + light_dropped;
        if dropped > 0 {
            log::warn!("Truncated {dropped} cluster list entries that do not fit the lookup words");
        }

        self.info = ShaderClusterInfo {
            grid_size: [grid.grid_width(), grid.grid_height(), grid.num_z_clusters()],
            num_decals: alive_decals as u32,
            num_lights: alive_lights as u32,
            light_cluster_data_offset: (num_clusters * 2 + self.cluster_decals.len()) as u32,
            light_data_offset: (light_base / 4) as u32,
            cluster_width: grid.cluster_size(),
            inv_proj_mat: ShaderClusterInfo::matrix_columns(&view.projection.try_inverse().unwrap_or_else(Mat4::identity)),
            viewport: [view.viewport.x, view.viewport.y, view.viewport.z, view.viewport.w],
            z_near: view.z_near,
            z_mult: grid.z_mult(),
            _pad3: 0.0,
            _pad4: 0.0,
        };

        self.stats = ClusterStats {
            alive_decals,
            alive_lights,
            decal_entries: self.cluster_decals.len(),
            light_entries: self.cluster_lights.len(),
            dropped_entries: dropped,
        };
        log::trace!(
            "Clustered {} decals and {} lights into {} clusters ({} + {} entries)",
            alive_decals,
            alive_lights,
            num_clusters,
            self.stats.decal_entries,
            self.stats.light_entries
        );

        self.grid = Some(grid);
    }

    fn cluster_decals_pass<'a, D>(
        &mut self,
        grid: &ClusterGrid,
        view: &ClusterView,
        settings: &RenderSettings,
        decals: D,
    ) -> usize
    where
        D: IntoIterator<Item = &'a Decal>,
    {
        self.arena.reset(grid.num_clusters());
        let mut alive = 0;
        for (index, decal) in decals.into_iter().enumerate() {
            debug_assert!(index < MAX_DECALS, "more than {MAX_DECALS} decals");
            if !decal.enabled {
                continue;
            }
            let (view_min, view_max) = view_bounds_of_unit_box(&(view.view * decal.world_matrix()));
            let Some(range) = grid.cell_range(view_min, view_max) else {
                continue;
            };
            if settings.no_decal_elements {
                continue;
            }

            let record = decal.to_shader(settings.decal_normals);
            self.write_data(alive * ShaderDecal::FLOATS, bytemuck::cast_slice(std::slice::from_ref(&record)));
            for cell in grid.cells(&range) {
                self.arena.push(cell, alive as u32);
            }
            alive += 1;
        }
        alive
    }

    fn cluster_lights_pass<'a, L>(
        &mut self,
        grid: &ClusterGrid,
        view: &ClusterView,
        settings: &RenderSettings,
        lights: L,
        base: usize,
    ) -> usize
    where
        L: IntoIterator<Item = &'a DynamicLight>,
    {
        self.arena.reset(grid.num_clusters());
        let mut alive = 0;
        for (index, light) in lights.into_iter().enumerate() {
            debug_assert!(index < MAX_DYNAMIC_LIGHTS, "more than {MAX_DYNAMIC_LIGHTS} lights");
            let (view_min, view_max) = view_bounds_of_light(&view.view, &light.position, light.radius);
            let Some(range) = grid.cell_range(view_min, view_max) else {
                continue;
            };
            if settings.no_decal_elements {
                continue;
            }

            let record = light.to_shader();
            self.write_data(base + alive * ShaderLight::FLOATS, bytemuck::cast_slice(std::slice::from_ref(&record)));
            for cell in grid.cells(&range) {
                self.arena.push(cell, alive as u32);
            }
            alive += 1;
        }
        alive
    }

    fn write_data(&mut self, at: usize, floats: &[f32]) {
        let end = at + floats.len();
        if self.data_buffer.len() < end {
            log::debug!("Growing light/decal data buffer to {end} floats");
            self.data_buffer.resize(end, 0.0);
        }
        self.data_buffer[at..end].copy_from_slice(floats);
    }

    fn pack_cluster_buffer(&mut self, num_clusters: usize) {
        let words = num_clusters * 2 + self.cluster_decals.len() + self.cluster_lights.len();
        if self.cluster_buffer.len() < words {
            log::debug!("Growing cluster buffer to {words} words");
            self.cluster_buffer.resize(words, 0);
        }

        for (i, (decal, light)) in self.decal_lookup.iter().zip(&self.light_lookup).enumerate() {
            self.cluster_buffer[i * 2] = decal.raw();
            self.cluster_buffer[i * 2 + 1] = light.raw();
        }
        let decal_start = num_clusters * 2;
        let light_start = decal_start + self.cluster_decals.len();
        self.cluster_buffer[decal_start..light_start].copy_from_slice(&self.cluster_decals);
        self.cluster_buffer[light_start..words].copy_from_slice(&self.cluster_lights);
        self.cluster_words = words;
    }

    /// Upload this frame's buffers and info block
    pub fn upload(&mut self, backend: &mut dyn RenderBackend) -> BackendResult<()> {
        let cluster_texture = match self.cluster_texture {
            Some(texture) => texture,
            None => {
                let texture = backend.create_buffer_texture(BufferTextureFormat::R32Uint)?;
                self.cluster_texture = Some(texture);
                texture
            }
        };
        let data_texture = match self.data_texture {
            Some(texture) => texture,
            None => {
                let texture = backend.create_buffer_texture(BufferTextureFormat::Rgba32Float)?;
                self.data_texture = Some(texture);
                texture
            }
        };

        backend.update_buffer_texture(cluster_texture, bytemuck::cast_slice(self.cluster_data()))?;
        backend.update_buffer_texture(data_texture, bytemuck::cast_slice(self.data()))?;
        self.info_ring.fill(backend, bytemuck::bytes_of(&self.info))?;
        Ok(())
    }

    /// Bind the decal atlases for `program`; does nothing if it has no `ClusterInfo` block
    pub fn bind_decals(
        &self,
        backend: &mut dyn RenderBackend,
        program: ProgramHandle,
        atlases: &DecalAtlases,
        decal_normals: bool,
    ) {
        if backend.uniform_block_size(program, ShaderClusterInfo::BLOCK_NAME).is_none() {
            return;
        }
        if let Some(color) = atlases.color {
            backend.bind_texture(TextureSlot::DecalColor, color);
        }
        if decal_normals {
            if let Some(normal) = atlases.normal {
                backend.bind_texture(TextureSlot::DecalNormal, normal);
            }
        }
    }

    /// Bind the info block and cluster buffers for `program`; does nothing
    /// if it has no `ClusterInfo` block
    pub fn bind_lights(&self, backend: &mut dyn RenderBackend, program: ProgramHandle) -> BackendResult<()> {
        let Some(block_size) = backend.uniform_block_size(program, ShaderClusterInfo::BLOCK_NAME) else {
            return Ok(());
        };
        if block_size != ShaderClusterInfo::SIZE || block_size >= MAX_CLUSTER_BLOCK_SIZE {
            return Err(RenderError::UniformBlockMismatch {
                block: ShaderClusterInfo::BLOCK_NAME.to_string(),
                expected: ShaderClusterInfo::SIZE,
                actual: block_size,
            });
        }

        if let Some((buffer, range)) = self.info_ring.current_range() {
            backend.bind_uniform_range(
                program,
                ShaderClusterInfo::BLOCK_NAME,
                UniformBinding::ClusterData,
                buffer,
                range,
            );
        }
        if let Some(data) = self.data_texture {
            backend.bind_texture(TextureSlot::LightDecalData, data);
        }
        if let Some(clusters) = self.cluster_texture {
            backend.bind_texture(TextureSlot::ClusterBuffer, clusters);
        }
        Ok(())
    }

    /// Grid of the last prepared frame
    pub const fn grid(&self) -> Option<&ClusterGrid> {
        self.grid.as_ref()
    }

    /// Info block of the last prepared frame
    pub const fn info(&self) -> &ShaderClusterInfo {
        &self.info
    }

    /// Counters of the last prepared frame
    pub const fn stats(&self) -> ClusterStats {
        self.stats
    }

    /// Per-cluster decal lookup words
    pub fn decal_lookup(&self) -> &[ClusterLookup] {
        &self.decal_lookup
    }

    /// Per-cluster light lookup words
    pub fn light_lookup(&self) -> &[ClusterLookup] {
        &self.light_lookup
    }

    /// Flattened decal indices
    pub fn cluster_decals(&self) -> &[u32] {
        &self.cluster_decals
    }

    /// Flattened light indices
    pub fn cluster_lights(&self) -> &[u32] {
        &self.cluster_lights
    }

    /// Used part of the cluster buffer
    pub fn cluster_data(&self) -> &[u32] {
        &self.cluster_buffer[..self.cluster_words]
    }

    /// Used part of the decal/light data buffer
    pub fn data(&self) -> &[f32] {
        &self.data_buffer[..self.data_floats]
    }

    /// Allocated size of the cluster buffer in words
    pub fn cluster_capacity(&self) -> usize {
        self.cluster_buffer.len()
    }

    /// Allocated size of the data buffer in floats
    pub fn data_capacity(&self) -> usize {
        self.data_buffer.len()
    }
}
