//! Scene graph for static meshes, decals and dynamic lights
//!
//! Owns everything the clustered renderer draws in a level and drives the
//! per-frame order: [`SceneGraph::prepare_lights_and_decals`] bins and
//! uploads decals and lights, then [`SceneGraph::draw`] and
//! [`SceneGraph::draw_depth_map`] submit static meshes in instanced batches.
//!
//! Static meshes live in a dense array. A `u16` index list over that array
//! is kept sorted by `(transparent, shader, model, winding)` so compatible
//! meshes are adjacent; the sort only runs after the set changes.

use super::camera::Camera;
use super::culling::Plane;
use super::decal_store::DecalStore;
use super::dynamic_light::DynamicLightCollection;
use super::env_object::EnvObject;
use super::model::ModelLibrary;
use super::{SceneError, SceneResult};
use crate::cluster::builder::{ClusterBuilder, ClusterStats, DecalAtlases, ScreenRegion};
use crate::config::RenderSettings;
use crate::foundation::collections::{HandleMap, ModelId, StaticMeshId};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{FrameUniforms, PolygonMode, RenderBackend, TextureHandle};
use crate::render::instance_batcher::{BatchResult, BatchStats, DrawContext, InstanceBatcher};
use crate::render::pass_config::{DepthType, DrawType, RenderPassConfig};

/// Most static meshes a scene can hold; sort indices are 16-bit
pub const MAX_STATIC_MESHES: usize = u16::MAX as usize;

/// Static meshes, decals and lights of one level
#[derive(Debug)]
pub struct SceneGraph {
    settings: RenderSettings,
    models: ModelLibrary,
    static_meshes: Vec<EnvObject>,
    static_mesh_ids: Vec<StaticMeshId>,
    slots: HandleMap<StaticMeshId, usize>,
    sorted_indices: Vec<u16>,
    need_sort: bool,
    decals: DecalStore,
    lights: DynamicLightCollection,
    clusters: ClusterBuilder,
    batcher: InstanceBatcher,
    decal_atlases: DecalAtlases,
    color_snapshot: Option<TextureHandle>,
    render_time: f32,
}

impl SceneGraph {
    /// Create an empty scene
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            models: ModelLibrary::new(),
            static_meshes: Vec::new(),
            static_mesh_ids: Vec::new(),
            slots: HandleMap::with_key(),
            sorted_indices: Vec::new(),
            need_sort: false,
            decals: DecalStore::new(),
            lights: DynamicLightCollection::new(),
            clusters: ClusterBuilder::new(),
            batcher: InstanceBatcher::new(),
            decal_atlases: DecalAtlases::default(),
            color_snapshot: None,
            render_time: 0.0,
        }
    }

    /// Render settings
    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Mutable render settings; takes effect on the next pass
    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    /// Loaded models
    pub const fn models(&self) -> &ModelLibrary {
        &self.models
    }

    /// Mutable model library
    pub fn models_mut(&mut self) -> &mut ModelLibrary {
        &mut self.models
    }

    /// Static and dynamic decals
    pub const fn decals(&self) -> &DecalStore {
        &self.decals
    }

    /// Mutable decal store
    pub fn decals_mut(&mut self) -> &mut DecalStore {
        &mut self.decals
    }

    /// Dynamic lights
    pub const fn lights(&self) -> &DynamicLightCollection {
        &self.lights
    }

    /// Mutable dynamic lights
    pub fn lights_mut(&mut self) -> &mut DynamicLightCollection {
        &mut self.lights
    }

    /// Cluster data of the last prepared frame
    pub const fn clusters(&self) -> &ClusterBuilder {
        &self.clusters
    }

    /// Set the decal atlas textures bound by object shaders
    pub fn set_decal_atlases(&mut self, atlases: DecalAtlases) {
        self.decal_atlases = atlases;
    }

    /// Set the texture that receives the color snapshot for transparent objects
    pub fn set_color_snapshot(&mut self, texture: Option<TextureHandle>) {
        self.color_snapshot = texture;
    }

    /// Render time of the last update
    pub const fn render_time(&self) -> f32 {
        self.render_time
    }

    /// Initialize `object` and add it to the scene.
    ///
    /// Objects that fail initialization are not added.
    pub fn add_env_object(&mut self, mut object: EnvObject) -> SceneResult<StaticMeshId> {
        if self.static_meshes.len() >= MAX_STATIC_MESHES {
            log::warn!("Static mesh limit of {MAX_STATIC_MESHES} reached");
            return Err(SceneError::TooManyStaticMeshes);
        }
        object.initialize(&self.models)?;

        let index = self.static_meshes.len();
        let id = self.slots.insert(index);
        self.static_meshes.push(object);
        self.static_mesh_ids.push(id);
        self.rebuild_indices();
        Ok(id)
    }

    /// Remove a static mesh
    pub fn remove_env_object(&mut self, id: StaticMeshId) -> Option<EnvObject> {
        let index = self.slots.remove(id)?;
        let object = self.static_meshes.swap_remove(index);
        self.static_mesh_ids.swap_remove(index);
        if let Some(moved) = self.static_mesh_ids.get(index) {
            if let Some(slot) = self.slots.get_mut(*moved) {
                *slot = index;
            }
        }
        self.rebuild_indices();
        Some(object)
    }

    /// Static mesh by id
    pub fn env_object(&self, id: StaticMeshId) -> Option<&EnvObject> {
        self.slots.get(id).and_then(|&index| self.static_meshes.get(index))
    }

    /// Mutable static mesh by id; the draw order is re-sorted before the next pass
    pub fn env_object_mut(&mut self, id: StaticMeshId) -> Option<&mut EnvObject> {
        let index = *self.slots.get(id)?;
        self.need_sort = true;
        self.static_meshes.get_mut(index)
    }

    /// Swap the render model of a static mesh; it moves to its new batch on the next pass
    pub fn set_env_object_model(&mut self, id: StaticMeshId, model: ModelId) -> SceneResult<()> {
        let index = *self.slots.get(id).ok_or(SceneError::UnknownStaticMesh)?;
        let object = self.static_meshes.get_mut(index).ok_or(SceneError::UnknownStaticMesh)?;
        object.set_model(model, &self.models)?;
        self.need_sort = true;
        Ok(())
    }

    /// Swap the collision hull of a static mesh
    pub fn set_env_object_collision_model(
        &mut self,
        id: StaticMeshId,
        collision_model: Option<ModelId>,
    ) -> SceneResult<()> {
        let index = *self.slots.get(id).ok_or(SceneError::UnknownStaticMesh)?;
        let object = self.static_meshes.get_mut(index).ok_or(SceneError::UnknownStaticMesh)?;
        object.set_collision_model(collision_model, &self.models)
    }

    /// Number of static meshes
    pub fn env_object_count(&self) -> usize {
        self.static_meshes.len()
    }

    /// Static meshes in draw order
    pub fn sorted_env_objects(&mut self) -> impl Iterator<Item = &EnvObject> {
        self.sort_if_needed();
        let meshes = &self.static_meshes;
        self.sorted_indices.iter().map(move |&index| &meshes[usize::from(index)])
    }

    /// Advance time: expire transient decals and animate plants
    pub fn update(&mut self, now: f32, dt: f32) {
        self.render_time = now;
        let expired = self.decals.expire_transient_decals(now);
        if expired > 0 {
            log::trace!("Expired {expired} transient decals");
        }
        for object in &mut self.static_meshes {
            object.update(dt);
        }
    }

    /// Bin this frame's decals and lights for `camera` and upload them
    pub fn prepare_lights_and_decals(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        region: &ScreenRegion,
    ) -> SceneResult<ClusterStats> {
        self.clusters.prepare(
            &camera.cluster_view(),
            region,
            &self.settings,
            self.decals.iter(),
            self.lights.iter(),
        );
        self.clusters.upload(backend)?;
        Ok(self.clusters.stats())
    }

    /// Draw visible static meshes with full shading.
    ///
    /// Opaque meshes are culled and batched; when `draw_collision` is set
    /// their collision meshes follow as wireframe. Transparent meshes are
    /// drawn last, one per call, after the color target has been copied.
    pub fn draw(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        shadow_matrices: Option<&[Mat4]>,
    ) -> SceneResult<BatchStats> {
        let pass = RenderPassConfig::for_backend(DrawType::FullDraw, &self.settings, backend);
        self.sort_if_needed();
        if self.settings.draw_collision {
            for object in self.static_meshes.iter_mut().filter(|obj| obj.enabled) {
                object.refresh_normal_override(backend, &self.models)?;
            }
        }

        let meshes = &self.static_meshes;
        let to_draw: Vec<&EnvObject> = self
            .sorted_indices
            .iter()
            .map(|&index| &meshes[usize::from(index)])
            .filter(|obj| !obj.is_transparent() && obj.enabled)
            .filter(|obj| camera.sphere_in_frustum(&obj.sphere_center(), obj.sphere_radius()))
            .collect();

        let ctx = DrawContext {
            pass: &pass,
            settings: &self.settings,
            frame: FrameUniforms {
                proj_view: camera.proj_view(),
                prev_proj_view: *camera.prev_proj_view(),
                time: self.render_time,
                cam_pos: camera.position(),
                shadow_matrices,
            },
            clusters: &self.clusters,
            decal_atlases: &self.decal_atlases,
            color_snapshot: self.color_snapshot,
        };

        self.batcher.reset_shader_cache();
        let mut stats = draw_runs(&mut self.batcher, backend, &ctx, &mut self.models, &to_draw, DrawType::FullDraw, |_| false)?;

        if self.settings.draw_collision {
            self.batcher.reset_shader_cache();
            backend.set_polygon_mode(PolygonMode::Line);
            let collision = draw_runs(
                &mut self.batcher,
                backend,
                &ctx,
                &mut self.models,
                &to_draw,
                DrawType::Wireframe,
                |first| first.material().bush_collision,
            );
            backend.set_polygon_mode(PolygonMode::Fill);
            stats += collision?;
        }

        // The last enabled mesh in sorted order decides; transparent ones sort last
        let draw_transparent = self
            .sorted_indices
            .iter()
            .rev()
            .map(|&index| &meshes[usize::from(index)])
            .find(|obj| obj.enabled)
            .is_some_and(EnvObject::is_transparent);

        if draw_transparent {
            if !self.settings.simple_water {
                backend.copy_color_snapshot()?;
            }
            self.batcher.reset_shader_cache();
            for obj in meshes.iter().filter(|obj| obj.enabled && obj.is_transparent()) {
                stats += self
                    .batcher
                    .draw_instances(backend, &ctx, &mut self.models, &[obj], DrawType::FullDraw)?;
            }
        }

        log::trace!(
            "Static meshes: {} draw calls, {} instances, {} shader changes",
            stats.draw_calls,
            stats.instances,
            stats.shader_changes
        );
        Ok(stats)
    }

    /// Draw opaque static meshes into a depth target.
    ///
    /// A mesh is skipped when its bounding sphere lies entirely behind any
    /// of `cull_planes`.
    pub fn draw_depth_map(
        &mut self,
        backend: &mut dyn RenderBackend,
        cam_pos: Vec3,
        proj_view: &Mat4,
        cull_planes: &[Plane],
        depth_type: DepthType,
    ) -> SceneResult<BatchStats> {
        let draw_type = depth_type.draw_type();
        let pass = RenderPassConfig::for_backend(draw_type, &self.settings, backend);
        self.sort_if_needed();

        let meshes = &self.static_meshes;
        let to_draw: Vec<&EnvObject> = self
            .sorted_indices
            .iter()
            .map(|&index| &meshes[usize::from(index)])
            .filter(|obj| !obj.is_transparent() && obj.enabled)
            .filter(|obj| {
                !cull_planes
                    .iter()
                    .any(|plane| plane.culls_sphere(&obj.sphere_center(), obj.sphere_radius()))
            })
            .collect();

        let ctx = DrawContext {
            pass: &pass,
            settings: &self.settings,
            frame: FrameUniforms {
                proj_view: *proj_view,
                prev_proj_view: *proj_view,
                time: self.render_time,
                cam_pos,
                shadow_matrices: None,
            },
            clusters: &self.clusters,
            decal_atlases: &self.decal_atlases,
            color_snapshot: None,
        };

        self.batcher.reset_shader_cache();
        let stats = draw_runs(&mut self.batcher, backend, &ctx, &mut self.models, &to_draw, draw_type, |_| false)?;
        Ok(stats)
    }

    fn rebuild_indices(&mut self) {
        self.sorted_indices.clear();
        self.sorted_indices.extend((0..self.static_meshes.len()).filter_map(|i| u16::try_from(i).ok()));
        self.need_sort = true;
    }

    fn sort_if_needed(&mut self) {
        if !self.need_sort {
            return;
        }
        let meshes = &self.static_meshes;
        self.sorted_indices.sort_by(|&a, &b| {
            let (a, b) = (&meshes[usize::from(a)], &meshes[usize::from(b)]);
            a.is_transparent()
                .cmp(&b.is_transparent())
                .then_with(|| a.shader_name().cmp(b.shader_name()))
                .then_with(|| a.model_path().cmp(b.model_path()))
                .then_with(|| a.winding_flip().cmp(&b.winding_flip()))
        });
        self.need_sort = false;
        log::debug!("Sorted {} static meshes", self.sorted_indices.len());
    }
}

/// Draw maximal runs of batch-compatible meshes, skipping runs whose first
/// mesh matches `skip`
fn draw_runs(
    batcher: &mut InstanceBatcher,
    backend: &mut dyn RenderBackend,
    ctx: &DrawContext<'_>,
    models: &mut ModelLibrary,
    objects: &[&EnvObject],
    draw_type: DrawType,
    skip: impl Fn(&EnvObject) -> bool,
) -> BatchResult<BatchStats> {
    let mut stats = BatchStats::default();
    let mut start = 0;
    for end in 1..=objects.len() {
        if end == objects.len() || !objects[end].same_batch(objects[end - 1]) {
            let run = &objects[start..end];
            if !skip(run[0]) {
                stats += batcher.draw_instances(backend, ctx, models, run, draw_type)?;
            }
            start = end;
        }
    }
    Ok(stats)
}
