//! # Instance Batcher
//!
//! Draws runs of static meshes that share shader, model and winding with
//! as few instanced draw calls as the device allows.
//!
//! ## Per-instance data
//!
//! Translation always travels in a vertex attribute stream. The remaining
//! fields (scale, rotation, tint, detail scale) go either into four more
//! attribute streams, or into the `InstanceInfo` uniform block at a fixed
//! 64-byte stride when attribute instancing is unavailable.
//!
//! ## Shader caching
//!
//! The program is only re-resolved when the base shader name changes
//! between consecutive batches. Callers reset the cache at the start of
//! every pass with [`InstanceBatcher::reset_shader_cache`].

use bytemuck::{Pod, Zeroable};

use crate::cluster::builder::{ClusterBuilder, DecalAtlases};
use crate::config::{RenderFeatures, RenderSettings};
use crate::render::backend::{
    DrawState, FrameUniforms, InstanceStream, ProgramHandle, RenderBackend, RenderError, TextureHandle, TextureSlot,
    UniformBinding,
};
use crate::render::pass_config::{DrawType, RenderPassConfig};
use crate::render::uniform_ring::{UniformRing, INSTANCE_RING_SIZE};
use crate::scene::env_object::EnvObject;
use crate::scene::model::ModelLibrary;

/// Instances per draw call before the uniform block multiplier
pub const BASE_BATCH_SIZE: usize = 256;

/// Bytes per instance in the `InstanceInfo` uniform block
pub const INSTANCE_STRIDE: usize = 64;

/// Name of the per-instance uniform block
pub const INSTANCE_BLOCK_NAME: &str = "InstanceInfo";

/// Result type for batch drawing
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur while drawing a batch
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The backend failed
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// An instance refers to a model that is not in the library
    #[error("Model not loaded: {0}")]
    MissingModel(String),
}

/// Counters for one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Instanced draw calls issued
    pub draw_calls: usize,
    /// Instances submitted
    pub instances: usize,
    /// Times a new program had to be resolved
    pub shader_changes: usize,
}

impl std::ops::AddAssign for BatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_calls += rhs.draw_calls;
        self.instances += rhs.instances;
        self.shader_changes += rhs.shader_changes;
    }
}

/// Everything a batch needs from the current pass
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    /// Pass suffix and batching choices
    pub pass: &'a RenderPassConfig,
    /// Global render toggles
    pub settings: &'a RenderSettings,
    /// Camera matrices, time and shadow matrices for this pass
    pub frame: FrameUniforms<'a>,
    /// Clustered decals and lights of this frame
    pub clusters: &'a ClusterBuilder,
    /// Decal atlas textures
    pub decal_atlases: &'a DecalAtlases,
    /// Copy of the color target for transparent shaders
    pub color_snapshot: Option<TextureHandle>,
}

/// Uniform block layout of one instance
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct InstanceRecord {
    scale: [f32; 3],
    _pad: f32,
    rotation: [f32; 4],
    tint: [f32; 4],
    detail_scale: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<InstanceRecord>() == INSTANCE_STRIDE);

/// Issues instanced draws for runs of compatible static meshes
#[derive(Debug)]
pub struct InstanceBatcher {
    last_shader: Option<String>,
    program: Option<ProgramHandle>,
    instance_ring: UniformRing,
    translations: Vec<[f32; 3]>,
    scales: Vec<[f32; 3]>,
    rotations: Vec<[f32; 4]>,
    tints: Vec<[f32; 4]>,
    detail_scales: Vec<[f32; 4]>,
    block: Vec<u8>,
}

impl Default for InstanceBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBatcher {
    /// Create a batcher; GPU buffers are created on first use
    pub fn new() -> Self {
        Self {
            last_shader: None,
            program: None,
            instance_ring: UniformRing::new(INSTANCE_RING_SIZE),
            translations: Vec::new(),
            scales: Vec::new(),
            rotations: Vec::new(),
            tints: Vec::new(),
            detail_scales: Vec::new(),
            block: Vec::new(),
        }
    }

    /// Forget the bound program so the next batch resolves its shader again
    pub fn reset_shader_cache(&mut self) {
        self.last_shader = None;
        self.program = None;
    }

    /// Program bound by the last batch
    pub const fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Instances per draw call for this pass
    pub const fn batch_size(ctx: &DrawContext<'_>) -> usize {
        if ctx.settings.draw_collision {
            1
        } else {
            BASE_BATCH_SIZE * ctx.pass.multiplier().factor()
        }
    }

    /// Full shader string for `base` in this pass
    pub fn shader_string(base: &str, draw_type: DrawType, ctx: &DrawContext<'_>) -> String {
        let mut shader = base.to_string();
        if draw_type == DrawType::Decal {
            shader.push_str(" #DECAL");
        }
        if ctx.pass.features().contains(RenderFeatures::DECAL_NORMALS) {
            shader.push_str(" #DECAL_NORMALS");
        }
        if ctx.settings.draw_collision {
            shader.push_str(" #COLLISION");
        }
        if draw_type == DrawType::Wireframe {
            shader.push_str(" #WIREFRAME");
        }
        shader.push(' ');
        shader.push_str(ctx.pass.suffix());
        shader
    }

    /// Draw one run of instances.
    ///
    /// Every instance must share shader, model and winding with the first;
    /// the first instance's material and model decide state and mesh.
    pub fn draw_instances(
        &mut self,
        backend: &mut dyn RenderBackend,
        ctx: &DrawContext<'_>,
        models: &mut ModelLibrary,
        instances: &[&EnvObject],
        draw_type: DrawType,
    ) -> BatchResult<BatchStats> {
        let mut stats = BatchStats::default();
        let Some(first) = instances.first() else {
            return Ok(stats);
        };
        debug_assert!(instances.iter().all(|obj| obj.same_batch(first)));

        let material = first.material();
        let transparent = first.is_transparent();
        if draw_type == DrawType::DepthOnly && transparent {
            return Ok(stats);
        }
        let collision_pass = ctx.settings.draw_collision;
        let model_id = if collision_pass {
            match first.collision_model_id() {
                Some(id) if !material.no_collision => id,
                _ => return Ok(stats),
            }
        } else {
            first.model()
        };

        backend.set_draw_state(&Self::draw_state(ctx, draw_type, transparent, material.double_sided));

        let shader_changed = self.last_shader.as_deref() != Some(material.shader_name.as_str()) || self.program.is_none();
        let program = match (shader_changed, self.program) {
            (false, Some(program)) => program,
            _ => {
                let shader = Self::shader_string(&material.shader_name, draw_type, ctx);
                let program = backend.resolve_program(&shader)?;
                log::debug!("Bound shader '{shader}'");
                backend.use_program(program);
                let frame = FrameUniforms {
                    shadow_matrices: if draw_type == DrawType::FullDraw { ctx.frame.shadow_matrices } else { None },
                    ..ctx.frame
                };
                backend.set_frame_uniforms(&frame);
                self.program = Some(program);
                self.last_shader = Some(material.shader_name.clone());
                stats.shader_changes += 1;
                program
            }
        };

        let use_textures = draw_type.uses_textures();
        if let Some(color) = material.color_map {
            backend.bind_texture(TextureSlot::Color, color);
        }
        if use_textures {
            if let Some(normal) = material.normal_map {
                backend.bind_texture(TextureSlot::Normal, normal);
            }
        }
        if draw_type.binds_clusters() && shader_changed {
            if use_textures {
                ctx.clusters.bind_decals(backend, program, ctx.decal_atlases, ctx.settings.decal_normals);
                ctx.clusters.bind_lights(backend, program)?;
            }
            if let Some(snapshot) = ctx.color_snapshot {
                backend.bind_texture(TextureSlot::ScreenColorSnapshot, snapshot);
            }
        }

        let model = models
            .get_mut(model_id)
            .ok_or_else(|| BatchError::MissingModel(first.model_path().to_string()))?;
        let mesh = model.ensure_mesh(backend)?;
        let index_count = model.index_count;
        let texel_density = model.texel_density;
        backend.bind_mesh(mesh);

        let attrib_instancing = ctx.pass.attrib_instancing();
        let block_size = if attrib_instancing {
            None
        } else {
            match backend.uniform_block_size(program, INSTANCE_BLOCK_NAME) {
                Some(size) => Some(size),
                None => {
                    log::trace!("Program for '{}' has no {INSTANCE_BLOCK_NAME} block", material.shader_name);
                    return Ok(stats);
                }
            }
        };

        let batch_size = Self::batch_size(ctx);
        let stride = block_size.map_or(INSTANCE_STRIDE, |size| size / batch_size);
        if let Some(size) = block_size {
            if stride < INSTANCE_STRIDE {
                return Err(RenderError::UniformBlockMismatch {
                    block: INSTANCE_BLOCK_NAME.to_string(),
                    expected: INSTANCE_STRIDE * batch_size,
                    actual: size,
                }
                .into());
            }
        }

        for chunk in instances.chunks(batch_size) {
            self.collect(chunk, texel_density, attrib_instancing, stride);

            // one object per chunk in the collision pass
            if collision_pass {
                if let Some(normals) = chunk[0].normal_override_buffer() {
                    backend.bind_texture(TextureSlot::LightDecalData, normals);
                }
            }

            backend.fill_instance_stream(InstanceStream::Translation, bytemuck::cast_slice(&self.translations))?;
            if attrib_instancing {
                backend.fill_instance_stream(InstanceStream::Scale, bytemuck::cast_slice(&self.scales))?;
                backend.fill_instance_stream(InstanceStream::Rotation, bytemuck::cast_slice(&self.rotations))?;
                backend.fill_instance_stream(InstanceStream::Tint, bytemuck::cast_slice(&self.tints))?;
                backend.fill_instance_stream(InstanceStream::DetailScale, bytemuck::cast_slice(&self.detail_scales))?;
            } else {
                let (buffer, range) = self.instance_ring.fill(backend, &self.block)?;
                backend.bind_uniform_range(program, INSTANCE_BLOCK_NAME, UniformBinding::InstanceInfo, buffer, range);
            }

            backend.draw_elements_instanced(index_count, chunk.len() as u32)?;
            stats.draw_calls += 1;
            stats.instances += chunk.len();
        }

        Ok(stats)
    }

    fn draw_state(ctx: &DrawContext<'_>, draw_type: DrawType, transparent: bool, double_sided: bool) -> DrawState {
        let (blend, depth_write) = if draw_type == DrawType::Decal {
            (true, false)
        } else if transparent {
            (false, ctx.settings.simple_water)
        } else {
            (false, true)
        };
        DrawState {
            cull_face: !double_sided,
            depth_test: true,
            depth_write,
            blend,
            alpha_to_coverage: ctx.settings.use_sample_alpha_to_coverage && !transparent,
        }
    }

    fn collect(&mut self, chunk: &[&EnvObject], texel_density: f32, attrib_instancing: bool, stride: usize) {
        self.translations.clear();
        self.scales.clear();
        self.rotations.clear();
        self.tints.clear();
        self.detail_scales.clear();
        self.block.clear();
        if !attrib_instancing {
            self.block.resize(stride * chunk.len(), 0);
        }

        for (i, obj) in chunk.iter().enumerate() {
            let translation = obj.translation();
            self.translations.push([translation.x, translation.y, translation.z]);

            let scale = obj.scale();
            let rotation = obj.instance_rotation().coords;
            let tint = obj.instance_tint();
            let detail = obj.instance_detail_scale(texel_density);
            let record = InstanceRecord {
                scale: [scale.x, scale.y, scale.z],
                _pad: 0.0,
                rotation: [rotation.x, rotation.y, rotation.z, rotation.w],
                tint: [tint.x, tint.y, tint.z, tint.w],
                detail_scale: [detail.x, detail.y, detail.z, detail.w],
            };

            if attrib_instancing {
                self.scales.push(record.scale);
                self.rotations.push(record.rotation);
                self.tints.push(record.tint);
                self.detail_scales.push(record.detail_scale);
            } else {
                let offset = i * stride;
                self.block[offset..offset + INSTANCE_STRIDE].copy_from_slice(bytemuck::bytes_of(&record));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
    use crate::render::recording::{BackendCall, RecordingBackend};
    use crate::scene::env_object::EnvMaterial;
    use crate::scene::model::Model;
    use crate::scene::plant::PlantComponent;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    struct Fixture {
        settings: RenderSettings,
        clusters: ClusterBuilder,
        atlases: DecalAtlases,
        models: ModelLibrary,
        rock: crate::foundation::collections::ModelId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut models = ModelLibrary::new();
            let rock = models.add(
                Model::new("Data/Models/rock.obj", 36)
                    .with_collision_triangles(vec![[Vec3::zeros(), Vec3::x(), Vec3::y()]])
                    .with_box_dims(Vec3::new(1.0, 1.0, 1.0)),
            );
            Self {
                settings: RenderSettings::default(),
                clusters: ClusterBuilder::new(),
                atlases: DecalAtlases::default(),
                models,
                rock,
            }
        }

        fn objects(&self, material: &Arc<EnvMaterial>, count: usize) -> Vec<EnvObject> {
            (0..count)
                .map(|i| {
                    let transform = Transform::new(Vec3::new(i as f32, 0.0, 0.0), Quat::identity(), Vec3::new(1.0, 2.0, 1.0));
                    let mut obj = EnvObject::new(material.clone(), self.rock, transform);
                    obj.initialize(&self.models).expect("valid object");
                    obj
                })
                .collect()
        }

        fn draw(
            &mut self,
            backend: &mut RecordingBackend,
            batcher: &mut InstanceBatcher,
            objects: &[EnvObject],
            draw_type: DrawType,
        ) -> BatchStats {
            let pass = RenderPassConfig::for_backend(draw_type, &self.settings, backend);
            let shadows = [Mat4::identity(); 4];
            let ctx = DrawContext {
                pass: &pass,
                settings: &self.settings,
                frame: FrameUniforms {
                    proj_view: Mat4::identity(),
                    prev_proj_view: Mat4::identity(),
                    time: 1.0,
                    cam_pos: Vec3::zeros(),
                    shadow_matrices: Some(&shadows),
                },
                clusters: &self.clusters,
                decal_atlases: &self.atlases,
                color_snapshot: None,
            };
            let refs: Vec<&EnvObject> = objects.iter().collect();
            batcher
                .draw_instances(backend, &ctx, &mut self.models, &refs, draw_type)
                .expect("draw succeeds")
        }
    }

    fn rock_material() -> Arc<EnvMaterial> {
        Arc::new(EnvMaterial::new("Data/Objects/rock.xml", "envobject"))
    }

    #[test]
    fn test_splits_into_batches_of_256() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 300);

        let stats = fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);

        assert_eq!(backend.draws(), vec![(36, 256), (36, 44)]);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.instances, 300);
        assert_eq!(stats.shader_changes, 1);
    }

    #[test]
    fn test_uniform_block_packing() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 3);

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);

        let block = backend
            .calls()
            .iter()
            .find_map(|c| match c {
                BackendCall::WriteUniformBuffer { data, .. } if data.len() == 3 * INSTANCE_STRIDE => Some(data.clone()),
                _ => None,
            })
            .expect("instance block uploaded");
        let floats: &[f32] = bytemuck::cast_slice(&block);
        // second instance: scale at +0, rotation at +16 bytes, tint at +32
        assert_relative_eq!(floats[16], 1.0);
        assert_relative_eq!(floats[17], 2.0);
        assert_relative_eq!(floats[16 + 7], 1.0);
        assert_relative_eq!(floats[16 + 8], 1.0);
        assert_relative_eq!(floats[16 + 11], 0.0);

        let translations = backend.streams(InstanceStream::Translation);
        let first: &[f32] = bytemuck::cast_slice(&translations[0]);
        assert_eq!(first, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        assert!(backend.streams(InstanceStream::Scale).is_empty());
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::BindUniformRange { binding: UniformBinding::InstanceInfo, .. })));
    }

    #[test]
    fn test_attribute_instancing_fills_streams() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        backend.attrib_instancing = true;
        let mut batcher = InstanceBatcher::new();
        let mut objects = fixture.objects(&rock_material(), 2);
        objects[1].attached = true;

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);

        let tints = backend.streams(InstanceStream::Tint);
        let tints: &[f32] = bytemuck::cast_slice(&tints[0]);
        assert_relative_eq!(tints[3], 0.0);
        assert_relative_eq!(tints[7], -1.0);
        assert_eq!(backend.streams(InstanceStream::DetailScale).len(), 1);
        assert!(!backend.calls().iter().any(|c| matches!(c, BackendCall::BindUniformRange { .. })));
        assert!(backend.resolved_programs()[0].contains("#ATTRIB_ENVOBJ_INSTANCING"));
    }

    #[test]
    fn test_active_plant_bends_rotation() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        backend.attrib_instancing = true;
        let mut batcher = InstanceBatcher::new();
        let mut objects = fixture.objects(&rock_material(), 1);
        let mut plant = PlantComponent::new();
        plant.handle_collision(&Vec3::new(1.0, 0.0, 0.0), &Vec3::new(0.0, 0.0, 50.0));
        plant.update(0.1);
        objects[0].plant = Some(plant);

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);

        let rotations = backend.streams(InstanceStream::Rotation);
        let rotation: &[f32] = bytemuck::cast_slice(&rotations[0]);
        assert!(rotation[3] < 1.0);
    }

    #[test]
    fn test_shader_cache_skips_resolve() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 2);

        fixture.draw(&mut backend, &mut batcher, &objects[..1], DrawType::FullDraw);
        fixture.draw(&mut backend, &mut batcher, &objects[1..], DrawType::FullDraw);
        assert_eq!(backend.resolved_programs().len(), 1);

        batcher.reset_shader_cache();
        fixture.draw(&mut backend, &mut batcher, &objects[1..], DrawType::FullDraw);
        assert_eq!(backend.resolved_programs().len(), 2);
    }

    #[test]
    fn test_shadow_matrices_only_on_full_draw() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 1);

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);
        batcher.reset_shader_cache();
        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::DepthNoAA);

        let uniforms: Vec<bool> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::SetFrameUniforms { has_shadow_matrices } => Some(*has_shadow_matrices),
                _ => None,
            })
            .collect();
        assert_eq!(uniforms, vec![true, false]);
    }

    #[test]
    fn test_shader_string_flags() {
        let mut fixture = Fixture::new();
        fixture.settings.decal_normals = true;
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 1);

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::Decal);
        batcher.reset_shader_cache();
        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::Wireframe);

        let programs = backend.resolved_programs();
        assert!(programs[0].starts_with("envobject #DECAL #DECAL_NORMALS #ALPHA_TO_COVERAGE"));
        assert!(programs[1].starts_with("envobject #DECAL_NORMALS #WIREFRAME "));
        assert!(programs[1].contains("#DEPTH_ONLY"));
    }

    #[test]
    fn test_depth_only_skips_transparent() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let mut material = EnvMaterial::new("Data/Objects/glass.xml", "envobject");
        material.transparent = true;
        let objects = fixture.objects(&Arc::new(material), 2);

        let stats = fixture.draw(&mut backend, &mut batcher, &objects, DrawType::DepthOnly);
        assert_eq!(stats, BatchStats::default());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_draw_state_per_type() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let mut glass = EnvMaterial::new("Data/Objects/glass.xml", "envobject");
        glass.transparent = true;
        glass.double_sided = true;
        let glass = fixture.objects(&Arc::new(glass), 1);
        let rock = fixture.objects(&rock_material(), 1);

        fixture.draw(&mut backend, &mut batcher, &glass, DrawType::FullDraw);
        fixture.draw(&mut backend, &mut batcher, &rock, DrawType::Decal);

        let states: Vec<DrawState> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::SetDrawState(state) => Some(*state),
                _ => None,
            })
            .collect();
        assert!(!states[0].cull_face && !states[0].depth_write && !states[0].blend && !states[0].alpha_to_coverage);
        assert!(states[1].cull_face && !states[1].depth_write && states[1].blend && states[1].alpha_to_coverage);
    }

    #[test]
    fn test_missing_instance_block_draws_nothing() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        backend.programs_without_blocks.push("envobject".to_string());
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 4);

        let stats = fixture.draw(&mut backend, &mut batcher, &objects, DrawType::FullDraw);
        assert_eq!(stats.draw_calls, 0);
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_collision_pass_draws_one_at_a_time() {
        let mut fixture = Fixture::new();
        fixture.settings.draw_collision = true;
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let mut objects = fixture.objects(&rock_material(), 3);
        for obj in &mut objects {
            obj.refresh_normal_override(&mut backend, &fixture.models).expect("normals uploaded");
        }
        let normals: Vec<Option<TextureHandle>> = objects.iter().map(EnvObject::normal_override_buffer).collect();
        assert!(normals.iter().all(Option::is_some));
        backend.clear_calls();

        fixture.draw(&mut backend, &mut batcher, &objects, DrawType::Wireframe);
        assert_eq!(backend.draws(), vec![(36, 1), (36, 1), (36, 1)]);
        assert!(backend.resolved_programs()[0].contains(" #COLLISION #WIREFRAME "));

        // each draw reads the normals of its own object
        let mut bound = None;
        let mut drawn_with = Vec::new();
        for call in backend.calls() {
            match call {
                BackendCall::BindTexture(TextureSlot::LightDecalData, texture) => bound = Some(*texture),
                BackendCall::DrawElementsInstanced { .. } => drawn_with.push(bound.take()),
                _ => {}
            }
        }
        assert_eq!(drawn_with, normals);
    }

    #[test]
    fn test_collision_pass_skips_objects_without_collision_model() {
        let mut fixture = Fixture::new();
        fixture.settings.draw_collision = true;
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();

        let mut bush = EnvMaterial::new("Data/Objects/bush.xml", "plant");
        bush.bush_collision = true;
        let bushes = fixture.objects(&Arc::new(bush), 2);
        let mut ghost = EnvMaterial::new("Data/Objects/ghost.xml", "envobject");
        ghost.no_collision = true;
        let ghosts = fixture.objects(&Arc::new(ghost), 2);

        let stats = fixture.draw(&mut backend, &mut batcher, &bushes, DrawType::Wireframe);
        assert_eq!(stats, BatchStats::default());
        let stats = fixture.draw(&mut backend, &mut batcher, &ghosts, DrawType::Wireframe);
        assert_eq!(stats, BatchStats::default());
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_mesh_created_once_per_model() {
        let mut fixture = Fixture::new();
        let mut backend = RecordingBackend::new();
        let mut batcher = InstanceBatcher::new();
        let objects = fixture.objects(&rock_material(), 2);

        fixture.draw(&mut backend, &mut batcher, &objects[..1], DrawType::FullDraw);
        fixture.draw(&mut backend, &mut batcher, &objects[1..], DrawType::FullDraw);

        let created = backend.calls().iter().filter(|c| matches!(c, BackendCall::CreateMesh(_))).count();
        assert_eq!(created, 1);
    }
}
