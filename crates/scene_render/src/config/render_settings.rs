//! # Render Settings
//!
//! Tunables for clustering and static-mesh batching. Every field has a
//! serde default so partial TOML/RON files are accepted.
//!
//! ## Example (TOML)
//!
//! ```toml
//! cluster_size = 64
//! num_z_clusters = 24
//! decal_normals = true
//! ```

use serde::{Deserialize, Serialize};

use super::Config;

bitflags::bitflags! {
    /// Boolean render toggles folded into one set for shader-suffix generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFeatures: u32 {
        const SIMPLE_SHADOWS = 1 << 0;
        const LEVEL_SHADOWS = 1 << 1;
        const LIGHT_PROBES = 1 << 2;
        const ALBEDO_ONLY = 1 << 3;
        const SIMPLE_WATER = 1 << 4;
        const DISABLE_FOG = 1 << 5;
        const NO_REFLECTION_CAPTURE = 1 << 6;
        const NO_DETAILMAPS = 1 << 7;
        const NO_DECALS = 1 << 8;
        const SSAO = 1 << 9;
        const VOLUME_SHADOWS = 1 << 10;
        const ALPHA_TO_COVERAGE = 1 << 11;
        const LIGHT_VOLUME_3D_TEX = 1 << 12;
        const SIMPLE_FOG = 1 << 13;
        const CUSTOM_LEVEL_SHADERS = 1 << 14;
        const DECAL_NORMALS = 1 << 15;
        const FORCE_UBO_BATCH_1X = 1 << 16;
        const ATTRIB_INSTANCING = 1 << 17;
        const DRAW_COLLISION = 1 << 18;
        const NO_DECAL_ELEMENTS = 1 << 19;
    }
}

/// Settings consumed by the cluster builder, the pass configuration and the batcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Cluster width and height in pixels
    pub cluster_size: u32,
    /// Number of logarithmic depth slices
    pub num_z_clusters: u32,
    /// Upload decal normal-atlas UVs and bind the normal atlas
    pub decal_normals: bool,
    /// Use the static shadow map instead of cascades
    pub simple_shadows: bool,
    /// The level provides cascaded shadows
    pub level_shadows: bool,
    /// Light probes are loaded and uploaded
    pub light_probes_available: bool,
    /// The light volume 3D texture is valid
    pub light_volume_3d_tex: bool,
    /// Debug: render albedo only
    pub albedo_only: bool,
    /// Cheap water path; transparent objects also write depth
    pub simple_water: bool,
    /// Disable fog in shaders
    pub disable_fog: bool,
    /// Skip reflection capture sampling
    pub no_reflection_capture: bool,
    /// Skip detail maps
    pub no_detailmaps: bool,
    /// Skip decal sampling in object shaders
    pub no_decals: bool,
    /// Screen-space ambient occlusion test path
    pub ssao: bool,
    /// Volumetric shadows
    pub volume_shadows: bool,
    /// Multisampled alpha-to-coverage for cutout materials
    pub use_sample_alpha_to_coverage: bool,
    /// Motion blur strength; velocity output is disabled at or below 0.01
    pub motion_blur_amount: f32,
    /// Simple fog model
    pub simple_fog: bool,
    /// Allow levels to append their own shader flags
    pub custom_level_shaders: bool,
    /// Shader flags supplied by the current level
    pub custom_shader: String,
    /// Always batch 256 instances regardless of uniform block limits
    pub ubo_batch_multiplier_force_1x: bool,
    /// Prefer vertex attribute instancing when the backend supports it
    pub attrib_instancing_enabled: bool,
    /// Draw collision meshes as wireframe after the opaque pass
    pub draw_collision: bool,
    /// Debug: cluster nothing
    pub no_decal_elements: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cluster_size: 128,
            num_z_clusters: 16,
            decal_normals: false,
            simple_shadows: false,
            level_shadows: true,
            light_probes_available: false,
            light_volume_3d_tex: false,
            albedo_only: false,
            simple_water: false,
            disable_fog: false,
            no_reflection_capture: false,
            no_detailmaps: false,
            no_decals: false,
            ssao: false,
            volume_shadows: false,
            use_sample_alpha_to_coverage: true,
            motion_blur_amount: 0.0,
            simple_fog: false,
            custom_level_shaders: false,
            custom_shader: String::new(),
            ubo_batch_multiplier_force_1x: false,
            attrib_instancing_enabled: true,
            draw_collision: false,
            no_decal_elements: false,
        }
    }
}

impl Config for RenderSettings {}

impl RenderSettings {
    /// Fold the boolean toggles into a [`RenderFeatures`] set
    pub fn features(&self) -> RenderFeatures {
        let toggles = [
            (self.simple_shadows, RenderFeatures::SIMPLE_SHADOWS),
            (self.level_shadows, RenderFeatures::LEVEL_SHADOWS),
            (self.light_probes_available, RenderFeatures::LIGHT_PROBES),
            (self.albedo_only, RenderFeatures::ALBEDO_ONLY),
            (self.simple_water, RenderFeatures::SIMPLE_WATER),
            (self.disable_fog, RenderFeatures::DISABLE_FOG),
            (self.no_reflection_capture, RenderFeatures::NO_REFLECTION_CAPTURE),
            (self.no_detailmaps, RenderFeatures::NO_DETAILMAPS),
            (self.no_decals, RenderFeatures::NO_DECALS),
            (self.ssao, RenderFeatures::SSAO),
            (self.volume_shadows, RenderFeatures::VOLUME_SHADOWS),
            (self.use_sample_alpha_to_coverage, RenderFeatures::ALPHA_TO_COVERAGE),
            (self.light_volume_3d_tex, RenderFeatures::LIGHT_VOLUME_3D_TEX),
            (self.simple_fog, RenderFeatures::SIMPLE_FOG),
            (self.custom_level_shaders, RenderFeatures::CUSTOM_LEVEL_SHADERS),
            (self.decal_normals, RenderFeatures::DECAL_NORMALS),
            (self.ubo_batch_multiplier_force_1x, RenderFeatures::FORCE_UBO_BATCH_1X),
            (self.attrib_instancing_enabled, RenderFeatures::ATTRIB_INSTANCING),
            (self.draw_collision, RenderFeatures::DRAW_COLLISION),
            (self.no_decal_elements, RenderFeatures::NO_DECAL_ELEMENTS),
        ];

        toggles
            .iter()
            .filter(|(enabled, _)| *enabled)
            .fold(RenderFeatures::empty(), |acc, (_, flag)| acc | *flag)
    }

    /// Whether object shaders should output a velocity buffer
    pub fn outputs_velocity(&self) -> bool {
        self.motion_blur_amount > 0.01
    }
}
