//! Per-pass shader configuration
//!
//! Every static mesh shader string ends with a suffix of `#FLAG` tokens
//! that depends only on the pass type, the render settings and device
//! capabilities. [`RenderPassConfig`] computes it once per pass and is
//! handed to the batcher for every batch of that pass.

use crate::config::{RenderFeatures, RenderSettings};
use crate::render::backend::RenderBackend;

/// What a batch is being drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawType {
    /// Lit color pass
    FullDraw,
    /// Depth prepass
    DepthOnly,
    /// Shadow map without alpha to coverage
    DepthNoAA,
    /// All shadow cascades in one pass
    AllShadowCascades,
    /// Debug wireframe
    Wireframe,
    /// Decal-style blended draw
    Decal,
}

impl DrawType {
    /// Whether material, decal and light textures are bound
    pub const fn uses_textures(self) -> bool {
        !matches!(self, Self::DepthOnly | Self::DepthNoAA | Self::AllShadowCascades)
    }

    /// Whether this pass only writes depth
    pub const fn is_depth_only(self) -> bool {
        !self.uses_textures()
    }

    /// Whether cluster buffers are bound for this pass
    pub const fn binds_clusters(self) -> bool {
        matches!(self, Self::FullDraw | Self::Wireframe)
    }
}

/// Depth map pass requested by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthType {
    /// Depth prepass from the main camera
    PrePass,
    /// One shadow map
    Shadow,
    /// Every shadow cascade at once
    AllShadowCascades,
}

impl DepthType {
    /// Draw type used for static meshes in this pass
    pub const fn draw_type(self) -> DrawType {
        match self {
            Self::PrePass => DrawType::DepthOnly,
            Self::Shadow => DrawType::DepthNoAA,
            Self::AllShadowCascades => DrawType::AllShadowCascades,
        }
    }
}

/// How many base batches fit in one uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchMultiplier {
    /// 256 instances
    X1,
    /// 512 instances
    X2,
    /// 1024 instances
    X4,
    /// 2048 instances
    X8,
}

impl BatchMultiplier {
    /// Pick the largest multiplier the device's uniform blocks can hold
    pub const fn from_max_ubo_size(max_ubo_size: usize) -> Self {
        if max_ubo_size >= 131_072 {
            Self::X8
        } else if max_ubo_size >= 65_536 {
            Self::X4
        } else if max_ubo_size >= 32_768 {
            Self::X2
        } else {
            Self::X1
        }
    }

    /// Numeric factor
    pub const fn factor(self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }

    const fn shader_flag(self) -> Option<&'static str> {
        match self {
            Self::X1 => None,
            Self::X2 => Some("#UBO_BATCH_SIZE_2X"),
            Self::X4 => Some("#UBO_BATCH_SIZE_4X"),
            Self::X8 => Some("#UBO_BATCH_SIZE_8X"),
        }
    }
}

/// Shader suffix and batching choices for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassConfig {
    draw_type: DrawType,
    features: RenderFeatures,
    multiplier: BatchMultiplier,
    attrib_instancing: bool,
    suffix: String,
}

impl RenderPassConfig {
    /// Build the configuration for `draw_type`
    pub fn new(draw_type: DrawType, settings: &RenderSettings, max_ubo_size: usize, attrib_supported: bool) -> Self {
        let features = settings.features();
        let multiplier = if features.contains(RenderFeatures::FORCE_UBO_BATCH_1X) {
            BatchMultiplier::X1
        } else {
            BatchMultiplier::from_max_ubo_size(max_ubo_size)
        };
        let attrib_instancing = attrib_supported && features.contains(RenderFeatures::ATTRIB_INSTANCING);

        let mut flags: Vec<&str> = Vec::new();
        if draw_type == DrawType::FullDraw {
            if features.contains(RenderFeatures::SIMPLE_SHADOWS) || !features.contains(RenderFeatures::LEVEL_SHADOWS) {
                flags.push("#SIMPLE_SHADOW");
            }
            let full_draw_flags = [
                (RenderFeatures::LIGHT_PROBES, "#CAN_USE_LIGHT_PROBES"),
                (RenderFeatures::ALBEDO_ONLY, "#ALBEDO_ONLY"),
                (RenderFeatures::SIMPLE_WATER, "#SIMPLE_WATER"),
                (RenderFeatures::DISABLE_FOG, "#DISABLE_FOG"),
                (RenderFeatures::NO_REFLECTION_CAPTURE, "#NO_REFLECTION_CAPTURE"),
                (RenderFeatures::NO_DETAILMAPS, "#NO_DETAILMAPS"),
                (RenderFeatures::NO_DECALS, "#NO_DECALS"),
                (RenderFeatures::SSAO, "#SSAO_TEST"),
                (RenderFeatures::VOLUME_SHADOWS, "#VOLUME_SHADOWS"),
            ];
            flags.extend(full_draw_flags.iter().filter(|(f, _)| features.contains(*f)).map(|(_, s)| *s));
        }

        flags.extend(multiplier.shader_flag());
        if attrib_instancing {
            flags.push("#ATTRIB_ENVOBJ_INSTANCING");
        }
        if features.contains(RenderFeatures::ALPHA_TO_COVERAGE)
            && !matches!(draw_type, DrawType::DepthNoAA | DrawType::AllShadowCascades)
        {
            flags.push("#ALPHA_TO_COVERAGE");
        }
        if draw_type != DrawType::FullDraw {
            flags.push("#DEPTH_ONLY #NO_INSTANCE_ID");
        }
        if draw_type == DrawType::AllShadowCascades {
            flags.push("#SHADOW_CASCADE");
        }
        if features.contains(RenderFeatures::LIGHT_VOLUME_3D_TEX) {
            flags.push("#CAN_USE_3D_TEX");
        }
        if !settings.outputs_velocity() {
            flags.push("#NO_VELOCITY_BUF");
        }
        if features.contains(RenderFeatures::CUSTOM_LEVEL_SHADERS) && !settings.custom_shader.is_empty() {
            flags.push(&settings.custom_shader);
        }
        if features.contains(RenderFeatures::SIMPLE_FOG) {
            flags.push("#SIMPLE_FOG");
        }

        let suffix = flags.join(" ").trim_start().to_string();
        log::debug!("{draw_type:?} pass suffix: '{suffix}' (batch {:?})", multiplier);

        Self {
            draw_type,
            features,
            multiplier,
            attrib_instancing,
            suffix,
        }
    }

    /// Build the configuration using the backend's capabilities
    pub fn for_backend(draw_type: DrawType, settings: &RenderSettings, backend: &dyn RenderBackend) -> Self {
        Self::new(
            draw_type,
            settings,
            backend.max_uniform_block_size(),
            backend.supports_attrib_instancing(),
        )
    }

    /// Pass type
    pub const fn draw_type(&self) -> DrawType {
        self.draw_type
    }

    /// Settings toggles this pass was built from
    pub const fn features(&self) -> RenderFeatures {
        self.features
    }

    /// Effective batch multiplier
    pub const fn multiplier(&self) -> BatchMultiplier {
        self.multiplier
    }

    /// Per-instance data goes through vertex attributes instead of a uniform block
    pub const fn attrib_instancing(&self) -> bool {
        self.attrib_instancing
    }

    /// Suffix appended to every shader name in this pass
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}
