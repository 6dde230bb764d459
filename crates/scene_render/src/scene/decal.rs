//! Projected box decals

use crate::cluster::gpu_types::ShaderDecal;
use crate::foundation::math::{utils, Mat4, Transform, Vec2, Vec3};

/// Special type tag of water drop decals, which fade out shortly after spawning
pub const SPECIAL_TYPE_WATER_DROP: u8 = 6;

/// Seconds a water drop decal stays alive
pub const WATER_DROP_LIFETIME: f32 = 2.0;

/// Color map of blood splats, the only dynamic decals merged when they clump
pub const BLOOD_SPLAT_COLOR_MAP: &str = "Data/Textures/bloodsplat_c.tga";

/// Rectangle inside a texture atlas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvRect {
    /// Top-left corner in atlas UV space
    pub start: Vec2,
    /// Extent in atlas UV space
    pub size: Vec2,
}

impl UvRect {
    /// Create a rectangle
    pub const fn new(start: Vec2, size: Vec2) -> Self {
        Self { start, size }
    }

    /// Pack as `(start.x, start.y, size.x, size.y)`
    pub fn to_array(&self) -> [f32; 4] {
        [self.start.x, self.start.y, self.size.x, self.size.y]
    }
}

/// Texture and definition file of a decal, compared when merging clumped blood
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DecalKind {
    /// Color texture path
    pub color_map: String,
    /// Decal definition file
    pub source_file: String,
}

/// A decal: a unit box (corners at +-0.5) under a world transform
#[derive(Debug, Clone, PartialEq)]
pub struct Decal {
    /// World transform; the scale is the box size
    pub transform: Transform,
    /// Tint color
    pub tint: Vec3,
    /// Overbright boost applied on top of the tint
    pub overbright: f32,
    /// Render time at spawn
    pub spawn_time: f32,
    /// Shader-side special type tag
    pub special_type: u8,
    /// Color atlas rectangle
    pub color_uv: UvRect,
    /// Normal atlas rectangle
    pub normal_uv: UvRect,
    /// Kind used when merging clumped dynamic decals
    pub kind: DecalKind,
    /// Disabled decals are skipped by clustering
    pub enabled: bool,
}

impl Default for Decal {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            tint: Vec3::new(1.0, 1.0, 1.0),
            overbright: 0.0,
            spawn_time: 0.0,
            special_type: 0,
            color_uv: UvRect::default(),
            normal_uv: UvRect::default(),
            kind: DecalKind::default(),
            enabled: true,
        }
    }
}

impl Decal {
    /// Create an enabled decal with the given transform
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// World scale (the box size)
    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Smallest scale component, used as the decal's radius
    pub fn radius(&self) -> f32 {
        utils::min_component(&self.transform.scale)
    }

    /// World matrix
    pub fn world_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// Tint with overbright applied
    pub fn combined_tint(&self) -> Vec3 {
        self.tint * (1.0 + self.overbright * 0.3)
    }

    /// Whether the decal has outlived its special-type lifetime at `now`
    pub fn is_expired(&self, now: f32) -> bool {
        self.special_type == SPECIAL_TYPE_WATER_DROP && now - self.spawn_time > WATER_DROP_LIFETIME
    }

    /// Build the GPU record; the normal rectangle is only written when requested
    pub fn to_shader(&self, with_normals: bool) -> ShaderDecal {
        let tint = self.combined_tint();
        let rotation = self.transform.rotation.coords;
        let position = self.transform.position;
        let scale = self.transform.scale;
        ShaderDecal {
            scale: [scale.x, scale.y, scale.z],
            spawn_time: self.spawn_time,
            rotation: [rotation.x, rotation.y, rotation.z, rotation.w],
            position: [position.x, position.y, position.z],
            _pad: 0.0,
            tint: [tint.x, tint.y, tint.z, f32::from(self.special_type) + 0.5],
            uv: self.color_uv.to_array(),
            normal_uv: if with_normals { self.normal_uv.to_array() } else { [0.0; 4] },
        }
    }
}
