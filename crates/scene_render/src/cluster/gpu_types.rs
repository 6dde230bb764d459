//! GPU-side record layouts
//!
//! These structs must match the shader declarations byte for byte. Sizes
//! are checked at compile time below.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Mat4;

/// One decal record in the combined light/decal data buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderDecal {
    /// Non-uniform world scale
    pub scale: [f32; 3],
    /// Render time at which the decal was spawned
    pub spawn_time: f32,
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    /// World position
    pub position: [f32; 3],
    /// Padding
    pub _pad: f32,
    /// Tint rgb; alpha carries the special type tag plus 0.5
    pub tint: [f32; 4],
    /// Color atlas rectangle (start.xy, size.xy)
    pub uv: [f32; 4],
    /// Normal atlas rectangle (start.xy, size.xy)
    pub normal_uv: [f32; 4],
}

impl ShaderDecal {
    /// Size in bytes
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Stride in floats
    pub const FLOATS: usize = Self::SIZE / std::mem::size_of::<f32>();
}

/// One point light record in the combined light/decal data buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderLight {
    /// World position
    pub position: [f32; 3],
    /// Half of the light radius
    pub radius: f32,
    /// Linear color, overbright already applied
    pub color: [f32; 3],
    /// Padding
    pub _pad: f32,
}

impl ShaderLight {
    /// Size in bytes
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Stride in floats
    pub const FLOATS: usize = Self::SIZE / std::mem::size_of::<f32>();
}

/// Per-frame `ClusterInfo` uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderClusterInfo {
    /// Grid width, height and depth slice count
    pub grid_size: [u32; 3],
    /// Alive decals this frame
    pub num_decals: u32,
    /// Alive lights this frame
    pub num_lights: u32,
    /// Word offset of the light index list in the cluster buffer
    pub light_cluster_data_offset: u32,
    /// Offset of the first light record in the data buffer, in vec4 units
    pub light_data_offset: u32,
    /// Cluster width in pixels
    pub cluster_width: u32,
    /// Inverse projection matrix, column major
    pub inv_proj_mat: [f32; 16],
    /// Viewport x, y, width, height
    pub viewport: [f32; 4],
    /// Near plane distance
    pub z_near: f32,
    /// Logarithmic depth multiplier
    pub z_mult: f32,
    /// Padding
    pub _pad3: f32,
    /// Padding
    pub _pad4: f32,
}

impl ShaderClusterInfo {
    /// Size in bytes; shader reflection must report the same block size
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Name of the uniform block in object shaders
    pub const BLOCK_NAME: &'static str = "ClusterInfo";

    /// Copy a matrix into the column-major layout the shader expects
    pub fn matrix_columns(matrix: &Mat4) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(matrix.as_slice());
        out
    }
}

const _: () = assert!(ShaderDecal::SIZE == (12 + 4 + 4 + 4) * 4);
const _: () = assert!(ShaderLight::SIZE == 8 * 4);
const _: () = assert!(ShaderClusterInfo::SIZE == (8 * 4) * 4);
const _: () = assert!(ShaderDecal::SIZE % 16 == 0);
