//! Backend abstraction trait for the clustered renderer
//!
//! The cluster builder, the instance batcher and the scene orchestration
//! talk to the GPU only through [`RenderBackend`]. Resources are referred
//! to by opaque handles; the backend owns the real objects.

use std::ops::Range;

use crate::foundation::math::{Mat4, Vec3};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Errors reported by a rendering backend
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A GPU resource could not be created
    #[error("Failed to create {0}")]
    ResourceCreation(String),

    /// Shader program could not be compiled or found
    #[error("Shader program not found: {0}")]
    ShaderNotFound(String),

    /// A uniform block declared by a shader disagrees with the CPU struct
    #[error("Uniform block '{block}' size mismatch: expected {expected} bytes, shader declares {actual}")]
    UniformBlockMismatch {
        /// Block name
        block: String,
        /// Size of the CPU-side struct
        expected: usize,
        /// Size reported by shader reflection
        actual: usize,
    },

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture or buffer texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a model's vertex/index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Texture units used by object shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Material color map
    Color,
    /// Material normal map
    Normal,
    /// Decal color atlas
    DecalColor,
    /// Decal normal atlas
    DecalNormal,
    /// Combined decal + light record buffer
    LightDecalData,
    /// Cluster lookup + index buffer
    ClusterBuffer,
    /// Color snapshot sampled by transparent objects
    ScreenColorSnapshot,
}

/// Uniform buffer binding points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBinding {
    /// Per-instance data for uniform-block instancing
    InstanceInfo,
    /// Per-frame cluster info
    ClusterData,
}

/// Texel format of a buffer texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTextureFormat {
    /// One 32-bit unsigned integer per texel
    R32Uint,
    /// Three floats per texel
    Rgb32Float,
    /// Four floats per texel
    Rgba32Float,
}

/// Per-instance vertex attribute streams (divisor 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceStream {
    /// vec3 world translation
    Translation,
    /// vec3 scale
    Scale,
    /// vec4 rotation quaternion
    Rotation,
    /// vec4 display tint
    Tint,
    /// vec4 detail map scale
    DetailScale,
}

/// Rasterizer polygon mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Filled triangles
    Fill,
    /// Wireframe
    Line,
}

/// Fixed-function state for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawState {
    /// Back-face culling
    pub cull_face: bool,
    /// Depth testing
    pub depth_test: bool,
    /// Depth writes
    pub depth_write: bool,
    /// Alpha blending
    pub blend: bool,
    /// Multisample alpha-to-coverage
    pub alpha_to_coverage: bool,
}

/// Uniforms set once per shader switch
#[derive(Debug, Clone, Copy)]
pub struct FrameUniforms<'a> {
    /// Projection * view of the current frame
    pub proj_view: Mat4,
    /// Projection * view of the previous frame, for velocity output
    pub prev_proj_view: Mat4,
    /// Render time in seconds
    pub time: f32,
    /// Camera world position
    pub cam_pos: Vec3,
    /// Shadow cascade matrices (full draws only)
    pub shadow_matrices: Option<&'a [Mat4]>,
}

/// GPU operations needed by clustering and static-mesh batching
pub trait RenderBackend {
    /// Largest uniform block the device supports, in bytes
    fn max_uniform_block_size(&self) -> usize;

    /// Whether per-instance vertex attributes (divisor 1) are available
    fn supports_attrib_instancing(&self) -> bool;

    /// Required alignment of uniform buffer range offsets
    fn uniform_offset_alignment(&self) -> usize;

    /// Compile or fetch the program for a full shader string
    fn resolve_program(&mut self, shader: &str) -> BackendResult<ProgramHandle>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle);

    /// Reflected size of a uniform block, or `None` if the program lacks it
    fn uniform_block_size(&self, program: ProgramHandle, block: &str) -> Option<usize>;

    /// Set per-frame uniforms on the current program
    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms<'_>);

    /// Bind a texture to a slot of the current program
    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle);

    /// Create an empty buffer texture
    fn create_buffer_texture(&mut self, format: BufferTextureFormat) -> BackendResult<TextureHandle>;

    /// Replace the contents of a buffer texture
    fn update_buffer_texture(&mut self, texture: TextureHandle, data: &[u8]) -> BackendResult<()>;

    /// Create a uniform buffer of `size` bytes
    fn create_uniform_buffer(&mut self, size: usize) -> BackendResult<BufferHandle>;

    /// Write `data` into a uniform buffer at `offset`
    fn write_uniform_buffer(&mut self, buffer: BufferHandle, offset: usize, data: &[u8]) -> BackendResult<()>;

    /// Bind a byte range of a uniform buffer to a named block of `program`
    fn bind_uniform_range(
        &mut self,
        program: ProgramHandle,
        block: &str,
        binding: UniformBinding,
        buffer: BufferHandle,
        range: Range<usize>,
    );

    /// Upload a model's vertex and index data
    fn create_mesh(&mut self, path: &str, index_count: u32) -> BackendResult<MeshHandle>;

    /// Bind a model's buffers for drawing
    fn bind_mesh(&mut self, mesh: MeshHandle);

    /// Upload one per-instance attribute stream for the next draw
    fn fill_instance_stream(&mut self, stream: InstanceStream, data: &[u8]) -> BackendResult<()>;

    /// Apply fixed-function state
    fn set_draw_state(&mut self, state: &DrawState);

    /// Switch polygon fill mode
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Instanced indexed draw of the bound mesh
    fn draw_elements_instanced(&mut self, index_count: u32, instance_count: u32) -> BackendResult<()>;

    /// Copy the current color target into the snapshot texture read by transparent shaders
    fn copy_color_snapshot(&mut self) -> BackendResult<()>;
}
