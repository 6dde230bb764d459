//! Backend that records every call, for tests
//!
//! Programs are resolved by name; every program reports the block sizes
//! configured in `block_sizes` unless its shader string is listed in
//! `programs_without_blocks`.

use std::collections::HashMap;
use std::ops::Range;

use super::backend::{
    BackendResult, BufferHandle, BufferTextureFormat, DrawState, FrameUniforms, InstanceStream,
    MeshHandle, PolygonMode, ProgramHandle, RenderBackend, RenderError, TextureHandle, TextureSlot,
    UniformBinding,
};
use crate::cluster::gpu_types::ShaderClusterInfo;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    ResolveProgram(String),
    UseProgram(ProgramHandle),
    SetFrameUniforms { has_shadow_matrices: bool },
    BindTexture(TextureSlot, TextureHandle),
    CreateBufferTexture(BufferTextureFormat),
    UpdateBufferTexture { texture: TextureHandle, len: usize },
    CreateUniformBuffer { size: usize },
    WriteUniformBuffer { buffer: BufferHandle, offset: usize, data: Vec<u8> },
    BindUniformRange { block: String, binding: UniformBinding, range: Range<usize> },
    CreateMesh(String),
    BindMesh(MeshHandle),
    FillInstanceStream { stream: InstanceStream, data: Vec<u8> },
    SetDrawState(DrawState),
    SetPolygonMode(PolygonMode),
    DrawElementsInstanced { index_count: u32, instance_count: u32 },
    CopyColorSnapshot,
}

/// Recording implementation of [`RenderBackend`]
#[derive(Debug)]
pub struct RecordingBackend {
    pub max_ubo_size: usize,
    pub attrib_instancing: bool,
    pub uniform_alignment: usize,
    pub block_sizes: HashMap<String, usize>,
    pub programs_without_blocks: Vec<String>,
    programs: Vec<String>,
    next_handle: u64,
    calls: Vec<BackendCall>,
    pub buffer_textures: HashMap<TextureHandle, Vec<u8>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        let mut block_sizes = HashMap::new();
        block_sizes.insert(ShaderClusterInfo::BLOCK_NAME.to_string(), ShaderClusterInfo::SIZE);
        block_sizes.insert("InstanceInfo".to_string(), 64 * 256);
        Self {
            max_ubo_size: 16384,
            attrib_instancing: false,
            uniform_alignment: 256,
            block_sizes,
            programs_without_blocks: Vec::new(),
            programs: Vec::new(),
            next_handle: 1,
            calls: Vec::new(),
            buffer_textures: HashMap::new(),
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn program_name(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(program.0 as usize).map(String::as_str)
    }

    pub fn resolved_programs(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::ResolveProgram(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::DrawElementsInstanced { index_count, instance_count } => Some((*index_count, *instance_count)),
                _ => None,
            })
            .collect()
    }

    pub fn streams(&self, wanted: InstanceStream) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::FillInstanceStream { stream, data } if *stream == wanted => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl RenderBackend for RecordingBackend {
    fn max_uniform_block_size(&self) -> usize {
        self.max_ubo_size
    }

    fn supports_attrib_instancing(&self) -> bool {
        self.attrib_instancing
    }

    fn uniform_offset_alignment(&self) -> usize {
        self.uniform_alignment
    }

    fn resolve_program(&mut self, shader: &str) -> BackendResult<ProgramHandle> {
        self.calls.push(BackendCall::ResolveProgram(shader.to_string()));
        if shader.trim().is_empty() {
            return Err(RenderError::ShaderNotFound(shader.to_string()));
        }
        let index = match self.programs.iter().position(|p| p == shader) {
            Some(index) => index,
            None => {
                self.programs.push(shader.to_string());
                self.programs.len() - 1
            }
        };
        Ok(ProgramHandle(index as u64))
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn uniform_block_size(&self, program: ProgramHandle, block: &str) -> Option<usize> {
        let name = self.program_name(program)?;
        if self.programs_without_blocks.iter().any(|p| name.starts_with(p.as_str())) {
            return None;
        }
        self.block_sizes.get(block).copied()
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms<'_>) {
        self.calls.push(BackendCall::SetFrameUniforms {
            has_shadow_matrices: uniforms.shadow_matrices.is_some(),
        });
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle) {
        self.calls.push(BackendCall::BindTexture(slot, texture));
    }

    fn create_buffer_texture(&mut self, format: BufferTextureFormat) -> BackendResult<TextureHandle> {
        self.calls.push(BackendCall::CreateBufferTexture(format));
        Ok(TextureHandle(self.handle()))
    }

    fn update_buffer_texture(&mut self, texture: TextureHandle, data: &[u8]) -> BackendResult<()> {
        self.calls.push(BackendCall::UpdateBufferTexture { texture, len: data.len() });
        self.buffer_textures.insert(texture, data.to_vec());
        Ok(())
    }

    fn create_uniform_buffer(&mut self, size: usize) -> BackendResult<BufferHandle> {
        self.calls.push(BackendCall::CreateUniformBuffer { size });
        Ok(BufferHandle(self.handle()))
    }

    fn write_uniform_buffer(&mut self, buffer: BufferHandle, offset: usize, data: &[u8]) -> BackendResult<()> {
        self.calls.push(BackendCall::WriteUniformBuffer { buffer, offset, data: data.to_vec() });
        Ok(())
    }

    fn bind_uniform_range(
        &mut self,
        _program: ProgramHandle,
        block: &str,
        binding: UniformBinding,
        _buffer: BufferHandle,
        range: Range<usize>,
    ) {
        self.calls.push(BackendCall::BindUniformRange { block: block.to_string(), binding, range });
    }

    fn create_mesh(&mut self, path: &str, _index_count: u32) -> BackendResult<MeshHandle> {
        self.calls.push(BackendCall::CreateMesh(path.to_string()));
        Ok(MeshHandle(self.handle()))
    }

    fn bind_mesh(&mut self, mesh: MeshHandle) {
        self.calls.push(BackendCall::BindMesh(mesh));
    }

    fn fill_instance_stream(&mut self, stream: InstanceStream, data: &[u8]) -> BackendResult<()> {
        self.calls.push(BackendCall::FillInstanceStream { stream, data: data.to_vec() });
        Ok(())
    }

    fn set_draw_state(&mut self, state: &DrawState) {
        self.calls.push(BackendCall::SetDrawState(*state));
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.calls.push(BackendCall::SetPolygonMode(mode));
    }

    fn draw_elements_instanced(&mut self, index_count: u32, instance_count: u32) -> BackendResult<()> {
        self.calls.push(BackendCall::DrawElementsInstanced { index_count, instance_count });
        Ok(())
    }

    fn copy_color_snapshot(&mut self) -> BackendResult<()> {
        self.calls.push(BackendCall::CopyColorSnapshot);
        Ok(())
    }
}
