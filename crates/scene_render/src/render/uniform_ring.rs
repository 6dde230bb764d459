//! Ring-buffered uniform uploads
//!
//! Each fill lands after the previous one so the GPU can still read last
//! frame's data while the CPU writes the next block. When the end of the
//! buffer is reached the write position wraps to zero.

use std::ops::Range;

use super::backend::{BackendResult, BufferHandle, RenderBackend, RenderError};

/// Size of the ring holding `ClusterInfo` blocks
pub const CLUSTER_INFO_RING_SIZE: usize = 128 * 1024;

/// Size of the ring holding per-instance uniform blocks
pub const INSTANCE_RING_SIZE: usize = 2 * 1024 * 1024;

/// A uniform buffer written as a ring
#[derive(Debug, Clone)]
pub struct UniformRing {
    size: usize,
    buffer: Option<BufferHandle>,
    offset: usize,
    next_offset: usize,
}

impl UniformRing {
    /// Create a ring of `size` bytes; the GPU buffer is created on first fill
    pub const fn new(size: usize) -> Self {
        Self {
            size,
            buffer: None,
            offset: 0,
            next_offset: 0,
        }
    }

    /// Capacity in bytes
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Backing buffer, once created
    pub const fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Byte range written by the most recent fill
    pub fn current_range(&self) -> Option<(BufferHandle, Range<usize>)> {
        self.buffer.map(|buffer| (buffer, self.offset..self.next_offset))
    }

    /// Append `data` to the ring and return the written range
    pub fn fill(&mut self, backend: &mut dyn RenderBackend, data: &[u8]) -> BackendResult<(BufferHandle, Range<usize>)> {
        if data.len() > self.size {
            return Err(RenderError::Backend(format!(
                "uniform upload of {} bytes exceeds ring size {}",
                data.len(),
                self.size
            )));
        }

        let buffer = match self.buffer {
            Some(buffer) => buffer,
            None => {
                let buffer = backend.create_uniform_buffer(self.size)?;
                log::info!("Created {} byte uniform ring", self.size);
                self.buffer = Some(buffer);
                buffer
            }
        };

        let align = backend.uniform_offset_alignment().max(1);
        let mut start = self.next_offset.next_multiple_of(align);
        if start + data.len() > self.size {
            start = 0;
        }

        backend.write_uniform_buffer(buffer, start, data)?;
        self.offset = start;
        self.next_offset = start + data.len();
        Ok((buffer, self.offset..self.next_offset))
    }
}
