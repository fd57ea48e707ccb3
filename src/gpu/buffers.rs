// SPDX-License-Identifier: AGPL-3.0-only

//! GPU buffer creation, upload, and readback.
//!
//! All training data is plain bytes on the wire: splat records and
//! gradients are 64-byte Pod structs, images are `vec4<f32>` arrays,
//! so every helper here works on byte slices and call sites cast with
//! `bytemuck`.

use super::GpuContext;
use crate::error::SplatForgeError;

impl GpuContext {
    /// Create a storage buffer initialized from bytes.
    #[must_use]
    pub fn create_storage_init(&self, contents: &[u8], label: &str) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Create a zeroed storage buffer of `size` bytes.
    #[must_use]
    pub fn create_storage(&self, size: u64, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Create a staging buffer for reading results back to the CPU.
    #[must_use]
    pub fn create_staging(&self, size: u64, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload bytes to a GPU buffer (overwrites from offset 0). The
    /// write is ordered before any subsequently submitted work.
    pub fn upload(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        self.queue().write_buffer(buffer, 0, bytes);
    }

    /// Read back a storage buffer via a one-shot staging copy.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if mapping fails.
    pub fn read_back(&self, buffer: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, SplatForgeError> {
        let staging = self.create_staging(size, "readback");
        let mut encoder = self
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue().submit(std::iter::once(encoder.finish()));
        self.read_staging(&staging)
    }

    /// Read bytes from a staging buffer after the submit that filled it.
    ///
    /// Blocks on `poll(Maintain::Wait)` until the map callback fires.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if the map callback fails
    /// or the channel is dropped.
    pub fn read_staging(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>, SplatForgeError> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| {
                SplatForgeError::GpuCompute("GPU map callback: channel recv failed".into())
            })?
            .map_err(|e| SplatForgeError::GpuCompute(format!("GPU buffer mapping: {e}")))?;

        let data = slice.get_mapped_range();
        let result = data.to_vec();
        drop(data);
        staging.unmap();
        Ok(result)
    }
}
