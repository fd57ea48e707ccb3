// SPDX-License-Identifier: AGPL-3.0-only

//! Buffer set for a training run.
//!
//! Everything is allocated once up front: per-iteration work only
//! uploads params, zeroes gradients, dispatches, and reads the two
//! staging buffers. No allocation happens inside the training loop.

use std::mem::size_of;

use crate::gpu::GpuContext;
use crate::image::Image;
use crate::splat::GaussianParam;

/// Byte sizes and GPU buffers for one training configuration.
pub(crate) struct TrainResources {
    /// Splat records, uploaded every iteration. `n * 64` bytes.
    pub params: wgpu::Buffer,
    /// Fixed-point gradient lanes, zeroed every iteration. `n * 64` bytes.
    pub grads: wgpu::Buffer,
    /// Rendered RGBA image, `pixels * 16` bytes.
    pub rendered: wgpu::Buffer,
    /// Target RGBA image, uploaded once.
    pub target: wgpu::Buffer,
    /// Per-pixel loss, `pixels * 4` bytes.
    pub loss: wgpu::Buffer,
    /// Staging mirrors for readback.
    pub grads_staging: wgpu::Buffer,
    pub loss_staging: wgpu::Buffer,
    pub rendered_staging: wgpu::Buffer,
    pub grads_size: u64,
    pub loss_size: u64,
    pub rendered_size: u64,
}

impl TrainResources {
    pub(crate) fn allocate(gpu: &GpuContext, splat_count: usize, target: &Image) -> Self {
        let splat_bytes = (splat_count * size_of::<GaussianParam>()) as u64;
        let pixel_count = target.pixel_count();
        let rendered_size = (pixel_count * size_of::<[f32; 4]>()) as u64;
        let loss_size = (pixel_count * size_of::<f32>()) as u64;

        Self {
            params: gpu.create_storage(splat_bytes, "splat params"),
            grads: gpu.create_storage(splat_bytes, "splat grads"),
            rendered: gpu.create_storage(rendered_size, "rendered image"),
            target: gpu.create_storage_init(bytemuck::cast_slice(&target.pixels), "target image"),
            loss: gpu.create_storage(loss_size, "loss map"),
            grads_staging: gpu.create_staging(splat_bytes, "grads staging"),
            loss_staging: gpu.create_staging(loss_size, "loss staging"),
            rendered_staging: gpu.create_staging(rendered_size, "rendered staging"),
            grads_size: splat_bytes,
            loss_size,
            rendered_size,
        }
    }
}
