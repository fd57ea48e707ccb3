// SPDX-License-Identifier: AGPL-3.0-only

//! Per-iteration command encoding and readback.
//!
//! One iteration is a single command buffer: render pass, loss pass,
//! backward pass, then copies of the gradient and loss buffers into
//! their staging mirrors. Compute pass boundaries order the kernels —
//! the loss and backward passes see the fully rendered image, and the
//! copies see the fully accumulated gradients. One submit, one wait,
//! two mapped reads.

use crate::error::SplatForgeError;
use crate::gpu::{ComputeKernel, GpuContext};
use crate::shaders::WORKGROUP_EDGE;
use crate::splat::GaussianGradInt;

use super::resources::TrainResources;

/// Push constants for the render and backward kernels.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ImagePush {
    pub width: u32,
    pub height: u32,
    pub splat_count: u32,
}

/// Push constants for the loss kernel.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LossPush {
    pub width: u32,
    pub height: u32,
}

pub(crate) struct IterationOutput {
    pub grads: Vec<GaussianGradInt>,
    pub total_loss: f32,
}

/// Encode, submit, and read back one full training iteration.
///
/// Caller has already uploaded the current params and zeroed the
/// gradient buffer for this iteration.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_iteration(
    gpu: &GpuContext,
    render: &ComputeKernel,
    loss: &ComputeKernel,
    backward: &ComputeKernel,
    res: &TrainResources,
    width: u32,
    height: u32,
    splat_count: u32,
) -> Result<IterationOutput, SplatForgeError> {
    let wg = crate::gpu::image_workgroups(width, height, WORKGROUP_EDGE);
    let image_push = ImagePush {
        width,
        height,
        splat_count,
    };
    let loss_push = LossPush { width, height };

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("training iteration"),
        });
    render.encode_pass(&mut encoder, bytemuck::bytes_of(&image_push), wg)?;
    loss.encode_pass(&mut encoder, bytemuck::bytes_of(&loss_push), wg)?;
    backward.encode_pass(&mut encoder, bytemuck::bytes_of(&image_push), wg)?;
    encoder.copy_buffer_to_buffer(&res.grads, 0, &res.grads_staging, 0, res.grads_size);
    encoder.copy_buffer_to_buffer(&res.loss, 0, &res.loss_staging, 0, res.loss_size);
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let grad_bytes = gpu.read_staging(&res.grads_staging)?;
    let loss_bytes = gpu.read_staging(&res.loss_staging)?;
    let grads: Vec<GaussianGradInt> = bytemuck::cast_slice(&grad_bytes).to_vec();
    let total_loss = bytemuck::cast_slice::<u8, f32>(&loss_bytes).iter().sum();

    Ok(IterationOutput { grads, total_loss })
}

/// Encode and submit a render-only pass, then read the image back.
pub(crate) fn run_render(
    gpu: &GpuContext,
    render: &ComputeKernel,
    res: &TrainResources,
    width: u32,
    height: u32,
    splat_count: u32,
) -> Result<Vec<[f32; 4]>, SplatForgeError> {
    let wg = crate::gpu::image_workgroups(width, height, WORKGROUP_EDGE);
    let push = ImagePush {
        width,
        height,
        splat_count,
    };
    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render only"),
        });
    render.encode_pass(&mut encoder, bytemuck::bytes_of(&push), wg)?;
    encoder.copy_buffer_to_buffer(&res.rendered, 0, &res.rendered_staging, 0, res.rendered_size);
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let bytes = gpu.read_staging(&res.rendered_staging)?;
    Ok(bytemuck::cast_slice(&bytes).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn push_blocks_fit_device_budget() {
        assert!(size_of::<ImagePush>() as u32 <= crate::gpu::MAX_PUSH_CONSTANT_SIZE);
        assert!(size_of::<LossPush>() as u32 <= crate::gpu::MAX_PUSH_CONSTANT_SIZE);
        assert_eq!(size_of::<ImagePush>() % 4, 0);
    }
}
