// SPDX-License-Identifier: AGPL-3.0-only

//! Compute kernel construction with explicit bind group layouts.
//!
//! Every training kernel binds N storage buffers at bindings 0..N of
//! group 0 and takes a small push constant block. The layout is built
//! explicitly (rather than derived from the shader) so binding count
//! and push range mismatches fail at build time with a clear message,
//! captured through a validation error scope.

use super::GpuContext;
use crate::error::SplatForgeError;

/// A compiled compute pipeline plus its bind group layout and, once
/// [`ComputeKernel::bind`] has run, the bind group for its buffers.
pub struct ComputeKernel {
    label: String,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    binding_count: usize,
    bind_group: Option<wgpu::BindGroup>,
}

impl ComputeKernel {
    /// Compile `wgsl` and build a pipeline expecting `binding_count`
    /// read-write storage buffers and `push_size` bytes of push
    /// constants.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::PipelineBuild`] with the driver's
    /// validation message if shader compilation or pipeline creation
    /// fails.
    pub fn build(
        gpu: &GpuContext,
        label: &str,
        wgsl: &str,
        binding_count: usize,
        push_size: u32,
    ) -> Result<Self, SplatForgeError> {
        let device = gpu.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        #[allow(clippy::cast_possible_truncation)]
        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..binding_count)
            .map(|i| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..push_size,
            }],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        gpu.pop_build_error(label)?;

        Ok(Self {
            label: label.to_string(),
            layout,
            pipeline,
            binding_count,
            bind_group: None,
        })
    }

    /// Bind `buffers` at bindings 0..N of group 0, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if the buffer count does
    /// not match the layout built for this kernel.
    pub fn bind(&mut self, gpu: &GpuContext, buffers: &[&wgpu::Buffer]) -> Result<(), SplatForgeError> {
        if buffers.len() != self.binding_count {
            return Err(SplatForgeError::GpuCompute(format!(
                "{}: expected {} buffers, got {}",
                self.label,
                self.binding_count,
                buffers.len()
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buf)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buf.as_entire_binding(),
            })
            .collect();
        self.bind_group = Some(gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label),
            layout: &self.layout,
            entries: &entries,
        }));
        Ok(())
    }

    /// Encode one compute pass for this kernel into `encoder`.
    ///
    /// Each pass forms a full barrier against the previous one within
    /// the same command buffer, which is what orders the render, loss,
    /// and backward kernels of an iteration.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if called before
    /// [`Self::bind`].
    pub fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        push_bytes: &[u8],
        workgroups: (u32, u32, u32),
    ) -> Result<(), SplatForgeError> {
        let bind_group = self.bind_group.as_ref().ok_or_else(|| {
            SplatForgeError::GpuCompute(format!("{}: dispatch before bind", self.label))
        })?;
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&self.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_push_constants(0, push_bytes);
        pass.dispatch_workgroups(workgroups.0, workgroups.1, workgroups.2);
        Ok(())
    }
}

/// Workgroup grid covering a `width`×`height` image with `edge`×`edge`
/// thread tiles.
#[must_use]
pub fn image_workgroups(width: u32, height: u32, edge: u32) -> (u32, u32, u32) {
    (width.div_ceil(edge), height.div_ceil(edge), 1)
}
