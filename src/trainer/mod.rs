// SPDX-License-Identifier: AGPL-3.0-only

//! GPU training loop: render → loss → backward → SGD update.
//!
//! [`Trainer`] owns the device, the three compute kernels, and all
//! buffers for one training configuration. Splat count and image size
//! are fixed at construction; [`Trainer::step`] runs one iteration and
//! returns its loss, [`Trainer::train`] runs the configured number of
//! iterations and returns the loss history.
//!
//! ## Module structure
//!
//! - `resources` — one-time buffer allocation
//! - `dispatch` — per-iteration command encoding and readback
//! - `optimizer` — SGD update with per-field rates and clamps

mod dispatch;
mod optimizer;
mod resources;

pub use optimizer::{apply_sgd, LearningRates};

use std::mem::size_of;

use crate::codec;
use crate::error::SplatForgeError;
use crate::gpu::{ComputeKernel, GpuContext};
use crate::image::Image;
use crate::shaders::{SHADER_BACKWARD, SHADER_LOSS, SHADER_RENDER};
use crate::splat::GaussianParam;

use dispatch::{ImagePush, LossPush};
use resources::TrainResources;

/// Training run configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub width: u32,
    pub height: u32,
    pub iterations: usize,
    pub rates: LearningRates,
}

impl TrainConfig {
    /// Configuration for a `width`×`height` target with default rates.
    #[must_use]
    pub fn new(width: u32, height: u32, iterations: usize) -> Self {
        Self {
            width,
            height,
            iterations,
            rates: LearningRates::default(),
        }
    }
}

/// GPU splat trainer for one target image.
pub struct Trainer {
    gpu: GpuContext,
    cfg: TrainConfig,
    render_kernel: ComputeKernel,
    loss_kernel: ComputeKernel,
    backward_kernel: ComputeKernel,
    res: TrainResources,
    params: Vec<GaussianParam>,
    zero_grads: Vec<u8>,
}

impl Trainer {
    /// Build pipelines, allocate buffers, and upload the target.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::PipelineBuild`] if any kernel fails
    /// validation, or [`SplatForgeError::GpuCompute`] on bind mismatch.
    pub fn new(
        gpu: GpuContext,
        cfg: TrainConfig,
        initial: Vec<GaussianParam>,
        target: &Image,
    ) -> Result<Self, SplatForgeError> {
        debug_assert_eq!(
            (cfg.width, cfg.height),
            (target.width(), target.height()),
            "target image must match the configured resolution"
        );
        let mut render_kernel = ComputeKernel::build(
            &gpu,
            "splat render",
            SHADER_RENDER,
            2,
            size_of::<ImagePush>() as u32,
        )?;
        let mut loss_kernel = ComputeKernel::build(
            &gpu,
            "splat loss",
            SHADER_LOSS,
            3,
            size_of::<LossPush>() as u32,
        )?;
        let mut backward_kernel = ComputeKernel::build(
            &gpu,
            "splat backward",
            SHADER_BACKWARD,
            4,
            size_of::<ImagePush>() as u32,
        )?;

        let res = TrainResources::allocate(&gpu, initial.len(), target);
        render_kernel.bind(&gpu, &[&res.params, &res.rendered])?;
        loss_kernel.bind(&gpu, &[&res.rendered, &res.target, &res.loss])?;
        backward_kernel.bind(&gpu, &[&res.params, &res.grads, &res.rendered, &res.target])?;

        let zero_grads = vec![0u8; initial.len() * size_of::<GaussianParam>()];
        Ok(Self {
            gpu,
            cfg,
            render_kernel,
            loss_kernel,
            backward_kernel,
            res,
            params: initial,
            zero_grads,
        })
    }

    /// Current splat parameters.
    #[must_use]
    pub fn params(&self) -> &[GaussianParam] {
        &self.params
    }

    /// Name of the adapter training runs on.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.gpu.adapter_name
    }

    /// Run one iteration and return its total loss (computed on the
    /// parameters as they were at the start of the step).
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if dispatch or readback
    /// fails.
    pub fn step(&mut self) -> Result<f32, SplatForgeError> {
        self.gpu
            .upload(&self.res.params, bytemuck::cast_slice(&self.params));
        self.gpu.upload(&self.res.grads, &self.zero_grads);

        let out = dispatch::run_iteration(
            &self.gpu,
            &self.render_kernel,
            &self.loss_kernel,
            &self.backward_kernel,
            &self.res,
            self.cfg.width,
            self.cfg.height,
            self.splat_count(),
        )?;

        let grads = codec::decode(&out.grads);
        apply_sgd(&mut self.params, &grads, &self.cfg.rates);
        Ok(out.total_loss)
    }

    /// Run the configured number of iterations; returns the loss history.
    ///
    /// # Errors
    ///
    /// Propagates the first failing [`Self::step`].
    pub fn train(&mut self) -> Result<Vec<f32>, SplatForgeError> {
        let mut history = Vec::with_capacity(self.cfg.iterations);
        for _ in 0..self.cfg.iterations {
            history.push(self.step()?);
        }
        Ok(history)
    }

    /// Render the current parameters and read the image back.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::GpuCompute`] if dispatch or readback
    /// fails.
    pub fn render_current(&self) -> Result<Image, SplatForgeError> {
        self.gpu
            .upload(&self.res.params, bytemuck::cast_slice(&self.params));
        let pixels = dispatch::run_render(
            &self.gpu,
            &self.render_kernel,
            &self.res,
            self.cfg.width,
            self.cfg.height,
            self.splat_count(),
        )?;
        Ok(Image::from_pixels(self.cfg.width, self.cfg.height, pixels))
    }

    fn splat_count(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let n = self.params.len() as u32;
        n
    }
}
