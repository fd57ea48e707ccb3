// SPDX-License-Identifier: AGPL-3.0-only

//! # splatforge
//!
//! GPU-trained 2D Gaussian splat image fitting.
//!
//! A set of isotropic 2D Gaussian splats is optimized to reproduce a
//! target RGBA image by gradient descent. Each iteration runs three
//! compute kernels on one command buffer — forward render, per-pixel
//! L2 loss, and a backward pass that accumulates analytic gradients
//! into fixed-point atomics — then applies an SGD update on the host.
//!
//! ```no_run
//! use splatforge::{cpu_reference, GaussianParam, GpuContext, TrainConfig, Trainer};
//!
//! # fn main() -> Result<(), splatforge::SplatForgeError> {
//! let target = cpu_reference::render(
//!     &[GaussianParam::new([32.0, 32.0, 0.0], [0.0, 1.0, 0.0])],
//!     64,
//!     64,
//! );
//! let initial = vec![GaussianParam::new([28.0, 28.0, 0.0], [1.0, 0.0, 0.0])];
//! let gpu = GpuContext::new_blocking()?;
//! let mut trainer = Trainer::new(gpu, TrainConfig::new(64, 64, 100), initial, &target)?;
//! let history = trainer.train()?;
//! assert!(history.last() < history.first());
//! # Ok(())
//! # }
//! ```
//!
//! [`cpu_reference`] mirrors the three kernels bit-compatibly on the
//! gradient path and is the comparison baseline for GPU parity tests.

pub mod codec;
pub mod cpu_reference;
pub mod error;
pub mod gpu;
pub mod image;
pub mod shaders;
pub mod splat;
pub mod tolerances;
pub mod trainer;
pub mod validation;

pub use error::SplatForgeError;
pub use gpu::GpuContext;
pub use image::Image;
pub use splat::{GaussianGrad, GaussianGradInt, GaussianParam};
pub use trainer::{LearningRates, TrainConfig, Trainer};
