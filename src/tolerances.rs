// SPDX-License-Identifier: AGPL-3.0-only
//! Named tolerances used across tests and validation binaries.
//!
//! Every constant carries its rationale so a failing check can be judged
//! against the physics of the pipeline rather than a magic number.

use crate::codec::GRAD_FIXED_SCALE;

/// Quantization step of one decoded gradient lane. A single encoded
/// contribution can be off by at most half of this.
pub const GRAD_DECODE_EPS: f32 = 1.0 / GRAD_FIXED_SCALE;

/// Allowed absolute difference between CPU and GPU decoded gradients.
///
/// Each of the up-to-4096 pixel contributions can round differently by
/// one count when the GPU contracts `a*b+c` into an fma, so the bound
/// is a comfortable multiple of `pixels / GRAD_FIXED_SCALE`.
pub const CPU_GPU_GRAD_ABS: f32 = 0.25;

/// Allowed absolute per-channel difference between CPU and GPU rendered
/// pixels. Forward compositing is a short product/sum of f32 ops; fma
/// contraction perturbs the last few ulps only.
pub const CPU_GPU_PIXEL_ABS: f32 = 1e-4;

/// Floor applied to `1 - alpha` in the backward pass before dividing.
/// Keeps the suffix term finite when a splat saturates a pixel.
/// Must match `T_FLOOR` in the backward shader.
pub const TRANSMITTANCE_FLOOR: f32 = 1e-4;

/// Smallest sigma the optimizer will leave a splat with. A splat driven
/// below this would vanish from every pixel and stop receiving
/// gradients, so the update clamps here instead.
pub const MIN_SCALE: f32 = 1e-3;

/// Smallest opacity the optimizer will leave a splat with. An exactly
/// transparent splat receives no gradient and can never recover, so
/// updates clamp here; only user-initialized splats sit at exactly 0.
pub const MIN_OPACITY: f32 = 1e-3;

/// A training run counts as converged when the final loss drops below
/// this fraction of the initial loss.
pub const CONVERGED_LOSS_FRACTION: f32 = 0.10;

/// After convergence each fitted splat center must land within this
/// many pixels of the target it reconstructs.
pub const POSITION_MATCH_PX: f32 = 5.0;
