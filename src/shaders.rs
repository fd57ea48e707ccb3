// SPDX-License-Identifier: AGPL-3.0-only

//! WGSL shader sources for the training pipeline.
//!
//! All three kernels share the 64-byte `Splat` struct (mirrored by
//! [`crate::splat::GaussianParam`] on the host) and an 8×8 workgroup,
//! one thread per output pixel. They are compiled once at trainer
//! construction via [`crate::gpu::ComputeKernel::build`].

// ═══════════════════════════════════════════════════════════════════
// Forward renderer: front-to-back compositing in splat index order
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_RENDER: &str = include_str!("shaders/render.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Per-pixel L2 loss against the target image (RGB only)
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_LOSS: &str = include_str!("shaders/loss.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Backward pass: fixed-point atomic gradient accumulation
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_BACKWARD: &str = include_str!("shaders/backward.wgsl");

/// Workgroup edge used by all three kernels (8×8 threads).
pub const WORKGROUP_EDGE: u32 = 8;
