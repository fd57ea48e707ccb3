// SPDX-License-Identifier: AGPL-3.0-only
//! Splat parameter and gradient records.
//!
//! Every record here is exactly 64 bytes and field-for-field aligned with
//! the WGSL `Splat` struct in the compute shaders, so a host slice can be
//! uploaded with `bytemuck::cast_slice` and read back bit-for-bit.
//!
//! Layout (16 f32 lanes):
//! ```text
//!   0..2   position.xyz      (z unused by the 2D renderer, carried for layout)
//!   3      opacity
//!   4..6   scale.xyz         (scale.x is the isotropic sigma; y/z carried)
//!   7      pad
//!   8..11  rotation quaternion (carried, not trained)
//!   12..14 color.rgb
//!   15     pad
//! ```

/// Number of f32 (or i32) lanes per splat record.
pub const FIELDS_PER_SPLAT: usize = 16;

/// Lane offsets within a 16-lane splat record. Shared by the gradient
/// codec and the backward shader's `atomicAdd` indices.
pub mod field {
    pub const POS_X: usize = 0;
    pub const POS_Y: usize = 1;
    pub const POS_Z: usize = 2;
    pub const OPACITY: usize = 3;
    pub const SCALE_X: usize = 4;
    pub const ROT: usize = 8;
    pub const COLOR_R: usize = 12;
    pub const COLOR_G: usize = 13;
    pub const COLOR_B: usize = 14;
}

/// One trainable 2D Gaussian splat. 64 bytes, GPU-uploadable.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GaussianParam {
    /// Center in pixel coordinates; z is carried but ignored in 2D.
    pub position: [f32; 3],
    /// Peak opacity in [0, 1]. A splat with opacity 0 contributes nothing
    /// and receives no gradient.
    pub opacity: f32,
    /// Isotropic footprint: `scale[0]` is sigma in pixels. y/z carried.
    pub scale: [f32; 3],
    pub _pad0: f32,
    /// Orientation quaternion (w, x, y, z). Carried through training
    /// untouched; the isotropic 2D kernel has no use for it.
    pub rotation: [f32; 4],
    /// Linear RGB color, each channel clamped to [0, 1] after updates.
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl GaussianParam {
    /// A splat at `position` with the given color, unit opacity, a 10 px
    /// sigma, and identity rotation.
    #[must_use]
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            opacity: 1.0,
            scale: [10.0, 10.0, 10.0],
            _pad0: 0.0,
            rotation: [1.0, 0.0, 0.0, 0.0],
            color,
            _pad1: 0.0,
        }
    }

    /// View the record as its 16 raw f32 lanes.
    #[must_use]
    pub fn lanes(&self) -> &[f32; FIELDS_PER_SPLAT] {
        bytemuck::cast_ref(self)
    }
}

/// `count` splats at seeded-random positions inside a `width`×`height`
/// image with random colors, for starting a fit from scratch. The same
/// seed always produces the same initialization.
#[must_use]
pub fn random_init(count: usize, width: u32, height: u32, seed: u64) -> Vec<GaussianParam> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (width as f32, height as f32);
    (0..count)
        .map(|_| {
            GaussianParam::new(
                [rng.gen_range(0.0..w), rng.gen_range(0.0..h), 0.0],
                [rng.gen(), rng.gen(), rng.gen()],
            )
        })
        .collect()
}

/// Decoded (floating point) gradient for one splat. Mirrors
/// [`GaussianParam`] lane-for-lane.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GaussianGrad {
    pub position: [f32; 3],
    pub opacity: f32,
    pub scale: [f32; 3],
    pub _pad0: f32,
    pub rotation: [f32; 4],
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl GaussianGrad {
    /// View the record as its 16 raw f32 lanes.
    #[must_use]
    pub fn lanes(&self) -> &[f32; FIELDS_PER_SPLAT] {
        bytemuck::cast_ref(self)
    }
}

/// Fixed-point accumulator image of [`GaussianGrad`]: 16 i32 lanes that
/// the backward shader fills with `atomicAdd`. Same 64-byte footprint.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GaussianGradInt {
    pub position: [i32; 3],
    pub opacity: i32,
    pub scale: [i32; 3],
    pub _pad0: i32,
    pub rotation: [i32; 4],
    pub color: [i32; 3],
    pub _pad1: i32,
}

impl GaussianGradInt {
    /// View the record as its 16 raw i32 lanes.
    #[must_use]
    pub fn lanes(&self) -> &[i32; FIELDS_PER_SPLAT] {
        bytemuck::cast_ref(self)
    }

    /// Mutable view of the 16 raw i32 lanes.
    pub fn lanes_mut(&mut self) -> &mut [i32; FIELDS_PER_SPLAT] {
        bytemuck::cast_mut(self)
    }
}
