// SPDX-License-Identifier: AGPL-3.0-only
//! Fixed-point gradient codec.
//!
//! The backward shader accumulates per-splat gradients with `atomicAdd`
//! on i32 lanes because WGSL has no float atomics. Each contribution is
//! scaled by [`GRAD_FIXED_SCALE`] and rounded to the nearest integer;
//! the host decodes by dividing back. Integer addition is associative,
//! so the accumulated value is independent of the order GPU threads run
//! in, and a CPU accumulating the same rounded contributions lands on
//! the same integer bit-for-bit.

use crate::splat::{GaussianGrad, GaussianGradInt, FIELDS_PER_SPLAT};

/// Fixed-point scale: 2^16 counts per unit gradient.
///
/// Chosen so that per-pixel gradient contributions (magnitude up to a
/// few units) encode well inside i32 range even when summed over a
/// 4096-pixel image, while quantization error stays below 2^-17 per
/// contribution. Must match `GRAD_SCALE` in the backward shader.
pub const GRAD_FIXED_SCALE: f32 = 65536.0;

/// Encode one float gradient contribution to fixed point.
#[must_use]
pub fn encode_component(v: f32) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let fixed = (v * GRAD_FIXED_SCALE).round() as i32;
    fixed
}

/// Decode an accumulated fixed-point lane back to float.
#[must_use]
pub fn decode_component(v: i32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let f = v as f32 / GRAD_FIXED_SCALE;
    f
}

/// Accumulate a float contribution into a fixed-point lane, using the
/// same wrapping semantics as the GPU's `atomicAdd`.
pub fn accumulate(lane: &mut i32, v: f32) {
    *lane = lane.wrapping_add(encode_component(v));
}

/// Decode a slice of accumulated integer gradients to float gradients.
#[must_use]
pub fn decode(grads: &[GaussianGradInt]) -> Vec<GaussianGrad> {
    grads
        .iter()
        .map(|g| {
            let mut lanes = [0.0f32; FIELDS_PER_SPLAT];
            for (out, &lane) in lanes.iter_mut().zip(g.lanes()) {
                *out = decode_component(lane);
            }
            bytemuck::cast(lanes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splat::field;

    #[test]
    fn round_trip_within_half_step() {
        let step = 1.0 / GRAD_FIXED_SCALE;
        for &v in &[0.0f32, 1.0, -1.0, 0.3333, -2.71828, 123.456, -0.00001] {
            let decoded = decode_component(encode_component(v));
            assert!(
                (decoded - v).abs() <= 0.5 * step,
                "{v} -> {decoded} off by more than half a step"
            );
        }
    }

    #[test]
    fn zero_encodes_to_zero() {
        assert_eq!(encode_component(0.0), 0);
        assert_eq!(decode_component(0), 0.0);
    }

    #[test]
    fn accumulation_is_order_independent() {
        let contributions = [0.125f32, -0.5, 0.333, 1.75, -0.001, 0.0625];
        let mut forward = 0i32;
        for &c in &contributions {
            accumulate(&mut forward, c);
        }
        let mut backward = 0i32;
        for &c in contributions.iter().rev() {
            accumulate(&mut backward, c);
        }
        assert_eq!(forward, backward);
    }

    #[test]
    fn decode_maps_all_lanes() {
        let mut g: GaussianGradInt = bytemuck::Zeroable::zeroed();
        g.lanes_mut()[field::POS_X] = encode_component(1.5);
        g.lanes_mut()[field::OPACITY] = encode_component(-0.25);
        g.lanes_mut()[field::COLOR_B] = encode_component(0.75);
        let decoded = decode(&[g]);
        let lanes = decoded[0].lanes();
        assert!((lanes[field::POS_X] - 1.5).abs() < 1e-6);
        assert!((lanes[field::OPACITY] + 0.25).abs() < 1e-6);
        assert!((lanes[field::COLOR_B] - 0.75).abs() < 1e-6);
        assert_eq!(lanes[field::POS_Y], 0.0);
    }
}
