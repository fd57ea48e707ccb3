// SPDX-License-Identifier: AGPL-3.0-only

//! Gradient descent update with per-field learning rates and clamps.

use crate::splat::{GaussianGrad, GaussianParam};
use crate::tolerances::{MIN_OPACITY, MIN_SCALE};

/// Per-field step sizes for the SGD update.
///
/// The defaults are tuned for unit-range colors and sigma-10 splats on
/// images up to 64×64: each sits comfortably below the curvature limit
/// of its field so the plain-SGD iteration contracts instead of
/// oscillating.
#[derive(Debug, Clone, Copy)]
pub struct LearningRates {
    pub position: f32,
    pub scale: f32,
    pub opacity: f32,
    pub color: f32,
}

impl Default for LearningRates {
    fn default() -> Self {
        Self {
            position: 0.02,
            scale: 0.005,
            opacity: 1e-4,
            color: 0.002,
        }
    }
}

/// Apply one descent step: `param -= rate * grad` per trained field.
///
/// Post-update clamps keep every splat trainable: color and opacity
/// stay in [0, 1] (opacity additionally floored at [`MIN_OPACITY`] so
/// an updated splat can never freeze at exactly zero), and sigma is
/// floored at [`MIN_SCALE`]. Rotation and the z components are carried
/// untouched.
pub fn apply_sgd(params: &mut [GaussianParam], grads: &[GaussianGrad], rates: &LearningRates) {
    for (p, g) in params.iter_mut().zip(grads) {
        // Fully transparent splats receive no gradient from the
        // backward pass; skip them entirely so the clamps cannot
        // resurrect a splat the caller froze at zero opacity.
        if p.opacity <= 0.0 {
            continue;
        }
        p.position[0] -= rates.position * g.position[0];
        p.position[1] -= rates.position * g.position[1];
        p.opacity = (p.opacity - rates.opacity * g.opacity).clamp(MIN_OPACITY, 1.0);
        p.scale[0] = (p.scale[0] - rates.scale * g.scale[0]).max(MIN_SCALE);
        for (c, gc) in p.color.iter_mut().zip(&g.color) {
            *c = (*c - rates.color * gc).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splat::GaussianParam;

    fn zero_grad() -> GaussianGrad {
        bytemuck::Zeroable::zeroed()
    }

    #[test]
    fn zero_gradient_is_identity_up_to_clamps() {
        let mut params = vec![GaussianParam::new([5.0, 5.0, 0.0], [0.3, 0.4, 0.5])];
        let before = params[0];
        apply_sgd(&mut params, &[zero_grad()], &LearningRates::default());
        assert_eq!(params[0], before);
    }

    #[test]
    fn descent_moves_against_gradient() {
        let mut params = vec![GaussianParam::new([5.0, 5.0, 0.0], [0.5, 0.5, 0.5])];
        let mut g = zero_grad();
        g.position = [1.0, -2.0, 0.0];
        g.color = [1.0, 0.0, -1.0];
        let rates = LearningRates::default();
        apply_sgd(&mut params, &[g], &rates);
        assert!((params[0].position[0] - (5.0 - rates.position)).abs() < 1e-6);
        assert!((params[0].position[1] - (5.0 + 2.0 * rates.position)).abs() < 1e-6);
        assert!(params[0].color[0] < 0.5);
        assert!(params[0].color[2] > 0.5);
    }

    #[test]
    fn color_and_opacity_stay_in_range() {
        let mut params = vec![GaussianParam::new([0.0, 0.0, 0.0], [0.01, 0.99, 0.5])];
        params[0].opacity = 0.001;
        let mut g = zero_grad();
        g.color = [1000.0, -1000.0, 0.0];
        g.opacity = 1000.0;
        apply_sgd(&mut params, &[g], &LearningRates::default());
        assert_eq!(params[0].color[0], 0.0);
        assert_eq!(params[0].color[1], 1.0);
        assert_eq!(params[0].opacity, MIN_OPACITY);
    }

    #[test]
    fn sigma_never_collapses() {
        let mut params = vec![GaussianParam::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])];
        let mut g = zero_grad();
        g.scale = [1e9, 0.0, 0.0];
        apply_sgd(&mut params, &[g], &LearningRates::default());
        assert_eq!(params[0].scale[0], MIN_SCALE);
    }

    #[test]
    fn transparent_splat_is_skipped() {
        let mut params = vec![GaussianParam::new([5.0, 5.0, 0.0], [1.0, 0.0, 0.0])];
        params[0].opacity = 0.0;
        let before = params[0];
        let mut g = zero_grad();
        g.position = [1.0, 1.0, 0.0];
        g.opacity = -1.0;
        apply_sgd(&mut params, &[g], &LearningRates::default());
        assert_eq!(params[0], before, "zero-opacity splat must not move");
    }

    #[test]
    fn rotation_and_z_are_untouched() {
        let mut params = vec![GaussianParam::new([1.0, 2.0, 3.0], [0.5, 0.5, 0.5])];
        params[0].rotation = [0.5, 0.5, 0.5, 0.5];
        let mut g = zero_grad();
        g.position = [1.0, 1.0, 1.0];
        g.rotation = [9.0, 9.0, 9.0, 9.0];
        apply_sgd(&mut params, &[g], &LearningRates::default());
        assert_eq!(params[0].rotation, [0.5, 0.5, 0.5, 0.5]);
        assert_eq!(params[0].position[2], 3.0);
    }
}
