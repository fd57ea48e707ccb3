// SPDX-License-Identifier: AGPL-3.0-only

//! CPU mirror of the GPU training kernels.
//!
//! Same math, same guards, same fixed-point accumulation as the WGSL
//! shaders, so CPU and GPU results can be compared directly: forward
//! compositing differs only by fma contraction, and the integer
//! gradient accumulators use identical rounding and wrapping
//! semantics. Also drives the CPU-only convergence tests.

use rayon::prelude::*;

use crate::codec;
use crate::image::{squared_error, Image};
use crate::splat::{field, GaussianGradInt, GaussianParam};
use crate::tolerances::TRANSMITTANCE_FLOOR;
use crate::trainer::{apply_sgd, LearningRates};

/// Composite one pixel front-to-back in splat index order.
fn composite_pixel(params: &[GaussianParam], px: f32, py: f32) -> [f32; 4] {
    let mut rgb = [0.0f32; 3];
    let mut t = 1.0f32;
    for s in params {
        if s.opacity <= 0.0 {
            continue;
        }
        let dx = px - s.position[0];
        let dy = py - s.position[1];
        let sigma = s.scale[0];
        let g = (-0.5 * (dx * dx + dy * dy) / (sigma * sigma)).exp();
        let alpha = g * s.opacity;
        for (c, &col) in rgb.iter_mut().zip(&s.color) {
            *c += col * alpha * t;
        }
        t *= 1.0 - alpha;
    }
    [rgb[0], rgb[1], rgb[2], 1.0 - t]
}

/// Render the splats to an image, one rayon task per pixel.
#[must_use]
pub fn render(params: &[GaussianParam], width: u32, height: u32) -> Image {
    let w = width as usize;
    let pixels: Vec<[f32; 4]> = (0..w * height as usize)
        .into_par_iter()
        .map(|idx| {
            #[allow(clippy::cast_precision_loss)]
            let (px, py) = ((idx % w) as f32, (idx / w) as f32);
            composite_pixel(params, px, py)
        })
        .collect();
    Image::from_pixels(width, height, pixels)
}

/// Total L2 loss over the image (sum of per-pixel squared RGB error).
#[must_use]
pub fn total_loss(rendered: &Image, target: &Image) -> f32 {
    squared_error(rendered, target).iter().sum()
}

/// Accumulate fixed-point gradients for every splat.
///
/// Replays the compositing chain per pixel; `rendered` must be the
/// forward output for the same `params` so the suffix terms match
/// what the backward shader reads.
#[must_use]
pub fn backward(
    params: &[GaussianParam],
    rendered: &Image,
    target: &Image,
) -> Vec<GaussianGradInt> {
    let mut grads: Vec<GaussianGradInt> = vec![bytemuck::Zeroable::zeroed(); params.len()];
    let width = rendered.width();
    for y in 0..rendered.height() {
        for x in 0..width {
            #[allow(clippy::cast_precision_loss)]
            let (px, py) = (x as f32, y as f32);
            let out = rendered.at(x, y);
            let tgt = target.at(x, y);
            let d_color = [
                2.0 * (out[0] - tgt[0]),
                2.0 * (out[1] - tgt[1]),
                2.0 * (out[2] - tgt[2]),
            ];

            let mut prefix = [0.0f32; 3];
            let mut t = 1.0f32;
            for (s, grad) in params.iter().zip(&mut grads) {
                if s.opacity <= 0.0 {
                    continue;
                }
                let dx = px - s.position[0];
                let dy = py - s.position[1];
                let sigma = s.scale[0];
                let d2 = dx * dx + dy * dy;
                let g = (-0.5 * d2 / (sigma * sigma)).exp();
                let alpha = g * s.opacity;

                let mut dot_suffix = 0.0f32;
                let mut dot_color = 0.0f32;
                for c in 0..3 {
                    prefix[c] += s.color[c] * alpha * t;
                    dot_suffix += d_color[c] * (out[c] - prefix[c]);
                    dot_color += d_color[c] * s.color[c];
                }

                let d_alpha =
                    dot_color * t - dot_suffix / (1.0 - alpha).max(TRANSMITTANCE_FLOOR);
                let lanes = grad.lanes_mut();
                codec::accumulate(
                    &mut lanes[field::POS_X],
                    d_alpha * alpha * dx / (sigma * sigma),
                );
                codec::accumulate(
                    &mut lanes[field::POS_Y],
                    d_alpha * alpha * dy / (sigma * sigma),
                );
                codec::accumulate(&mut lanes[field::OPACITY], d_alpha * g);
                codec::accumulate(
                    &mut lanes[field::SCALE_X],
                    d_alpha * alpha * d2 / (sigma * sigma * sigma),
                );
                codec::accumulate(&mut lanes[field::COLOR_R], d_color[0] * alpha * t);
                codec::accumulate(&mut lanes[field::COLOR_G], d_color[1] * alpha * t);
                codec::accumulate(&mut lanes[field::COLOR_B], d_color[2] * alpha * t);

                t *= 1.0 - alpha;
            }
        }
    }
    grads
}

/// Run the full training loop on the CPU.
///
/// Returns the per-iteration loss history; each entry is the loss of
/// the parameters *before* that iteration's update, matching what the
/// GPU trainer reports.
pub fn train(
    params: &mut [GaussianParam],
    target: &Image,
    iterations: usize,
    rates: &LearningRates,
) -> Vec<f32> {
    let mut history = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let rendered = render(params, target.width(), target.height());
        history.push(total_loss(&rendered, target));
        let grads_int = backward(params, &rendered, target);
        let grads = codec::decode(&grads_int);
        apply_sgd(params, &grads, rates);
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_red_splat() -> Vec<GaussianParam> {
        let mut s = GaussianParam::new([8.0, 8.0, 0.0], [1.0, 0.0, 0.0]);
        s.scale = [4.0, 4.0, 4.0];
        vec![s]
    }

    #[test]
    fn render_peak_is_at_center() {
        let img = render(&one_red_splat(), 16, 16);
        let center = img.at(8, 8);
        let corner = img.at(0, 0);
        assert!(center[0] > 0.99, "center red {}", center[0]);
        assert!(corner[0] < center[0]);
        assert_eq!(center[1], 0.0);
        assert_eq!(center[2], 0.0);
    }

    #[test]
    fn render_is_deterministic() {
        let params = one_red_splat();
        let a = render(&params, 16, 16);
        let b = render(&params, 16, 16);
        assert_eq!(a, b, "same params must render bit-identically");
    }

    #[test]
    fn transparent_splat_contributes_nothing() {
        let mut params = one_red_splat();
        params[0].opacity = 0.0;
        let img = render(&params, 16, 16);
        assert!(img.pixels.iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn transparent_splat_receives_no_gradient() {
        let mut params = one_red_splat();
        params[0].opacity = 0.0;
        let rendered = render(&params, 16, 16);
        let mut target = Image::new(16, 16);
        target.set(8, 8, [0.0, 1.0, 0.0, 1.0]);
        let grads = backward(&params, &rendered, &target);
        assert!(grads[0].lanes().iter().all(|&l| l == 0));
    }

    #[test]
    fn compositing_order_is_index_order() {
        // Two saturating splats at the same spot: the first one wins.
        let front = GaussianParam::new([4.0, 4.0, 0.0], [1.0, 0.0, 0.0]);
        let back = GaussianParam::new([4.0, 4.0, 0.0], [0.0, 1.0, 0.0]);
        let img = render(&[front, back], 8, 8);
        let px = img.at(4, 4);
        assert!(px[0] > 0.99);
        assert!(px[1] < 0.01);
    }

    #[test]
    fn loss_gradient_sign_points_at_target() {
        // Rendered red, target dark: color gradient must be positive
        // (descent lowers the red channel).
        let params = one_red_splat();
        let rendered = render(&params, 16, 16);
        let target = Image::new(16, 16);
        let grads = codec::decode(&backward(&params, &rendered, &target));
        assert!(grads[0].color[0] > 0.0);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let mut params = one_red_splat();
        params[0].position = [7.0, 9.0, 0.0];
        params[0].opacity = 0.6;
        let mut target = Image::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                #[allow(clippy::cast_precision_loss)]
                let v = f32::from(u8::try_from((x + y) % 2).unwrap());
                target.set(x, y, [v, 0.2, 0.0, 1.0]);
            }
        }
        let rendered = render(&params, 16, 16);
        let grads = codec::decode(&backward(&params, &rendered, &target));
        let analytic = grads[0].position[0];

        let h = 1e-2f32;
        let mut plus = params.clone();
        plus[0].position[0] += h;
        let mut minus = params.clone();
        minus[0].position[0] -= h;
        let lp = total_loss(&render(&plus, 16, 16), &target);
        let lm = total_loss(&render(&minus, 16, 16), &target);
        let numeric = (lp - lm) / (2.0 * h);

        assert!(
            (analytic - numeric).abs() < 0.05 * numeric.abs().max(1.0),
            "analytic {analytic} vs numeric {numeric}"
        );
    }
}
