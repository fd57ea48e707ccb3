// SPDX-License-Identifier: AGPL-3.0-only
//! RGBA float images and PPM export.
//!
//! Pixels are stored row-major as `[r, g, b, a]` f32, matching the
//! `array<vec4<f32>>` storage layout the render shader writes, so a GPU
//! readback casts straight into `pixels` with no reshuffling.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SplatForgeError;

/// Row-major RGBA f32 image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    /// `height * width` pixels, row-major, `[r, g, b, a]` each.
    pub pixels: Vec<[f32; 4]>,
}

impl Image {
    /// An all-black, fully transparent image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; (width as usize) * (height as usize)],
        }
    }

    /// Wrap an existing pixel buffer. Panics in debug builds if the
    /// length does not match `width * height`.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize));
        Self {
            width,
            height,
            pixels,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Pixel at `(x, y)` with `y` counting down from the top row.
    #[must_use]
    pub fn at(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn set(&mut self, x: u32, y: u32, rgba: [f32; 4]) {
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)] = rgba;
    }

    /*
     * ───────────────────────────────────────────────
     * PPM export
     * ───────────────────────────────────────────────
     */

    /// Write the RGB channels as a binary PPM (P6, maxval 255).
    ///
    /// Channels are clamped to [0, 1] then quantized to u8. Alpha is
    /// dropped; PPM has no alpha plane.
    pub fn save_ppm<P: AsRef<Path>>(&self, path: P) -> Result<(), SplatForgeError> {
        let file = File::create(path.as_ref())
            .map_err(|e| SplatForgeError::ImageWrite(format!("create: {e}")))?;
        let mut w = BufWriter::new(file);
        write!(w, "P6\n{} {}\n255\n", self.width, self.height)
            .map_err(|e| SplatForgeError::ImageWrite(format!("header: {e}")))?;
        let mut row = Vec::with_capacity(3 * self.width as usize);
        for y in 0..self.height {
            row.clear();
            for x in 0..self.width {
                let px = self.at(x, y);
                for c in &px[..3] {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    row.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
                }
            }
            w.write_all(&row)
                .map_err(|e| SplatForgeError::ImageWrite(format!("pixels: {e}")))?;
        }
        w.flush()
            .map_err(|e| SplatForgeError::ImageWrite(format!("flush: {e}")))?;
        Ok(())
    }
}

/// Per-pixel sum of squared RGB error against a target image. Alpha is
/// excluded; the loss matches what the loss shader computes.
#[must_use]
pub fn squared_error(rendered: &Image, target: &Image) -> Vec<f32> {
    rendered
        .pixels
        .iter()
        .zip(&target.pixels)
        .map(|(r, t)| {
            let dr = r[0] - t[0];
            let dg = r[1] - t[1];
            let db = r[2] - t[2];
            dr * dr + dg * dg + db * db
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_is_zeroed() {
        let img = Image::new(4, 3);
        assert_eq!(img.pixel_count(), 12);
        assert!(img.pixels.iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn set_and_at_round_trip() {
        let mut img = Image::new(8, 8);
        img.set(3, 5, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(img.at(3, 5), [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(img.at(5, 3), [0.0; 4]);
    }

    #[test]
    fn squared_error_rgb_only() {
        let mut a = Image::new(1, 1);
        let mut b = Image::new(1, 1);
        a.set(0, 0, [1.0, 0.0, 0.0, 1.0]);
        b.set(0, 0, [0.0, 0.0, 0.0, 0.0]);
        let loss = squared_error(&a, &b);
        // Alpha differs by 1 but must not contribute.
        assert!((loss[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ppm_header_and_clamping() {
        let mut img = Image::new(2, 1);
        img.set(0, 0, [2.0, -1.0, 0.5, 1.0]);
        img.set(1, 0, [0.0, 1.0, 0.0, 1.0]);
        let path = std::env::temp_dir().join("splatforge_ppm_test.ppm");
        img.save_ppm(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(bytes.starts_with(b"P6\n2 1\n255\n"));
        let data = &bytes[b"P6\n2 1\n255\n".len()..];
        assert_eq!(data, &[255, 0, 128, 0, 255, 0]);
    }
}
