//! Pixel comparison on equal-sized RGBA buffers

use crate::{Error, Result};
use image::{Rgba, RgbaImage};

/// Knobs handed to a comparator on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    /// Per-pixel color sensitivity, 0.0 (exact) to 1.0 (anything goes)
    pub sensitivity: f64,
    /// Skip pixels that look like anti-aliasing on either side
    pub anti_aliasing: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            sensitivity: 0.1,
            anti_aliasing: true,
        }
    }
}

/// Result of one comparison
#[derive(Debug, Clone)]
pub struct Comparison {
    pub mismatched: u64,
    /// Visual diff, if the comparator produces one
    pub diff: Option<RgbaImage>,
}

/// Counts mismatched pixels between two equally sized buffers
pub trait PixelComparator: Send + Sync {
    fn compare(&self, a: &RgbaImage, b: &RgbaImage, options: &CompareOptions) -> Result<Comparison>;
}

/// Maximum YIQ delta between two colors (black vs. white)
const MAX_YIQ_DELTA: f64 = 35215.0;

const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const AA_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
/// How much of the original shows through unchanged pixels of the diff
const FADE: f64 = 0.1;

/// Perceptual comparator working in YIQ space.
///
/// A pixel mismatches when its squared YIQ distance exceeds
/// `MAX_YIQ_DELTA * sensitivity^2`. With anti-aliasing tolerance on, such a
/// pixel is forgiven when it sits on a gradient edge in one image that has
/// flat siblings in both.
#[derive(Debug, Clone, Copy, Default)]
pub struct YiqComparator;

impl PixelComparator for YiqComparator {
    fn compare(&self, a: &RgbaImage, b: &RgbaImage, options: &CompareOptions) -> Result<Comparison> {
        if a.dimensions() != b.dimensions() {
            return Err(Error::ScoreError(format!(
                "Dimension mismatch: {}x{} vs {}x{}",
                a.width(),
                a.height(),
                b.width(),
                b.height()
            )));
        }

        let (width, height) = a.dimensions();
        let max_delta = MAX_YIQ_DELTA * options.sensitivity * options.sensitivity;
        let mut diff = RgbaImage::new(width, height);
        let mut mismatched = 0u64;

        for y in 0..height {
            for x in 0..width {
                let pa = a.get_pixel(x, y);
                let pb = b.get_pixel(x, y);
                let delta = color_delta(pa, pb, false);

                let out = if delta.abs() > max_delta {
                    if options.anti_aliasing && (antialiased(a, b, x, y) || antialiased(b, a, x, y)) {
                        AA_COLOR
                    } else {
                        mismatched += 1;
                        DIFF_COLOR
                    }
                } else {
                    faded_gray(pa)
                };
                diff.put_pixel(x, y, out);
            }
        }

        Ok(Comparison {
            mismatched,
            diff: Some(diff),
        })
    }
}

/// Blend a channel against white by the pixel's alpha
fn blend(channel: u8, alpha: f64) -> f64 {
    255.0 + (channel as f64 - 255.0) * alpha
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.2741761 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

fn blended(p: &Rgba<u8>) -> (f64, f64, f64) {
    let alpha = p[3] as f64 / 255.0;
    (blend(p[0], alpha), blend(p[1], alpha), blend(p[2], alpha))
}

/// Squared YIQ distance, or the signed brightness difference with `y_only`
fn color_delta(a: &Rgba<u8>, b: &Rgba<u8>, y_only: bool) -> f64 {
    if a == b {
        return 0.0;
    }
    let (r1, g1, b1) = blended(a);
    let (r2, g2, b2) = blended(b);
    let y = rgb2y(r1, g1, b1) - rgb2y(r2, g2, b2);
    if y_only {
        return y;
    }
    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q
}

fn neighbours(img: &RgbaImage, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
    let (w, h) = img.dimensions();
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x1 = (x + 1).min(w - 1);
    let y1 = (y + 1).min(h - 1);
    (y0..=y1).flat_map(move |ny| (x0..=x1).map(move |nx| (nx, ny))).filter(move |&(nx, ny)| nx != x || ny != y)
}

/// Whether the pixel at (x, y) has more than two identical neighbours
fn has_many_siblings(img: &RgbaImage, x: u32, y: u32) -> bool {
    let p = img.get_pixel(x, y);
    neighbours(img, x, y).filter(|&(nx, ny)| img.get_pixel(nx, ny) == p).count() > 2
}

/// Whether (x, y) in `img` looks like an anti-aliased edge pixel: few flat
/// neighbours, both darker and brighter neighbours, and the extreme
/// neighbours sitting in flat regions of both images.
fn antialiased(img: &RgbaImage, other: &RgbaImage, x: u32, y: u32) -> bool {
    let center = img.get_pixel(x, y);
    let mut zeroes = 0;
    let mut min = 0.0;
    let mut max = 0.0;
    let mut darkest = None;
    let mut brightest = None;

    for (nx, ny) in neighbours(img, x, y) {
        let delta = color_delta(center, img.get_pixel(nx, ny), true);
        if delta == 0.0 {
            zeroes += 1;
            if zeroes > 2 {
                return false;
            }
        } else if delta < min {
            min = delta;
            darkest = Some((nx, ny));
        } else if delta > max {
            max = delta;
            brightest = Some((nx, ny));
        }
    }

    let (Some(dark), Some(bright)) = (darkest, brightest) else {
        return false;
    };

    (has_many_siblings(img, dark.0, dark.1) && has_many_siblings(other, dark.0, dark.1))
        || (has_many_siblings(img, bright.0, bright.1) && has_many_siblings(other, bright.0, bright.1))
}

fn faded_gray(p: &Rgba<u8>) -> Rgba<u8> {
    let (r, g, b) = blended(p);
    let y = rgb2y(r, g, b);
    let v = (255.0 + (y - 255.0) * FADE).clamp(0.0, 255.0) as u8;
    Rgba([v, v, v, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn identical_images_have_no_mismatch() {
        let img = solid(10, 10, [10, 20, 30, 255]);
        let result = YiqComparator.compare(&img, &img, &CompareOptions::default()).unwrap();
        assert_eq!(result.mismatched, 0);
        assert!(result.diff.is_some());
    }

    #[test]
    fn counts_a_solid_block_of_differences() {
        let a = solid(10, 10, [255, 255, 255, 255]);
        let mut b = a.clone();
        for y in 0..3 {
            for x in 0..10 {
                b.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let result = YiqComparator.compare(&a, &b, &CompareOptions::default()).unwrap();
        assert_eq!(result.mismatched, 30);
        let diff = result.diff.unwrap();
        assert_eq!(*diff.get_pixel(5, 1), DIFF_COLOR);
        assert_ne!(*diff.get_pixel(5, 8), DIFF_COLOR);
    }

    #[test]
    fn small_color_shift_is_under_threshold() {
        let a = solid(4, 4, [200, 200, 200, 255]);
        let b = solid(4, 4, [203, 201, 199, 255]);
        let result = YiqComparator.compare(&a, &b, &CompareOptions::default()).unwrap();
        assert_eq!(result.mismatched, 0);

        let strict = CompareOptions { sensitivity: 0.0, anti_aliasing: false };
        assert_eq!(YiqComparator.compare(&a, &b, &strict).unwrap().mismatched, 16);
    }

    #[test]
    fn rejects_different_dimensions() {
        let err = YiqComparator
            .compare(&solid(2, 2, [0; 4]), &solid(3, 2, [0; 4]), &CompareOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ScoreError(_)));
    }
}
