//! Neighborhood kernels: mosaic and smooth.
//!
//! Unlike the point-wise kernels these read more than one input pixel per
//! output pixel, so they work on whole row bands. Bands are disjoint in the
//! output and only read the (shared, immutable) input, which keeps them
//! independent of each other.

use core::num::NonZeroU32;

use crate::PixelBuffer;
use crate::buffer::BYTES_PER_PIXEL;
use crate::kernel::{LUMA_WEIGHTS, quantize};

/// Full-range BT.601 chroma weights (JPEG convention, zero-centered).
const CB_WEIGHTS: [f64; 3] = [-0.168_736, -0.331_264, 0.5];
const CR_WEIGHTS: [f64; 3] = [0.5, -0.418_688, -0.081_312];

/// Replace each `block × block` tile by its mean color.
///
/// Tiles on the right and bottom edges are clipped to the image. The mean
/// is rounded half-up; alpha is left untouched.
pub fn mosaic(src: &PixelBuffer, block: NonZeroU32) -> PixelBuffer {
    let width = src.width() as usize;
    let block = block.get() as usize;
    let stride = src.stride();
    let input = src.as_bytes();
    let mut out = input.to_vec();

    for_each_band(&mut out, stride.saturating_mul(block), |band_idx, band| {
        let y0 = band_idx * block;
        let rows = band.len() / stride;
        for x0 in (0..width).step_by(block) {
            let x1 = (x0 + block).min(width);
            let mut sum = [0u64; 3];
            for y in y0..y0 + rows {
                let row = &input[y * stride..(y + 1) * stride];
                let tile = &row[x0 * BYTES_PER_PIXEL..x1 * BYTES_PER_PIXEL];
                for px in tile.chunks_exact(BYTES_PER_PIXEL) {
                    sum[0] += px[0] as u64;
                    sum[1] += px[1] as u64;
                    sum[2] += px[2] as u64;
                }
            }
            let count = (rows * (x1 - x0)) as u64;
            let mean = sum.map(|s| ((s + count / 2) / count) as u8);
            for local_y in 0..rows {
                let row = &mut band[local_y * stride..(local_y + 1) * stride];
                let tile = &mut row[x0 * BYTES_PER_PIXEL..x1 * BYTES_PER_PIXEL];
                for px in tile.chunks_exact_mut(BYTES_PER_PIXEL) {
                    px[..3].copy_from_slice(&mean);
                }
            }
        }
    });

    PixelBuffer::from_kernel(src.width(), src.height(), out)
}

/// Blur luma over a 3×3 neighborhood while keeping each pixel's chroma.
///
/// Pixels are converted to full-range Y'CbCr, luma is replaced by the mean
/// of the nine surrounding samples (clamped at the image edges), and the
/// result is converted back. A uniform image is left unchanged.
pub fn smooth(src: &PixelBuffer) -> PixelBuffer {
    let width = src.width() as usize;
    let stride = src.stride();
    let input = src.as_bytes();

    let planes: Vec<[f64; 3]> = src
        .pixels()
        .map(|px| {
            let rgb = [px.r as f64, px.g as f64, px.b as f64];
            [dot(LUMA_WEIGHTS, rgb), dot(CB_WEIGHTS, rgb), dot(CR_WEIGHTS, rgb)]
        })
        .collect();
    let last_row = (src.height() as usize).saturating_sub(1);
    let last_col = width.saturating_sub(1);

    let mut out = vec![0u8; input.len()];
    for_each_band(&mut out, stride, |y, row| {
        for (x, dst) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let mut luma = 0.0;
            for ny in [y.saturating_sub(1), y, (y + 1).min(last_row)] {
                for nx in [x.saturating_sub(1), x, (x + 1).min(last_col)] {
                    luma += planes[ny * width + nx][0];
                }
            }
            let luma = luma / 9.0;
            let [_, cb, cr] = planes[y * width + x];
            dst[0] = quantize(luma + 1.402 * cr);
            dst[1] = quantize(luma - 0.344_136 * cb - 0.714_136 * cr);
            dst[2] = quantize(luma + 1.772 * cb);
            dst[3] = input[y * stride + x * BYTES_PER_PIXEL + 3];
        }
    });

    PixelBuffer::from_kernel(src.width(), src.height(), out)
}

#[inline]
fn dot(weights: [f64; 3], rgb: [f64; 3]) -> f64 {
    weights[0] * rgb[0] + weights[1] * rgb[1] + weights[2] * rgb[2]
}

/// Split `out` into bands of `band_len` bytes and call `f(band_index, band)`
/// on each, in parallel when the `parallel` feature is enabled.
fn for_each_band<F>(out: &mut [u8], band_len: usize, f: F)
where
    F: Fn(usize, &mut [u8]) + Sync,
{
    if out.is_empty() {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(band_len)
            .enumerate()
            .for_each(|(i, band)| f(i, band));
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (i, band) in out.chunks_mut(band_len).enumerate() {
            f(i, band);
        }
    }
}
