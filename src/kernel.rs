//! Point-wise color kernels.
//!
//! Every kernel maps a [`PixelBuffer`] to a new buffer of the same shape.
//! Each output pixel depends only on the input pixel at the same position,
//! so the shared loop is free to visit pixels in any order; with the
//! `parallel` feature it is split across the rayon pool.
//!
//! Arithmetic is done in `f64`, rounded half-up, and saturated to
//! `[0, 255]`. Alpha always passes through.

use rgb::Rgba;

use crate::buffer::{BYTES_PER_PIXEL, read_rgba, write_rgba};
use crate::{PixelBuffer, Transform, region};

/// BT.601 luma weights.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Sepia tone matrix, one row per output channel.
pub const SEPIA_MATRIX: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Minimum pixels per rayon task.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_PIXELS: usize = 4096;

/// Run `transform` against `src`.
pub fn apply(transform: Transform, src: &PixelBuffer) -> PixelBuffer {
    match transform {
        Transform::Original => identity(src),
        Transform::Invert => invert(src),
        Transform::Grayscale => grayscale(src),
        Transform::Sepia => sepia(src),
        Transform::Mosaic { block } => region::mosaic(src, block),
        Transform::Smooth => region::smooth(src),
    }
}

/// Copy of the input.
pub fn identity(src: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_kernel(src.width(), src.height(), src.as_bytes().to_vec())
}

/// Invert the color channels.
pub fn invert(src: &PixelBuffer) -> PixelBuffer {
    map_pixels(src, invert_pixel)
}

/// Replace color with BT.601 luma.
pub fn grayscale(src: &PixelBuffer) -> PixelBuffer {
    map_pixels(src, grayscale_pixel)
}

/// Apply the sepia tone matrix.
pub fn sepia(src: &PixelBuffer) -> PixelBuffer {
    map_pixels(src, sepia_pixel)
}

/// Invert one pixel's color channels.
#[inline]
pub fn invert_pixel(px: Rgba<u8>) -> Rgba<u8> {
    Rgba::new(255 - px.r, 255 - px.g, 255 - px.b, px.a)
}

/// BT.601 luma of one pixel, written to all three color channels.
#[inline]
pub fn grayscale_pixel(px: Rgba<u8>) -> Rgba<u8> {
    let l = quantize(dot(LUMA_WEIGHTS, px));
    Rgba::new(l, l, l, px.a)
}

/// Sepia tone of one pixel.
#[inline]
pub fn sepia_pixel(px: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b] = SEPIA_MATRIX.map(|row| quantize(dot(row, px)));
    Rgba::new(r, g, b, px.a)
}

/// Round half-up and saturate to a channel value.
#[inline]
pub(crate) fn quantize(v: f64) -> u8 {
    // NaN saturates to 0 under `as`
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

#[inline]
fn dot(weights: [f64; 3], px: Rgba<u8>) -> f64 {
    weights[0] * px.r as f64 + weights[1] * px.g as f64 + weights[2] * px.b as f64
}

/// Shared per-pixel loop: allocate an output of the same shape and fill it
/// with `f` applied to each input pixel.
fn map_pixels<F>(src: &PixelBuffer, f: F) -> PixelBuffer
where
    F: Fn(Rgba<u8>) -> Rgba<u8> + Sync,
{
    let input = src.as_bytes();
    let mut out = vec![0u8; input.len()];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.par_chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(input.par_chunks_exact(BYTES_PER_PIXEL))
            .with_min_len(PARALLEL_MIN_PIXELS)
            .for_each(|(dst, px)| write_rgba(dst, f(read_rgba(px))));
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (dst, px) in out
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(input.chunks_exact(BYTES_PER_PIXEL))
        {
            write_rgba(dst, f(read_rgba(px)));
        }
    }

    PixelBuffer::from_kernel(src.width(), src.height(), out)
}
