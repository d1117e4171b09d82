//! Owned RGBA8 pixel buffer.
//!
//! [`PixelBuffer`] is the only pixel container the engine deals with: a
//! tightly packed, row-major run of `R, G, B, A` bytes plus its dimensions.
//! The shape invariant (`data.len() == width * height * 4`) is checked once
//! at construction, so kernels can walk the bytes without re-validating.

use core::fmt;

use imgref::{ImgRef, ImgVec};
use rgb::Rgba;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

// ---------------------------------------------------------------------------
// BufferError
// ---------------------------------------------------------------------------

/// Errors from pixel buffer construction and access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BufferError {
    /// Data length does not equal `width * height * 4`.
    #[error("buffer holds {actual} bytes but the declared shape needs {expected}")]
    ShapeMismatch {
        /// Byte count implied by the declared width and height.
        expected: usize,
        /// Byte count actually supplied.
        actual: usize,
    },
    /// Pixel coordinate outside the buffer.
    #[error("pixel ({x}, {y}) is outside the {width}x{height} buffer")]
    OutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },
    /// The dimensions cannot be represented: `width * height * 4` does not
    /// fit in `usize`, or a zero width was converted to an `imgref` image.
    #[error("dimensions {width}x{height} cannot be represented")]
    InvalidDimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
}

// ---------------------------------------------------------------------------
// PixelBuffer
// ---------------------------------------------------------------------------

/// Owned, immutable RGBA8 pixel buffer.
///
/// Rows are tightly packed (stride is always `width * 4`) and channels are
/// straight-alpha `R, G, B, A`. Once built a buffer is never edited in
/// place; kernels produce a fresh buffer of the same shape.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ShapeMismatch`] if `data.len()` is not exactly
    /// `width * height * 4`, or [`BufferError::InvalidDimensions`] if that
    /// product overflows.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len_for(width, height)?;
        if data.len() != expected {
            return Err(BufferError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Allocate a buffer with every pixel set to `color`.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidDimensions`] if the byte size overflows.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self, BufferError> {
        let len = byte_len_for(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / BYTES_PER_PIXEL {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a buffer from typed pixels in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ShapeMismatch`] if `pixels.len()` is not
    /// `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Rgba<u8>]) -> Result<Self, BufferError> {
        let mut data = Vec::with_capacity(pixels.len() * BYTES_PER_PIXEL);
        for px in pixels {
            data.extend_from_slice(&[px.r, px.g, px.b, px.a]);
        }
        Self::new(width, height, data)
    }

    /// Copy an `imgref` view (honoring its stride) into a packed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidDimensions`] if the image is wider or
    /// taller than `u32::MAX`.
    pub fn from_imgref(img: ImgRef<'_, Rgba<u8>>) -> Result<Self, BufferError> {
        let (width, height) = match (u32::try_from(img.width()), u32::try_from(img.height())) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(BufferError::InvalidDimensions {
                    width: u32::try_from(img.width()).unwrap_or(u32::MAX),
                    height: u32::try_from(img.height()).unwrap_or(u32::MAX),
                });
            }
        };
        let mut data = Vec::with_capacity(byte_len_for(width, height)?);
        for px in img.pixels() {
            data.extend_from_slice(&[px.r, px.g, px.b, px.a]);
        }
        Self::new(width, height, data)
    }

    /// Buffer built by a kernel whose output length already matches the
    /// source shape.
    pub(crate) fn from_kernel(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            Some(data.len()),
            byte_len_for(width, height).ok(),
            "kernel produced a buffer of the wrong length"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    /// Length of the backing data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Byte stride between row starts. Always `width * 4`.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Whether `other` has the same width and height.
    #[inline]
    pub fn same_shape(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return the backing bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Read the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::OutOfBounds`] if `x >= width` or `y >= height`.
    pub fn pixel(&self, x: u32, y: u32) -> Result<Rgba<u8>, BufferError> {
        if x >= self.width || y >= self.height {
            return Err(BufferError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        Ok(read_rgba(&self.data[i..i + BYTES_PER_PIXEL]))
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl ExactSizeIterator<Item = Rgba<u8>> + '_ {
        self.data.chunks_exact(BYTES_PER_PIXEL).map(read_rgba)
    }

    /// Copy into a typed `imgref` image.
    ///
    /// # Errors
    ///
    /// `imgref` images need a non-zero stride, so a zero-width buffer fails
    /// with [`BufferError::InvalidDimensions`]. Zero height is fine.
    pub fn to_imgvec(&self) -> Result<ImgVec<Rgba<u8>>, BufferError> {
        if self.width == 0 {
            return Err(BufferError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(ImgVec::new(
            self.pixels().collect(),
            self.width as usize,
            self.height as usize,
        ))
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelBuffer({}x{}, Rgba U8)", self.width, self.height)
    }
}

impl TryFrom<ImgVec<Rgba<u8>>> for PixelBuffer {
    type Error = BufferError;

    fn try_from(img: ImgVec<Rgba<u8>>) -> Result<Self, Self::Error> {
        Self::from_imgref(img.as_ref())
    }
}

impl TryFrom<PixelBuffer> for ImgVec<Rgba<u8>> {
    type Error = BufferError;

    fn try_from(buf: PixelBuffer) -> Result<Self, Self::Error> {
        buf.to_imgvec()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `width * height * 4`, or an error if it overflows `usize`.
pub(crate) fn byte_len_for(width: u32, height: u32) -> Result<usize, BufferError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or(BufferError::InvalidDimensions { width, height })
}

#[inline]
pub(crate) fn read_rgba(bytes: &[u8]) -> Rgba<u8> {
    Rgba::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

#[inline]
pub(crate) fn write_rgba(dst: &mut [u8], px: Rgba<u8>) {
    dst[0] = px.r;
    dst[1] = px.g;
    dst[2] = px.b;
    dst[3] = px.a;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
