//! Size caps enforced when an original is stored.
//!
//! An [`OriginalStore`](crate::OriginalStore) built with
//! [`with_limits`](crate::OriginalStore::with_limits) refuses any buffer
//! that breaks its [`BufferLimits`], before the buffer replaces the current
//! original. Every later transform allocates one output of the same size,
//! so the memory cap is checked against the original plus that output.

use core::fmt;

use crate::PixelBuffer;
use crate::buffer::BYTES_PER_PIXEL;

/// Caps on what a store will accept as its original.
///
/// Unset caps do not limit anything. The default accepts every buffer.
///
/// ```
/// use zenfilter::{BufferLimits, PixelBuffer, Rgba};
///
/// let limits = BufferLimits::default().max_pixels(4).max_working_set(64);
/// let small = PixelBuffer::filled(2, 2, Rgba::new(0, 0, 0, 255))?;
/// assert!(limits.check(&small).is_ok());
/// let wide = PixelBuffer::filled(5, 1, Rgba::new(0, 0, 0, 255))?;
/// assert!(limits.check(&wide).is_err());
/// # Ok::<(), zenfilter::BufferError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferLimits {
    width: Option<u32>,
    height: Option<u32>,
    pixels: Option<u64>,
    working_set: Option<u64>,
}

impl BufferLimits {
    /// Cap the image width.
    pub fn max_width(self, width: u32) -> Self {
        Self {
            width: Some(width),
            ..self
        }
    }

    /// Cap the image height.
    pub fn max_height(self, height: u32) -> Self {
        Self {
            height: Some(height),
            ..self
        }
    }

    /// Cap `width * height`.
    pub fn max_pixels(self, pixels: u64) -> Self {
        Self {
            pixels: Some(pixels),
            ..self
        }
    }

    /// Cap the bytes one transform holds at once, see
    /// [`working_set`](Self::working_set).
    pub fn max_working_set(self, bytes: u64) -> Self {
        Self {
            working_set: Some(bytes),
            ..self
        }
    }

    /// Whether this accepts every buffer.
    pub fn is_unlimited(&self) -> bool {
        *self == Self::default()
    }

    /// Bytes held while transforming a `width x height` original: the
    /// original and its output.
    pub fn working_set(width: u32, height: u32) -> u64 {
        u64::from(width) * u64::from(height) * BYTES_PER_PIXEL as u64 * 2
    }

    /// Check `buffer` against every cap.
    ///
    /// Caps are tried in a fixed order (width, height, pixels, working set)
    /// and the first one broken is reported.
    ///
    /// # Errors
    ///
    /// Returns [`LimitExceeded`] naming the broken cap.
    pub fn check(&self, buffer: &PixelBuffer) -> Result<(), LimitExceeded> {
        let (w, h) = (buffer.width(), buffer.height());
        let caps = [
            (Limit::Width, u64::from(w), self.width.map(u64::from)),
            (Limit::Height, u64::from(h), self.height.map(u64::from)),
            (Limit::Pixels, u64::from(w) * u64::from(h), self.pixels),
            (Limit::WorkingSet, Self::working_set(w, h), self.working_set),
        ];
        for (limit, actual, max) in caps {
            if let Some(max) = max
                && actual > max
            {
                return Err(LimitExceeded { limit, actual, max });
            }
        }
        Ok(())
    }
}

/// Which cap a buffer broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Limit {
    /// Image width.
    Width,
    /// Image height.
    Height,
    /// Total pixel count.
    Pixels,
    /// Original plus one transform output, in bytes.
    WorkingSet,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Limit::Width => "width",
            Limit::Height => "height",
            Limit::Pixels => "pixel count",
            Limit::WorkingSet => "working set",
        })
    }
}

/// A buffer was refused by [`BufferLimits::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{limit} {actual} is over the store cap of {max}")]
pub struct LimitExceeded {
    /// The cap that was broken.
    pub limit: Limit,
    /// The buffer's value.
    pub actual: u64,
    /// The configured cap.
    pub max: u64,
}
