//! Original-preserving color filters for interactive image preview.
//!
//! The engine keeps one canonical RGBA8 original per loaded image and
//! serves every filter request from it, so switching between filters never
//! compounds them:
//!
//! - [`PixelBuffer`]: shape-checked RGBA8 pixel storage
//! - [`Transform`]: the closed set of filters, parsed from request ids
//! - [`kernel`] / [`region`]: the pure filter functions
//! - [`OriginalStore`]: the injectable holder of the current original,
//!   versioned by [`Generation`]
//! - [`TransformService`]: snapshot, filter, tag with the generation
//! - [`TransformWorker`]: the same service on a background thread, with
//!   stale responses filtered by generation
//! - [`BufferLimits`]: size caps a store enforces on every new original
//!
//! Decoding, file I/O and display are left to the caller.
//!
//! ```
//! use std::sync::Arc;
//! use zenfilter::{OriginalStore, PixelBuffer, Transform, TransformService};
//!
//! let store = Arc::new(OriginalStore::new());
//! let service = TransformService::new(Arc::clone(&store));
//!
//! let generation = store.set(PixelBuffer::new(1, 1, vec![255, 255, 255, 255])?)?;
//! let sepia = service.apply(Transform::Sepia)?;
//! assert_eq!(sepia.generation(), generation);
//! assert_eq!(sepia.buffer().as_bytes(), &[255, 255, 239, 255]);
//! # Ok::<(), zenfilter::TransformError>(())
//! ```

#![forbid(unsafe_code)]

mod buffer;
mod error;
pub mod kernel;
mod limits;
pub mod region;
mod service;
mod store;
mod transform;
mod worker;

pub use buffer::{BYTES_PER_PIXEL, BufferError, PixelBuffer};
pub use error::TransformError;
pub use limits::{BufferLimits, Limit, LimitExceeded};
pub use service::{TransformService, Transformed};
pub use store::{Generation, OriginalStore, Snapshot};
pub use transform::Transform;
pub use worker::{RequestId, Response, SubmitError, TransformWorker, WorkerError};

// Re-exports for callers building buffers from typed pixels.
pub use imgref::{ImgRef, ImgVec};
pub use rgb::Rgba;
