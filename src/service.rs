//! Serving transform requests from the stored original.

use std::sync::Arc;

use crate::store::{Generation, OriginalStore};
use crate::{PixelBuffer, Transform, TransformError, kernel};

/// Output of one transform request.
///
/// Carries the generation of the original it was computed from, so a
/// caller that receives it late can tell whether it still applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transformed {
    generation: Generation,
    transform: Transform,
    buffer: PixelBuffer,
}

impl Transformed {
    /// Generation of the original this result was computed from.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The transform that produced this result.
    #[inline]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Transformed pixels.
    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Take the transformed pixels.
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// Whether `store` still holds the original this result came from.
    pub fn is_current(&self, store: &OriginalStore) -> bool {
        store.is_current(self.generation)
    }
}

/// Stateless request handler over a shared [`OriginalStore`].
///
/// Every call reads the store exactly once and runs the kernel on that
/// snapshot, so transforms never compound: "sepia then invert" is just
/// invert of the original. Clones share the same store.
///
/// ```
/// use std::sync::Arc;
/// use zenfilter::{OriginalStore, PixelBuffer, TransformService};
///
/// let store = Arc::new(OriginalStore::new());
/// let service = TransformService::new(Arc::clone(&store));
///
/// store.set(PixelBuffer::new(1, 1, vec![10, 20, 30, 255])?)?;
/// let out = service.apply_named("invert")?;
/// assert_eq!(out.buffer().as_bytes(), &[245, 235, 225, 255]);
/// # Ok::<(), zenfilter::TransformError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TransformService {
    store: Arc<OriginalStore>,
}

impl TransformService {
    /// Serve requests from `store`.
    pub fn new(store: Arc<OriginalStore>) -> Self {
        Self { store }
    }

    /// The store this service reads from.
    pub fn store(&self) -> &Arc<OriginalStore> {
        &self.store
    }

    /// Apply `transform` to the current original.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotLoaded`] if no original is set, or a
    /// shape mismatch if the kernel output does not match the original's
    /// shape.
    pub fn apply(&self, transform: Transform) -> Result<Transformed, TransformError> {
        let snapshot = self.store.get()?;
        let src = snapshot.buffer();
        let buffer = kernel::apply(transform, src);
        check_shape(src, &buffer)?;
        log::trace!(
            "{transform} served for {} ({}x{})",
            snapshot.generation(),
            src.width(),
            src.height()
        );
        Ok(Transformed {
            generation: snapshot.generation(),
            transform,
            buffer,
        })
    }

    /// Parse `id` and apply it.
    ///
    /// The identifier is validated before the store is consulted, so an
    /// unknown name is reported even when nothing is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnknownTransform`] or
    /// [`TransformError::InvalidParameter`] for a bad identifier, then
    /// anything [`apply`](Self::apply) returns.
    pub fn apply_named(&self, id: &str) -> Result<Transformed, TransformError> {
        self.apply(Transform::parse(id)?)
    }
}

fn check_shape(src: &PixelBuffer, out: &PixelBuffer) -> Result<(), TransformError> {
    if out.same_shape(src) && out.byte_len() == src.byte_len() {
        return Ok(());
    }
    log::warn!("kernel output {out:?} does not match original {src:?}");
    Err(crate::BufferError::ShapeMismatch {
        expected: src.byte_len(),
        actual: out.byte_len(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::Rgba;

    fn service() -> (Arc<OriginalStore>, TransformService) {
        let store = Arc::new(OriginalStore::new());
        let service = TransformService::new(Arc::clone(&store));
        (store, service)
    }

    fn two_by_one() -> PixelBuffer {
        PixelBuffer::new(2, 1, vec![10, 20, 30, 255, 200, 100, 50, 128]).unwrap()
    }

    #[test]
    fn not_loaded_until_set() {
        let (store, service) = service();
        assert_eq!(
            service.apply(Transform::Sepia).unwrap_err(),
            TransformError::NotLoaded
        );
        store.set(PixelBuffer::filled(5, 3, Rgba::new(1, 2, 3, 4)).unwrap()).unwrap();
        let out = service.apply(Transform::Sepia).unwrap();
        assert_eq!((out.buffer().width(), out.buffer().height()), (5, 3));
    }

    #[test]
    fn unknown_transform_checked_before_store() {
        let (_, service) = service();
        assert_eq!(
            service.apply_named("emboss").unwrap_err(),
            TransformError::UnknownTransform("emboss".into())
        );
        assert_eq!(
            service.apply_named("grayscale").unwrap_err(),
            TransformError::NotLoaded
        );
    }

    #[test]
    fn original_returns_stored_bytes() {
        let (store, service) = service();
        store.set(two_by_one()).unwrap();
        let out = service.apply(Transform::Original).unwrap();
        assert_eq!(out.buffer(), &two_by_one());
        assert_eq!(out.transform(), Transform::Original);
    }

    #[test]
    fn invert_scenario() {
        let (store, service) = service();
        store.set(two_by_one()).unwrap();
        let out = service.apply_named("invert").unwrap();
        assert_eq!(
            out.into_buffer().into_vec(),
            vec![245, 235, 225, 255, 55, 155, 205, 128]
        );
    }

    #[test]
    fn white_pixel_scenario() {
        let (store, service) = service();
        store.set(PixelBuffer::new(1, 1, vec![255; 4]).unwrap()).unwrap();
        let gray = service.apply(Transform::Grayscale).unwrap();
        assert_eq!(gray.buffer().as_bytes(), &[255, 255, 255, 255]);
        let sepia = service.apply(Transform::Sepia).unwrap();
        assert_eq!(sepia.buffer().as_bytes(), &[255, 255, 239, 255]);
    }

    #[test]
    fn transforms_never_compound() {
        let (store, service) = service();
        store.set(two_by_one()).unwrap();
        let direct = service.apply(Transform::Invert).unwrap();
        service.apply(Transform::Sepia).unwrap();
        service.apply(Transform::Grayscale).unwrap();
        let again = service.apply(Transform::Invert).unwrap();
        assert_eq!(direct, again);
        assert_eq!(store.get().unwrap().buffer(), &two_by_one());
    }

    #[test]
    fn result_goes_stale_after_new_load() {
        let (store, service) = service();
        store.set(two_by_one()).unwrap();
        let early = service.apply(Transform::Sepia).unwrap();
        assert!(early.is_current(&store));
        store.set(PixelBuffer::filled(1, 1, Rgba::new(0, 0, 0, 0)).unwrap()).unwrap();
        assert!(!early.is_current(&store));
        let late = service.apply(Transform::Sepia).unwrap();
        assert!(late.is_current(&store));
        assert!(late.generation() > early.generation());
        store.clear();
        assert!(!late.is_current(&store));
    }

    #[test]
    fn every_transform_preserves_shape() {
        let (store, service) = service();
        let data = (0..7 * 5 * 4).map(|i| (i * 37 % 256) as u8).collect();
        store.set(PixelBuffer::new(7, 5, data).unwrap()).unwrap();
        for id in ["original", "invert", "grayscale", "sepia", "mosaic:3", "smooth"] {
            let out = service.apply_named(id).unwrap();
            assert_eq!((out.buffer().width(), out.buffer().height()), (7, 5), "{id}");
        }
    }

    #[test]
    fn shape_check_rejects_mismatch() {
        let a = PixelBuffer::new(2, 1, vec![0; 8]).unwrap();
        let b = PixelBuffer::new(1, 2, vec![0; 8]).unwrap();
        assert!(check_shape(&a, &a).is_ok());
        assert!(check_shape(&a, &b).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn clones_share_the_store() {
        let (store, service) = service();
        let other = service.clone();
        store.set(two_by_one()).unwrap();
        assert!(other.apply(Transform::Original).is_ok());
        assert!(Arc::ptr_eq(service.store(), other.store()));
    }
}
