//! Holder for the canonical original of the loaded image.
//!
//! An [`OriginalStore`] is an ordinary value: create one per preview
//! session, wrap it in an [`Arc`], and hand the same handle to the
//! [`TransformService`](crate::TransformService) and the code that loads
//! images. Independent stores never observe each other.
//!
//! A store may carry [`BufferLimits`]; [`set`](OriginalStore::set) refuses
//! buffers that break them and keeps the current original.

use core::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{BufferLimits, PixelBuffer, TransformError};

/// Identifies which original a snapshot or result was taken from.
///
/// Generations start at 1 and grow by one on every
/// [`set`](OriginalStore::set). Clearing the store does not reset the
/// counter, so a generation is never handed out twice by the same store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// A shared, immutable view of the original at one generation.
///
/// Snapshots stay valid after the store moves on; they just stop being
/// current.
#[derive(Clone, Debug)]
pub struct Snapshot {
    generation: Generation,
    buffer: Arc<PixelBuffer>,
}

impl Snapshot {
    /// Generation this snapshot belongs to.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The original pixels.
    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Take the pixels out, copying only if other snapshots share them.
    pub fn into_buffer(self) -> PixelBuffer {
        Arc::unwrap_or_clone(self.buffer)
    }
}

#[derive(Default)]
struct Slot {
    current: Option<Snapshot>,
    last_generation: u64,
}

/// The single canonical original for the currently loaded image.
///
/// All mutation goes through [`set`](Self::set) and [`clear`](Self::clear).
/// Reads clone an `Arc` under a short read lock; the lock is never held
/// while pixels are processed.
#[derive(Default)]
pub struct OriginalStore {
    slot: RwLock<Slot>,
    limits: BufferLimits,
}

impl OriginalStore {
    /// Create an empty store that accepts any buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that refuses buffers breaking `limits`.
    pub fn with_limits(limits: BufferLimits) -> Self {
        Self {
            slot: RwLock::default(),
            limits,
        }
    }

    /// Caps applied by [`set`](Self::set).
    pub fn limits(&self) -> BufferLimits {
        self.limits
    }

    /// Replace the original. Returns the new generation.
    ///
    /// Any previous original is dropped once no snapshot refers to it.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Limit`] if `buffer` breaks the store's
    /// limits. The current original and generation are left as they were.
    pub fn set(&self, buffer: PixelBuffer) -> Result<Generation, TransformError> {
        let (width, height) = (buffer.width(), buffer.height());
        if let Err(e) = self.limits.check(&buffer) {
            log::warn!("refused {width}x{height} original: {e}");
            return Err(e.into());
        }
        let buffer = Arc::new(buffer);
        let mut slot = self.write();
        slot.last_generation += 1;
        let generation = Generation(slot.last_generation);
        slot.current = Some(Snapshot { generation, buffer });
        drop(slot);
        log::debug!("original set: {width}x{height} at {generation}");
        Ok(generation)
    }

    /// Snapshot the current original.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotLoaded`] if nothing has been set, or the
    /// store was cleared.
    pub fn get(&self) -> Result<Snapshot, TransformError> {
        self.read().current.clone().ok_or(TransformError::NotLoaded)
    }

    /// Drop the current original.
    pub fn clear(&self) {
        let previous = self.write().current.take();
        if let Some(snapshot) = previous {
            log::debug!("original cleared at {}", snapshot.generation);
        }
    }

    /// Generation of the current original, if one is loaded.
    pub fn generation(&self) -> Option<Generation> {
        self.read().current.as_ref().map(Snapshot::generation)
    }

    /// Whether `generation` is still the loaded original.
    ///
    /// A result computed from an older generation, or computed before a
    /// [`clear`](Self::clear), is stale and should not be displayed.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation() == Some(generation)
    }

    /// Whether an original is loaded.
    pub fn is_loaded(&self) -> bool {
        self.read().current.is_some()
    }

    // Every write leaves the slot consistent, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OriginalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.read();
        match &slot.current {
            Some(s) => write!(f, "OriginalStore({}, {:?})", s.generation, s.buffer),
            None => write!(f, "OriginalStore(empty, last gen#{})", slot.last_generation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Limit, LimitExceeded};
    use rgb::Rgba;

    fn solid(width: u32, height: u32, v: u8) -> PixelBuffer {
        PixelBuffer::filled(width, height, Rgba::new(v, v, v, 255)).unwrap()
    }

    #[test]
    fn starts_empty() {
        let store = OriginalStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.generation(), None);
        assert_eq!(store.get().unwrap_err(), TransformError::NotLoaded);
    }

    #[test]
    fn set_then_get() {
        let store = OriginalStore::new();
        let generation = store.set(solid(3, 2, 7)).unwrap();
        let snap = store.get().unwrap();
        assert_eq!(snap.generation(), generation);
        assert_eq!(snap.buffer(), &solid(3, 2, 7));
        assert!(store.is_current(generation));
    }

    #[test]
    fn generations_are_monotonic_across_clear() {
        let store = OriginalStore::new();
        let g1 = store.set(solid(1, 1, 1)).unwrap();
        let g2 = store.set(solid(1, 1, 2)).unwrap();
        store.clear();
        let g3 = store.set(solid(1, 1, 3)).unwrap();
        assert_eq!((g1.get(), g2.get(), g3.get()), (1, 2, 3));
        assert!(!store.is_current(g1));
        assert!(!store.is_current(g2));
        assert!(store.is_current(g3));
    }

    #[test]
    fn set_replaces_but_old_snapshot_survives() {
        let store = OriginalStore::new();
        store.set(solid(2, 2, 10)).unwrap();
        let old = store.get().unwrap();
        store.set(solid(4, 1, 20)).unwrap();
        assert_eq!(old.buffer(), &solid(2, 2, 10));
        assert!(!store.is_current(old.generation()));
        assert_eq!(store.get().unwrap().buffer().width(), 4);
    }

    #[test]
    fn clear_unloads() {
        let store = OriginalStore::new();
        let generation = store.set(solid(1, 1, 0)).unwrap();
        store.clear();
        assert!(!store.is_loaded());
        assert!(!store.is_current(generation));
        assert_eq!(store.get().unwrap_err(), TransformError::NotLoaded);
        // clearing an empty store is a no-op
        store.clear();
        assert!(!store.is_loaded());
    }

    #[test]
    fn into_buffer_copies_only_when_shared() {
        let store = OriginalStore::new();
        store.set(solid(2, 1, 5)).unwrap();
        let snap = store.get().unwrap();
        let owned = snap.into_buffer();
        assert_eq!(owned, solid(2, 1, 5));
        // the store still holds its own reference
        assert!(store.is_loaded());
    }

    #[test]
    fn independent_stores() {
        let a = OriginalStore::new();
        let b = OriginalStore::new();
        a.set(solid(1, 1, 1)).unwrap();
        assert!(a.is_loaded());
        assert!(!b.is_loaded());
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        use rayon::prelude::*;

        let store = OriginalStore::new();
        store.set(solid(8, 8, 0)).unwrap();
        (1..=64u8).into_par_iter().for_each(|v| {
            if v % 4 == 0 {
                store.set(solid(8, 8, v)).unwrap();
            } else {
                let snap = store.get().unwrap();
                let first = snap.buffer().as_bytes()[0];
                // a snapshot is never a mix of two originals
                assert!(snap.buffer().pixels().all(|p| p.r == first));
            }
        });
        assert_eq!(store.generation().unwrap().get(), 17);
    }

    #[test]
    fn limits_refuse_oversized_originals() {
        let limits = BufferLimits::default().max_width(4).max_pixels(8);
        let store = OriginalStore::with_limits(limits);
        assert_eq!(store.limits(), limits);
        let g1 = store.set(solid(4, 2, 1)).unwrap();

        let err = store.set(solid(5, 1, 2)).unwrap_err();
        assert_eq!(
            err,
            TransformError::Limit(LimitExceeded {
                limit: Limit::Width,
                actual: 5,
                max: 4
            })
        );
        assert!(matches!(
            store.set(solid(3, 3, 3)),
            Err(TransformError::Limit(LimitExceeded {
                limit: Limit::Pixels,
                ..
            }))
        ));

        // refused loads leave the previous original in place
        assert!(store.is_current(g1));
        assert_eq!(store.get().unwrap().buffer(), &solid(4, 2, 1));
        assert_eq!(store.set(solid(2, 2, 4)).unwrap().get(), 2);
    }

    #[test]
    fn default_store_is_unlimited() {
        let store = OriginalStore::new();
        assert!(store.limits().is_unlimited());
        assert!(store.set(solid(512, 512, 0)).is_ok());
    }

    #[test]
    fn debug_format() {
        let store = OriginalStore::new();
        assert_eq!(format!("{store:?}"), "OriginalStore(empty, last gen#0)");
        store.set(solid(2, 3, 0)).unwrap();
        assert_eq!(
            format!("{store:?}"),
            "OriginalStore(gen#1, PixelBuffer(2x3, Rgba U8))"
        );
    }
}
