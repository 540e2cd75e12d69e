//! Single-slot memoization of the last calibration model built.
//!
//! The slot is keyed by the catalog [`Entry`] the model was built from and
//! compared with the entry equality contract, so a request resolving to a
//! duplicate of the cached entry is a hit. The lookup, the build and the
//! replacement happen under one lock.
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::database::entry::Entry;

type Slot<M> = Option<(Entry, Arc<M>)>;

#[derive(Debug)]
pub struct CalibratorCache<M> {
    slot: Mutex<Slot<M>>,
}

impl<M> Default for CalibratorCache<M> {
    fn default() -> Self {
        CalibratorCache {
            slot: Mutex::new(None),
        }
    }
}

impl<M> CalibratorCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot<M>> {
        // a panic while building leaves the slot in its previous, valid state
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached model when `key` equals the cached entry, otherwise build,
    /// remember and return a new one
    ///
    /// A failed build leaves the previous slot untouched.
    pub fn get_or_try_build<E, F>(&self, key: &Entry, build: F) -> Result<Arc<M>, E>
    where
        F: FnOnce() -> Result<M, E>,
    {
        let mut slot = self.lock();
        if let Some((cached, model)) = slot.as_ref() {
            if cached == key {
                debug!("using cached calibrator {}", cached.filename);
                return Ok(Arc::clone(model));
            }
        }

        let model = Arc::new(build()?);
        *slot = Some((key.clone(), Arc::clone(&model)));
        Ok(model)
    }
}
