use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use aegis_storage::StoreError;
use aegis_types::{
    primitives::{Epoch, ValidatorIndex},
    span::EpochSpan,
};
use lru::LruCache;

use crate::metrics;

/// Bounded cache of span maps for recently active validators.
///
/// Purely derived state: every entry can be reloaded from the store with a
/// single prefix scan, so the cache is never persisted and never trusted
/// after a commit failure (see [`SpanCache::invalidate`]). Eviction is LRU by
/// validator index, sized for the common case of densely-arriving
/// attestations from the same hot validators.
pub(crate) struct SpanCache {
    entries: Mutex<LruCache<ValidatorIndex, BTreeMap<Epoch, EpochSpan>>>,
}

impl SpanCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Run `f` over the validator's span map, loading it on a cache miss.
    ///
    /// Mutations made by `f` stay in the cache (write-through to the store is
    /// the caller's job, batched with the attestation record).
    pub(crate) fn with_spans<R>(
        &self,
        validator_index: ValidatorIndex,
        load: impl FnOnce() -> Result<BTreeMap<Epoch, EpochSpan>, StoreError>,
        f: impl FnOnce(&mut BTreeMap<Epoch, EpochSpan>) -> R,
    ) -> Result<R, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(spans) = entries.get_mut(&validator_index) {
            metrics::inc_span_cache_hit();
            return Ok(f(spans));
        }

        metrics::inc_span_cache_miss();
        let mut spans = load()?;
        let result = f(&mut spans);
        entries.put(validator_index, spans);
        Ok(result)
    }

    /// Drop a validator's cached spans so the next access reloads them.
    ///
    /// Called when a store commit fails after the cached copy was already
    /// tightened; the store is the only source of truth.
    pub(crate) fn invalidate(&self, validator_index: ValidatorIndex) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.pop(&validator_index);
    }
}
