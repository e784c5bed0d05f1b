use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aegis_types::primitives::ValidatorKey;

/// Number of registered keys above which idle lock entries are pruned.
const PRUNE_THRESHOLD: usize = 256;

/// Lazily-created per-key mutexes.
///
/// Signing requests for one key must be serialized end-to-end (pre-sign
/// check, external sign, post-sign commit); requests for different keys must
/// not contend. The registry hands out one `Arc<Mutex<()>>` per key and
/// drops entries nobody holds once the map grows past [`PRUNE_THRESHOLD`].
#[derive(Default)]
pub(crate) struct KeyLockRegistry {
    locks: Mutex<HashMap<ValidatorKey, Arc<Mutex<()>>>>,
}

/// Handle to one key's lock, detached from the registry map.
pub(crate) struct KeyLock(Arc<Mutex<()>>);

impl KeyLock {
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        // A poisoned lock means a previous attempt panicked mid-request; the
        // store itself stays consistent (commits are atomic), so the lock is
        // still usable.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyLockRegistry {
    pub(crate) fn acquire(&self, pubkey: &ValidatorKey) -> KeyLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= PRUNE_THRESHOLD {
            // Entries with strong_count == 1 are referenced by the map alone:
            // no request is holding or waiting on them.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        KeyLock(Arc::clone(locks.entry(*pubkey).or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_shares_one_lock() {
        let registry = KeyLockRegistry::default();
        let key = ValidatorKey::repeat_byte(1);

        let a = registry.acquire(&key);
        let b = registry.acquire(&key);
        assert!(Arc::ptr_eq(&a.0, &b.0));

        let other = registry.acquire(&ValidatorKey::repeat_byte(2));
        assert!(!Arc::ptr_eq(&a.0, &other.0));
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let registry = KeyLockRegistry::default();
        let a = registry.acquire(&ValidatorKey::repeat_byte(1));
        let b = registry.acquire(&ValidatorKey::repeat_byte(2));

        let _held_a = a.hold();
        // Holding key 1 must not make key 2 unavailable.
        let _held_b = b.hold();
    }

    #[test]
    fn test_idle_entries_are_pruned() {
        let registry = KeyLockRegistry::default();
        for i in 0..PRUNE_THRESHOLD {
            let mut key = [0u8; 48];
            key[..8].copy_from_slice(&(i as u64).to_be_bytes());
            registry.acquire(&ValidatorKey::from_slice(&key));
        }
        assert_eq!(registry.locks.lock().unwrap().len(), PRUNE_THRESHOLD);

        // The next acquire crosses the threshold and sweeps idle entries.
        let held = registry.acquire(&ValidatorKey::repeat_byte(0xff));
        let _guard = held.hold();
        registry.acquire(&ValidatorKey::repeat_byte(0xfe));
        assert!(registry.locks.lock().unwrap().len() <= 2);
    }
}
