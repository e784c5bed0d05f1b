use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::api::{StorageBackend, Table};
use aegis_types::{
    primitives::{Decode, Encode, Epoch, H256, Slot, ValidatorIndex, ValidatorKey},
    record::{SignedAttestationRecord, SignedBlockRecord},
    span::EpochSpan,
};
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by the protection store.
///
/// Every variant is fatal to the signing attempt that triggered it: a
/// decision that cannot be made from intact, readable history must fail
/// closed, so callers reject the signature rather than guess.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend fault: {0}")]
    Backend(String),
    #[error("corrupt record in {table:?}: {reason}")]
    Corrupt { table: Table, reason: String },
    #[error("genesis validators root mismatch: store has {stored}, caller supplied {supplied}")]
    GenesisRootMismatch { stored: H256, supplied: H256 },
}

impl StoreError {
    fn backend(err: crate::api::Error) -> Self {
        Self::Backend(err.to_string())
    }

    fn corrupt(table: Table, reason: impl std::fmt::Debug) -> Self {
        Self::Corrupt {
            table,
            reason: format!("{reason:?}"),
        }
    }
}

// ============ Metadata Keys ============

/// Key for the genesis validators root scoping all history to one chain.
/// Its value has type [`H256`] and it's SSZ-encoded.
const KEY_GENESIS_VALIDATORS_ROOT: &[u8] = b"genesis_validators_root";

// ============ Key Encoding Helpers ============

/// Encode a (pubkey, index) composite key.
/// Layout: pubkey (48 bytes) || index (8 bytes big-endian)
///
/// Big-endian suffixes keep lexicographic order equal to numeric order, so
/// one key's history is a contiguous, ordered range under its prefix.
fn pubkey_key(pubkey: &ValidatorKey, index: u64) -> Vec<u8> {
    let mut key = pubkey.as_slice().to_vec();
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// Encode a (validator_index, epoch) composite key.
/// Layout: validator_index (8 bytes big-endian) || epoch (8 bytes big-endian)
fn index_key(validator_index: ValidatorIndex, epoch: Epoch) -> Vec<u8> {
    let mut key = validator_index.to_be_bytes().to_vec();
    key.extend_from_slice(&epoch.to_be_bytes());
    key
}

/// Durable signing-history store shared by the validator-side guard and the
/// network-side slasher, backed by a pluggable storage backend.
///
/// The store itself does not serialize concurrent mutations of one key's
/// history; the guard's per-key locks do. All reads feeding one decision are
/// taken from a single read view, and every mutation commits through one
/// atomic write batch.
#[derive(Clone)]
pub struct ProtectionStore {
    /// Storage backend for all protection data.
    backend: Arc<dyn StorageBackend>,
}

impl ProtectionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    // ============ Read/Write Helpers ============

    fn read_value<T: Decode>(&self, table: Table, key: &[u8]) -> Result<Option<T>, StoreError> {
        let view = self.backend.begin_read().map_err(StoreError::backend)?;
        let Some(bytes) = view.get(table, key).map_err(StoreError::backend)? else {
            return Ok(None);
        };
        let value = T::from_ssz_bytes(&bytes).map_err(|e| StoreError::corrupt(table, e))?;
        Ok(Some(value))
    }

    fn write_value<T: Encode>(&self, table: Table, key: Vec<u8>, value: &T) -> Result<(), StoreError> {
        let mut batch = self.backend.begin_write().map_err(StoreError::backend)?;
        batch
            .put_batch(table, vec![(key, value.as_ssz_bytes())])
            .map_err(StoreError::backend)?;
        batch.commit().map_err(StoreError::backend)
    }

    /// Collect and decode every entry under `prefix`, together with the
    /// big-endian integer suffix of its key.
    fn read_prefixed<T: Decode>(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(u64, T)>, StoreError> {
        let view = self.backend.begin_read().map_err(StoreError::backend)?;
        let mut entries = Vec::new();
        for result in view
            .prefix_iterator(table, prefix)
            .map_err(StoreError::backend)?
        {
            let (key, value) = result.map_err(StoreError::backend)?;
            let suffix = key
                .get(prefix.len()..)
                .and_then(|s| <[u8; 8]>::try_from(s).ok())
                .ok_or_else(|| StoreError::corrupt(table, "bad key length"))?;
            let decoded =
                T::from_ssz_bytes(&value).map_err(|e| StoreError::corrupt(table, e))?;
            entries.push((u64::from_be_bytes(suffix), decoded));
        }
        Ok(entries)
    }

    // ============ Genesis Validators Root ============

    pub fn genesis_validators_root(&self) -> Result<Option<H256>, StoreError> {
        self.read_value(Table::Metadata, KEY_GENESIS_VALIDATORS_ROOT)
    }

    /// Set the genesis validators root, or verify it if already set.
    ///
    /// A store scoped to one chain never accepts history from another:
    /// writing a differing root is a hard error, not an overwrite.
    pub fn save_genesis_validators_root(&self, root: H256) -> Result<(), StoreError> {
        match self.genesis_validators_root()? {
            Some(stored) if stored == root => Ok(()),
            Some(stored) => Err(StoreError::GenesisRootMismatch {
                stored,
                supplied: root,
            }),
            None => self.write_value(
                Table::Metadata,
                KEY_GENESIS_VALIDATORS_ROOT.to_vec(),
                &root,
            ),
        }
    }

    // ============ Signed Blocks ============

    pub fn block_at_slot(
        &self,
        pubkey: &ValidatorKey,
        slot: Slot,
    ) -> Result<Option<SignedBlockRecord>, StoreError> {
        self.read_value(Table::SignedBlocks, &pubkey_key(pubkey, slot))
    }

    /// The highest-slot block ever signed by this key, if any.
    pub fn highest_signed_block(
        &self,
        pubkey: &ValidatorKey,
    ) -> Result<Option<SignedBlockRecord>, StoreError> {
        let entries: Vec<(u64, SignedBlockRecord)> =
            self.read_prefixed(Table::SignedBlocks, pubkey.as_slice())?;
        Ok(entries
            .into_iter()
            .max_by_key(|(slot, _)| *slot)
            .map(|(_, record)| record))
    }

    /// All recorded blocks for a key, ordered by slot.
    pub fn signed_blocks(
        &self,
        pubkey: &ValidatorKey,
    ) -> Result<Vec<SignedBlockRecord>, StoreError> {
        let mut entries: Vec<(u64, SignedBlockRecord)> =
            self.read_prefixed(Table::SignedBlocks, pubkey.as_slice())?;
        entries.sort_by_key(|(slot, _)| *slot);
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }

    pub fn record_signed_block(
        &self,
        pubkey: &ValidatorKey,
        record: SignedBlockRecord,
    ) -> Result<(), StoreError> {
        self.write_value(
            Table::SignedBlocks,
            pubkey_key(pubkey, record.slot),
            &record,
        )
    }

    // ============ Signed Attestations ============

    pub fn attestation_at_target(
        &self,
        pubkey: &ValidatorKey,
        target: Epoch,
    ) -> Result<Option<SignedAttestationRecord>, StoreError> {
        self.read_value(Table::SignedAttestations, &pubkey_key(pubkey, target))
    }

    /// All recorded attestations for a key, ordered by target epoch.
    pub fn signed_attestations(
        &self,
        pubkey: &ValidatorKey,
    ) -> Result<Vec<SignedAttestationRecord>, StoreError> {
        let mut entries: Vec<(u64, SignedAttestationRecord)> =
            self.read_prefixed(Table::SignedAttestations, pubkey.as_slice())?;
        entries.sort_by_key(|(target, _)| *target);
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }

    /// Recorded attestations whose epoch range strictly surrounds, or is
    /// strictly surrounded by, the candidate `(source, target)` range.
    ///
    /// The guard has only one key's history to consider, so a range scan over
    /// that key's prefix is all the surround check needs.
    pub fn surrounding_candidates(
        &self,
        pubkey: &ValidatorKey,
        source: Epoch,
        target: Epoch,
    ) -> Result<Vec<SignedAttestationRecord>, StoreError> {
        let candidate = SignedAttestationRecord {
            source,
            target,
            signing_root: H256::ZERO,
        };
        Ok(self
            .signed_attestations(pubkey)?
            .into_iter()
            .filter(|existing| candidate.surrounds(existing) || candidate.surrounded_by(existing))
            .collect())
    }

    pub fn record_signed_attestation(
        &self,
        pubkey: &ValidatorKey,
        record: SignedAttestationRecord,
    ) -> Result<(), StoreError> {
        self.write_value(
            Table::SignedAttestations,
            pubkey_key(pubkey, record.target),
            &record,
        )
    }

    // ============ Indexed Attestations (slasher-side) ============

    pub fn indexed_attestation_at_target(
        &self,
        validator_index: ValidatorIndex,
        target: Epoch,
    ) -> Result<Option<SignedAttestationRecord>, StoreError> {
        self.read_value(
            Table::IndexedAttestations,
            &index_key(validator_index, target),
        )
    }

    /// All attestations recorded for a validator index, ordered by target.
    pub fn indexed_attestations(
        &self,
        validator_index: ValidatorIndex,
    ) -> Result<Vec<SignedAttestationRecord>, StoreError> {
        let mut entries: Vec<(u64, SignedAttestationRecord)> = self.read_prefixed(
            Table::IndexedAttestations,
            &validator_index.to_be_bytes(),
        )?;
        entries.sort_by_key(|(target, _)| *target);
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }

    // ============ Min/Max Spans (slasher-side) ============

    /// The span summary at one epoch; unset spans read as zero.
    pub fn span_at(
        &self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<EpochSpan, StoreError> {
        Ok(self
            .read_value(Table::MinMaxSpans, &index_key(validator_index, epoch))?
            .unwrap_or_default())
    }

    /// All span summaries recorded for a validator index.
    ///
    /// Used to warm the slasher's cache; the map is exactly the cache's
    /// per-validator representation.
    pub fn spans_for_validator(
        &self,
        validator_index: ValidatorIndex,
    ) -> Result<BTreeMap<Epoch, EpochSpan>, StoreError> {
        let entries: Vec<(u64, EpochSpan)> =
            self.read_prefixed(Table::MinMaxSpans, &validator_index.to_be_bytes())?;
        Ok(entries.into_iter().collect())
    }

    /// Commit an ingested attestation and the span updates it implies in one
    /// atomic batch, so a crash can never leave spans that reflect an
    /// attestation the history table does not contain (or vice versa).
    pub fn commit_attestation_with_spans(
        &self,
        validator_index: ValidatorIndex,
        record: SignedAttestationRecord,
        spans: &[(Epoch, EpochSpan)],
    ) -> Result<(), StoreError> {
        let mut batch = self.backend.begin_write().map_err(StoreError::backend)?;
        batch
            .put_batch(
                Table::IndexedAttestations,
                vec![(
                    index_key(validator_index, record.target),
                    record.as_ssz_bytes(),
                )],
            )
            .map_err(StoreError::backend)?;
        if !spans.is_empty() {
            batch
                .put_batch(
                    Table::MinMaxSpans,
                    spans
                        .iter()
                        .map(|(epoch, span)| {
                            (index_key(validator_index, *epoch), span.as_ssz_bytes())
                        })
                        .collect(),
                )
                .map_err(StoreError::backend)?;
        }
        batch.commit().map_err(StoreError::backend)
    }

    // ============ Key Enumeration & Removal ============

    /// Every key with at least one recorded block or attestation, sorted.
    pub fn known_validator_keys(&self) -> Result<Vec<ValidatorKey>, StoreError> {
        let mut keys = BTreeSet::new();
        for table in [Table::SignedBlocks, Table::SignedAttestations] {
            let view = self.backend.begin_read().map_err(StoreError::backend)?;
            for result in view.prefix_iterator(table, &[]).map_err(StoreError::backend)? {
                let (key, _) = result.map_err(StoreError::backend)?;
                if key.len() != 48 + 8 {
                    return Err(StoreError::corrupt(table, "bad key length"));
                }
                keys.insert(ValidatorKey::from_slice(&key[..48]));
            }
        }
        Ok(keys.into_iter().collect())
    }

    /// Delete every block and attestation record for a key.
    ///
    /// This weakens protection for the key (history is the only defense), so
    /// the removal is logged loudly and left to explicit operator action.
    pub fn remove_validator_history(&self, pubkey: &ValidatorKey) -> Result<(), StoreError> {
        let mut block_keys = Vec::new();
        let mut attestation_keys = Vec::new();
        {
            let view = self.backend.begin_read().map_err(StoreError::backend)?;
            for result in view
                .prefix_iterator(Table::SignedBlocks, pubkey.as_slice())
                .map_err(StoreError::backend)?
            {
                let (key, _) = result.map_err(StoreError::backend)?;
                block_keys.push(key.to_vec());
            }
            for result in view
                .prefix_iterator(Table::SignedAttestations, pubkey.as_slice())
                .map_err(StoreError::backend)?
            {
                let (key, _) = result.map_err(StoreError::backend)?;
                attestation_keys.push(key.to_vec());
            }
        }

        warn!(
            %pubkey,
            blocks = block_keys.len(),
            attestations = attestation_keys.len(),
            "Removing signing history; protection for this key restarts from empty"
        );

        let mut batch = self.backend.begin_write().map_err(StoreError::backend)?;
        batch
            .delete_batch(Table::SignedBlocks, block_keys)
            .map_err(StoreError::backend)?;
        batch
            .delete_batch(Table::SignedAttestations, attestation_keys)
            .map_err(StoreError::backend)?;
        batch.commit().map_err(StoreError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn store() -> ProtectionStore {
        ProtectionStore::new(Arc::new(InMemoryBackend::new()))
    }

    fn pubkey(byte: u8) -> ValidatorKey {
        ValidatorKey::repeat_byte(byte)
    }

    fn att(source: Epoch, target: Epoch, root: u8) -> SignedAttestationRecord {
        SignedAttestationRecord {
            source,
            target,
            signing_root: H256::repeat_byte(root),
        }
    }

    #[test]
    fn test_genesis_root_set_once() {
        let store = store();
        assert_eq!(store.genesis_validators_root().unwrap(), None);

        let root = H256::repeat_byte(1);
        store.save_genesis_validators_root(root).unwrap();
        assert_eq!(store.genesis_validators_root().unwrap(), Some(root));

        // Same root is idempotent, a differing one is refused
        store.save_genesis_validators_root(root).unwrap();
        let err = store
            .save_genesis_validators_root(H256::repeat_byte(2))
            .unwrap_err();
        assert!(matches!(err, StoreError::GenesisRootMismatch { .. }));
        assert_eq!(store.genesis_validators_root().unwrap(), Some(root));
    }

    #[test]
    fn test_block_history_per_key() {
        let store = store();
        let key_a = pubkey(0xaa);
        let key_b = pubkey(0xbb);

        for slot in [5, 3, 9] {
            store
                .record_signed_block(
                    &key_a,
                    SignedBlockRecord {
                        slot,
                        signing_root: H256::repeat_byte(slot as u8),
                    },
                )
                .unwrap();
        }

        assert_eq!(store.highest_signed_block(&key_a).unwrap().unwrap().slot, 9);
        assert_eq!(store.highest_signed_block(&key_b).unwrap(), None);
        assert_eq!(
            store.block_at_slot(&key_a, 3).unwrap().unwrap().signing_root,
            H256::repeat_byte(3)
        );
        assert_eq!(store.block_at_slot(&key_a, 4).unwrap(), None);

        let slots: Vec<_> = store
            .signed_blocks(&key_a)
            .unwrap()
            .iter()
            .map(|r| r.slot)
            .collect();
        assert_eq!(slots, vec![3, 5, 9]);
    }

    #[test]
    fn test_surrounding_candidates() {
        let store = store();
        let key = pubkey(0x01);
        store.record_signed_attestation(&key, att(2, 5, 1)).unwrap();
        store.record_signed_attestation(&key, att(6, 7, 2)).unwrap();

        // (1, 8) surrounds (2, 5) and (6, 7)
        let conflicts = store.surrounding_candidates(&key, 1, 8).unwrap();
        assert_eq!(conflicts.len(), 2);

        // (3, 4) is surrounded by (2, 5)
        let conflicts = store.surrounding_candidates(&key, 3, 4).unwrap();
        assert_eq!(conflicts, vec![att(2, 5, 1)]);

        // (5, 6) is disjoint from both
        assert!(store.surrounding_candidates(&key, 5, 6).unwrap().is_empty());
    }

    #[test]
    fn test_spans_roundtrip() {
        let store = store();
        let span = EpochSpan {
            min_span: 2,
            max_span: 7,
        };
        store
            .commit_attestation_with_spans(42, att(1, 5, 1), &[(3, span)])
            .unwrap();

        assert_eq!(store.span_at(42, 3).unwrap(), span);
        assert!(store.span_at(42, 4).unwrap().is_unset());
        assert_eq!(store.spans_for_validator(42).unwrap().len(), 1);
        assert_eq!(
            store.indexed_attestation_at_target(42, 5).unwrap(),
            Some(att(1, 5, 1))
        );
        assert_eq!(store.indexed_attestations(42).unwrap().len(), 1);
    }

    #[test]
    fn test_known_keys_and_removal() {
        let store = store();
        let key_a = pubkey(0xaa);
        let key_b = pubkey(0xbb);

        store
            .record_signed_block(
                &key_a,
                SignedBlockRecord {
                    slot: 1,
                    signing_root: H256::repeat_byte(1),
                },
            )
            .unwrap();
        store.record_signed_attestation(&key_b, att(0, 1, 1)).unwrap();

        assert_eq!(store.known_validator_keys().unwrap(), vec![key_a, key_b]);

        store.remove_validator_history(&key_a).unwrap();
        assert_eq!(store.known_validator_keys().unwrap(), vec![key_b]);
        assert_eq!(store.highest_signed_block(&key_a).unwrap(), None);
    }
}
