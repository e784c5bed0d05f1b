use aegis_storage::{ProtectionStore, StoreError};
use aegis_types::{
    primitives::{Epoch, H256, Slot, ValidatorKey},
    record::{SignedAttestationRecord, SignedBlockRecord, roots_match},
};
use tracing::{debug, error};

use crate::error::{GuardError, ProtectionViolation, SignError};
use crate::keylock::KeyLockRegistry;
use crate::metrics;
use crate::signer::{Signature, Signer};

/// Pre-sign gate and post-sign recorder for one protection store.
///
/// The two phases are deliberately split so no store transaction is held open
/// across the external signing call; the per-key lock provides the
/// serialization that makes the split safe. [`SigningGuard::sign_block`] and
/// [`SigningGuard::sign_attestation`] run both phases plus the signer under
/// one lock acquisition and are the recommended entry points; the separate
/// `validate_*`/`record_*` primitives exist for callers that drive the signer
/// themselves and accept responsibility for calling both.
pub struct SigningGuard {
    store: ProtectionStore,
    locks: KeyLockRegistry,
}

/// A history entry skipped during a bulk import, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedRecord {
    Block {
        record: SignedBlockRecord,
        violation: ProtectionViolation,
    },
    Attestation {
        record: SignedAttestationRecord,
        violation: ProtectionViolation,
    },
}

/// Result of importing one key's history.
#[derive(Debug, Default)]
pub struct KeyImportOutcome {
    pub accepted_blocks: usize,
    pub accepted_attestations: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl SigningGuard {
    pub fn new(store: ProtectionStore) -> Self {
        Self {
            store,
            locks: KeyLockRegistry::default(),
        }
    }

    pub fn store(&self) -> &ProtectionStore {
        &self.store
    }

    // ============ Pre-Sign Validation ============

    /// Decide whether signing a block `(slot, signing_root)` is safe.
    ///
    /// Performs no mutation. `Ok(())` means accept; a [`GuardError::Violation`]
    /// names the conflict, and a [`GuardError::Store`] fault must be treated
    /// as a refusal.
    pub fn validate_before_block_sign(
        &self,
        pubkey: &ValidatorKey,
        slot: Slot,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();
        self.check_block(pubkey, slot, signing_root)
    }

    /// Decide whether signing an attestation is safe. No mutation.
    pub fn validate_before_attestation_sign(
        &self,
        pubkey: &ValidatorKey,
        source: Epoch,
        target: Epoch,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();
        self.check_attestation(pubkey, source, target, signing_root)
    }

    fn check_block(
        &self,
        pubkey: &ValidatorKey,
        slot: Slot,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let _timer = metrics::block_check_timer();

        if let Some(existing) = self.store.block_at_slot(pubkey, slot)? {
            // Re-signing the exact same message is allowed; anything else at
            // this slot is a double proposal. Unknown (zero) roots never
            // match, so they always refuse.
            if roots_match(&existing.signing_root, &signing_root) {
                return Ok(());
            }
            return Err(self.refuse(
                pubkey,
                ProtectionViolation::DoubleBlockProposal {
                    slot,
                    existing_root: existing.signing_root,
                },
            ));
        }

        if let Some(highest) = self.store.highest_signed_block(pubkey)? {
            if slot <= highest.slot {
                return Err(self.refuse(
                    pubkey,
                    ProtectionViolation::BlockSlotTooOld {
                        slot,
                        highest_slot: highest.slot,
                    },
                ));
            }
        }

        Ok(())
    }

    fn check_attestation(
        &self,
        pubkey: &ValidatorKey,
        source: Epoch,
        target: Epoch,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let _timer = metrics::attestation_check_timer();

        if source > target {
            return Err(self.refuse(
                pubkey,
                ProtectionViolation::SourceExceedsTarget { source, target },
            ));
        }

        if let Some(existing) = self.store.attestation_at_target(pubkey, target)? {
            if existing.source == source && roots_match(&existing.signing_root, &signing_root) {
                return Ok(());
            }
            return Err(self.refuse(
                pubkey,
                ProtectionViolation::DoubleVote {
                    target,
                    existing_root: existing.signing_root,
                },
            ));
        }

        let candidate = SignedAttestationRecord {
            source,
            target,
            signing_root,
        };
        for existing in self.store.surrounding_candidates(pubkey, source, target)? {
            let violation = if candidate.surrounds(&existing) {
                ProtectionViolation::SurroundingVote { existing }
            } else {
                ProtectionViolation::SurroundedVote { existing }
            };
            return Err(self.refuse(pubkey, violation));
        }

        Ok(())
    }

    fn refuse(&self, pubkey: &ValidatorKey, violation: ProtectionViolation) -> GuardError {
        metrics::inc_signing_refused(violation.as_str());
        debug!(%pubkey, %violation, "Refused signing request");
        violation.into()
    }

    // ============ Post-Sign Commit ============

    /// Record an accepted and signed block.
    ///
    /// Must be called after the signer succeeded for a candidate that passed
    /// [`Self::validate_before_block_sign`]. A failure here means a signature
    /// exists that the store does not know about; the error is surfaced
    /// loudly and must reach an operator.
    pub fn record_block_sign(
        &self,
        pubkey: &ValidatorKey,
        slot: Slot,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();
        self.commit_block(pubkey, SignedBlockRecord { slot, signing_root })
            .map_err(GuardError::Store)
    }

    /// Record an accepted and signed attestation.
    pub fn record_attestation_sign(
        &self,
        pubkey: &ValidatorKey,
        source: Epoch,
        target: Epoch,
        signing_root: H256,
    ) -> Result<(), GuardError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();
        self.commit_attestation(
            pubkey,
            SignedAttestationRecord {
                source,
                target,
                signing_root,
            },
        )
        .map_err(GuardError::Store)
    }

    fn commit_block(
        &self,
        pubkey: &ValidatorKey,
        record: SignedBlockRecord,
    ) -> Result<(), StoreError> {
        self.store
            .record_signed_block(pubkey, record)
            .inspect_err(|err| {
                error!(
                    %pubkey,
                    slot = record.slot,
                    %err,
                    "Signed block could not be recorded; protection history is now behind the signer"
                );
            })?;
        metrics::inc_blocks_recorded();
        Ok(())
    }

    fn commit_attestation(
        &self,
        pubkey: &ValidatorKey,
        record: SignedAttestationRecord,
    ) -> Result<(), StoreError> {
        self.store
            .record_signed_attestation(pubkey, record)
            .inspect_err(|err| {
                error!(
                    %pubkey,
                    source = record.source,
                    target = record.target,
                    %err,
                    "Signed attestation could not be recorded; protection history is now behind the signer"
                );
            })?;
        metrics::inc_attestations_recorded();
        Ok(())
    }

    // ============ End-to-End Signing ============

    /// Validate, sign, and record a block under one per-key lock acquisition.
    ///
    /// The lock is held across the (possibly slow, possibly remote) signer
    /// call so a concurrent request for the same key cannot validate against
    /// history that is about to change.
    pub fn sign_block(
        &self,
        pubkey: &ValidatorKey,
        slot: Slot,
        signing_root: H256,
        signer: &dyn Signer,
    ) -> Result<Signature, SignError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();

        self.check_block(pubkey, slot, signing_root)?;
        let signature = signer.sign(signing_root)?;
        self.commit_block(pubkey, SignedBlockRecord { slot, signing_root })
            .map_err(SignError::Unrecorded)?;
        Ok(signature)
    }

    /// Validate, sign, and record an attestation under one lock acquisition.
    pub fn sign_attestation(
        &self,
        pubkey: &ValidatorKey,
        source: Epoch,
        target: Epoch,
        signing_root: H256,
        signer: &dyn Signer,
    ) -> Result<Signature, SignError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();

        self.check_attestation(pubkey, source, target, signing_root)?;
        let signature = signer.sign(signing_root)?;
        self.commit_attestation(
            pubkey,
            SignedAttestationRecord {
                source,
                target,
                signing_root,
            },
        )
        .map_err(SignError::Unrecorded)?;
        Ok(signature)
    }

    // ============ Bulk History Import ============

    /// Import one key's history, holding the key's lock for the whole batch
    /// so no live signing request interleaves with it.
    ///
    /// Entries are validated in order against the store as it stands, earlier
    /// accepted entries included. A violating entry is skipped and reported,
    /// never written; a storage fault aborts the key (fail closed) and is the
    /// caller's to report.
    pub fn import_key_history(
        &self,
        pubkey: &ValidatorKey,
        blocks: &[SignedBlockRecord],
        attestations: &[SignedAttestationRecord],
    ) -> Result<KeyImportOutcome, StoreError> {
        let lock = self.locks.acquire(pubkey);
        let _held = lock.hold();

        let mut outcome = KeyImportOutcome::default();

        for record in blocks {
            match self.check_block(pubkey, record.slot, record.signing_root) {
                Ok(()) => {
                    self.store.record_signed_block(pubkey, *record)?;
                    outcome.accepted_blocks += 1;
                }
                Err(GuardError::Violation(violation)) => outcome.skipped.push(SkippedRecord::Block {
                    record: *record,
                    violation,
                }),
                Err(GuardError::Store(err)) => return Err(err),
            }
        }

        for record in attestations {
            match self.check_attestation(pubkey, record.source, record.target, record.signing_root)
            {
                Ok(()) => {
                    self.store.record_signed_attestation(pubkey, *record)?;
                    outcome.accepted_attestations += 1;
                }
                Err(GuardError::Violation(violation)) => {
                    outcome.skipped.push(SkippedRecord::Attestation {
                        record: *record,
                        violation,
                    })
                }
                Err(GuardError::Store(err)) => return Err(err),
            }
        }

        Ok(outcome)
    }
}
