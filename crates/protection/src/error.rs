use aegis_storage::StoreError;
use aegis_types::{
    primitives::{Epoch, H256, Slot},
    record::SignedAttestationRecord,
};
use thiserror::Error;

use crate::signer::SignerError;

/// A candidate message that conflicts with recorded signing history.
///
/// Violations are the guard working as intended: they are reported to the
/// caller with the conflicting record and never treated as process failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtectionViolation {
    #[error("block at slot {slot} was already signed with root {existing_root}")]
    DoubleBlockProposal { slot: Slot, existing_root: H256 },
    #[error("block slot {slot} is at or below the highest previously signed slot {highest_slot}")]
    BlockSlotTooOld { slot: Slot, highest_slot: Slot },
    #[error("attestation source epoch {source} is after its target epoch {target}")]
    SourceExceedsTarget { source: Epoch, target: Epoch },
    #[error("target epoch {target} was already attested with root {existing_root}")]
    DoubleVote { target: Epoch, existing_root: H256 },
    #[error(
        "attestation surrounds a previously signed attestation \
         (source {}, target {})", .existing.source, .existing.target
    )]
    SurroundingVote { existing: SignedAttestationRecord },
    #[error(
        "attestation is surrounded by a previously signed attestation \
         (source {}, target {})", .existing.source, .existing.target
    )]
    SurroundedVote { existing: SignedAttestationRecord },
}

impl ProtectionViolation {
    /// Returns a string label for metrics and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionViolation::DoubleBlockProposal { .. } => "double_block_proposal",
            ProtectionViolation::BlockSlotTooOld { .. } => "block_slot_too_old",
            ProtectionViolation::SourceExceedsTarget { .. } => "source_exceeds_target",
            ProtectionViolation::DoubleVote { .. } => "double_vote",
            ProtectionViolation::SurroundingVote { .. } => "surrounding_vote",
            ProtectionViolation::SurroundedVote { .. } => "surrounded_vote",
        }
    }
}

/// Outcome of a pre-sign validation or a post-sign commit.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The candidate conflicts with recorded history; do not sign.
    #[error(transparent)]
    Violation(#[from] ProtectionViolation),
    /// History could not be read or written. The decision fails closed:
    /// callers must treat this exactly like a refusal.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of an end-to-end guarded signing attempt.
#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// The external signer failed or timed out; no record was written.
    #[error("signer failure: {0}")]
    Signer(#[from] SignerError),
    /// The signature exists but the record write failed. The signature is
    /// now outside the protection boundary, which makes a future double sign
    /// possible on restart; operator attention is required.
    #[error("signature produced but not recorded: {0}")]
    Unrecorded(StoreError),
}

impl From<ProtectionViolation> for SignError {
    fn from(violation: ProtectionViolation) -> Self {
        SignError::Guard(violation.into())
    }
}
