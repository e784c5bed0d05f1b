use ssz_derive::{Decode, Encode};

use crate::primitives::{Epoch, H256, Slot};

/// Compare two signing roots for the purpose of idempotent re-signing.
///
/// The all-zero root means "unknown": an unknown root never matches anything,
/// including another unknown root. Re-signing a message whose recorded root
/// is unknown is therefore always refused.
pub fn roots_match(a: &H256, b: &H256) -> bool {
    !a.is_zero() && a == b
}

/// One recorded block signature for a key: the slot it was signed at and the
/// signing root of the signed message.
///
/// At most one record exists per (key, slot); a differing message at an
/// already-recorded slot is a double proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SignedBlockRecord {
    pub slot: Slot,
    pub signing_root: H256,
}

/// One recorded attestation signature for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SignedAttestationRecord {
    pub source: Epoch,
    pub target: Epoch,
    pub signing_root: H256,
}

impl SignedAttestationRecord {
    /// True if this attestation's epoch range strictly contains `other`'s.
    pub fn surrounds(&self, other: &SignedAttestationRecord) -> bool {
        self.source < other.source && self.target > other.target
    }

    /// True if this attestation's epoch range is strictly contained by `other`'s.
    pub fn surrounded_by(&self, other: &SignedAttestationRecord) -> bool {
        other.surrounds(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn att(source: Epoch, target: Epoch) -> SignedAttestationRecord {
        SignedAttestationRecord {
            source,
            target,
            signing_root: H256::repeat_byte(1),
        }
    }

    #[test]
    fn test_surround_is_strict() {
        assert!(att(0, 5).surrounds(&att(1, 4)));
        assert!(att(1, 4).surrounded_by(&att(0, 5)));

        // Sharing either endpoint is not a surround
        assert!(!att(1, 5).surrounds(&att(1, 4)));
        assert!(!att(0, 4).surrounds(&att(1, 4)));

        // Disjoint and chained ranges never surround
        assert!(!att(2, 5).surrounds(&att(5, 6)));
        assert!(!att(5, 6).surrounded_by(&att(2, 5)));
    }

    #[test]
    fn test_unknown_roots_never_match() {
        let known = H256::repeat_byte(7);
        assert!(roots_match(&known, &known));
        assert!(!roots_match(&known, &H256::repeat_byte(8)));
        assert!(!roots_match(&H256::ZERO, &known));
        assert!(!roots_match(&known, &H256::ZERO));
        assert!(!roots_match(&H256::ZERO, &H256::ZERO));
    }
}
