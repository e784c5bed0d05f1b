// Re-export SSZ traits to avoid users having to depend on these directly
pub use ssz::{Decode, Encode};

/// 32-byte root hash (signing roots, the genesis validators root).
pub type H256 = alloy_primitives::B256;

/// Fixed-length compressed public key identifying one validator.
///
/// This is the partition key for all signing history: records for different
/// keys never interact.
pub type ValidatorKey = alloy_primitives::FixedBytes<48>;

/// Index of a validator within the network-wide registry.
///
/// Used by the slasher, which observes the whole validator set and addresses
/// history by index rather than by public key.
pub type ValidatorIndex = u64;

pub type Slot = u64;
pub type Epoch = u64;

/// The all-zero root, used to mark a signing root as unknown.
///
/// Unknown roots never compare equal for idempotence purposes, not even to
/// each other; see [`crate::record::roots_match`].
pub const ZERO_ROOT: H256 = H256::ZERO;
