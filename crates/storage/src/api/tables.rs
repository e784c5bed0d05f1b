/// Tables in the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Validator-side block history: (pubkey || slot_be) -> SignedBlockRecord
    ///
    /// Big-endian slot suffixes make lexicographic prefix order equal numeric
    /// order, so one key's blocks can be range-scanned.
    SignedBlocks,
    /// Validator-side attestation history: (pubkey || target_be) -> SignedAttestationRecord
    ///
    /// At most one entry per (pubkey, target); conflicting targets are caught
    /// before a second entry is ever written.
    SignedAttestations,
    /// Slasher-side attestation history: (validator_index_be || target_be) -> SignedAttestationRecord
    ///
    /// Used to re-derive the concrete conflicting attestation once the span
    /// summary flags a candidate violation.
    IndexedAttestations,
    /// Span summaries: (validator_index_be || epoch_be) -> EpochSpan
    MinMaxSpans,
    /// Metadata: string keys -> various scalar values
    ///
    /// Holds the genesis validators root that scopes all history to one chain.
    Metadata,
}

/// All table variants.
pub const ALL_TABLES: [Table; 5] = [
    Table::SignedBlocks,
    Table::SignedAttestations,
    Table::IndexedAttestations,
    Table::MinMaxSpans,
    Table::Metadata,
];
