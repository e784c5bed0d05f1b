use ssz_derive::{Decode, Encode};

use crate::primitives::Epoch;

/// How far back (in epochs) signing history is tracked for span detection.
///
/// Attestations whose source-to-target distance exceeds this window cannot be
/// expressed in a [`EpochSpan`] and are refused at ingest rather than
/// truncated.
pub const HISTORY_WINDOW_EPOCHS: Epoch = 54_000;

/// Compressed per-(validator, epoch) summary of all later attestations.
///
/// `min_span` is the minimum, over recorded attestations with a source epoch
/// after this one, of `target - epoch`; `max_span` is the maximum over
/// recorded attestations whose range passes over this epoch. Zero means no
/// attestation has touched the field yet. Updates only ever tighten: a
/// `min_span` never grows and a `max_span` never shrinks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct EpochSpan {
    pub min_span: u16,
    pub max_span: u16,
}

impl EpochSpan {
    /// True if no attestation has contributed to either span yet.
    pub fn is_unset(&self) -> bool {
        self.min_span == 0 && self.max_span == 0
    }
}
