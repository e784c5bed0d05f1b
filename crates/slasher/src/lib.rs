//! Network-side slashing detection.
//!
//! The [`SpanDetector`] watches every broadcast attestation across the whole
//! validator set and flags double votes and surround votes without keeping an
//! unbounded per-validator history in the hot path: per-(validator, epoch)
//! min/max span summaries bound the work per ingested attestation regardless
//! of how much history exists. The detector observes and reports; it never
//! gates anything.

mod cache;
mod detector;
pub mod metrics;

pub use detector::{
    IngestError, IngestOutcome, OffenseKind, SlashableOffense, SlasherConfig, SpanDetector,
};
