//! Validator-side slashing protection.
//!
//! Every block and attestation signature is gated by a [`SigningGuard`]: a
//! pre-sign validation decides against the key's recorded history, the
//! external [`Signer`] produces the signature, and a post-sign commit makes
//! the new record durable before any later request for the same key is
//! evaluated. Requests for one key are serialized end-to-end; requests for
//! different keys never block each other.

mod error;
mod guard;
mod keylock;
pub mod metrics;
mod signer;

pub use error::{GuardError, ProtectionViolation, SignError};
pub use guard::{KeyImportOutcome, SigningGuard, SkippedRecord};
pub use signer::{Signature, Signer, SignerError};
