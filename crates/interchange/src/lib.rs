//! Portable signing-history interchange.
//!
//! Implements the standard versioned JSON document for moving a validator's
//! complete protection history between independent implementations: one
//! genesis validators root, then per-key lists of signed blocks and signed
//! attestations. Numbers travel as decimal strings so no implementation loses
//! precision; roots and pubkeys are 0x-prefixed hex; an omitted signing root
//! means "unknown" and imports as the all-zero root.
//!
//! Import is best-effort per key: invariant-violating entries are skipped and
//! reported, malformed keys are rejected and reported, and neither stops the
//! rest of the file. Only a format-version mismatch fails the whole file.

mod export;
mod format;
mod import;

pub use export::{export_interchange, export_to_writer};
pub use format::{
    InterchangeAttestation, InterchangeBlock, InterchangeDocument, InterchangeEntry,
    InterchangeMetadata, ParseError, SUPPORTED_FORMAT_VERSION, pubkey_from_hex, pubkey_to_hex,
    root_from_hex, root_to_hex, u64_from_string,
};
pub use import::{
    ImportReport, InterchangeError, RejectedKey, SkippedEntry, import_document,
    import_interchange,
};
