use std::io::Read;

use aegis_protection::{SigningGuard, SkippedRecord};
use aegis_storage::StoreError;
use aegis_types::primitives::ValidatorKey;
use thiserror::Error;
use tracing::{info, warn};

use crate::format::{
    InterchangeDocument, InterchangeEntry, ParseError, SUPPORTED_FORMAT_VERSION, pubkey_from_hex,
    root_from_hex,
};

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("malformed interchange document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "unsupported interchange format version {found:?} (supported: {SUPPORTED_FORMAT_VERSION:?})"
    )]
    UnsupportedVersion { found: String },
    #[error("interchange metadata: {0}")]
    Metadata(ParseError),
    #[error("store has no genesis validators root; nothing scopes the exported history")]
    MissingGenesisRoot,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One invariant-violating entry that was skipped, with its key.
#[derive(Debug)]
pub struct SkippedEntry {
    pub pubkey: ValidatorKey,
    pub record: SkippedRecord,
}

/// One key whose entries were rejected wholesale.
#[derive(Debug)]
pub struct RejectedKey {
    /// The pubkey as it appeared in the file; it may not even be valid hex.
    pub pubkey: String,
    pub reason: String,
}

/// Structured result of a best-effort import.
///
/// An import is never a boolean: callers get what landed, what was skipped
/// and why, and which keys were rejected outright.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported_keys: usize,
    pub accepted_blocks: usize,
    pub accepted_attestations: usize,
    pub skipped: Vec<SkippedEntry>,
    pub rejected_keys: Vec<RejectedKey>,
}

impl ImportReport {
    /// True if every entry of every key was imported.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.rejected_keys.is_empty()
    }
}

/// Import an interchange document from a reader.
pub fn import_interchange(
    guard: &SigningGuard,
    reader: impl Read,
) -> Result<ImportReport, InterchangeError> {
    let document: InterchangeDocument = serde_json::from_reader(reader)?;
    import_document(guard, &document)
}

/// Import an already-parsed interchange document.
///
/// A version mismatch or an unreadable genesis root fails the whole file; a
/// genesis root that differs from the store's rejects every key without
/// touching the store. Everything else is handled per key: each key's entries
/// run through the guard's pre-sign checks under that key's lock, so a bad
/// key never blocks a good one and live signing never interleaves with a
/// key's batch.
pub fn import_document(
    guard: &SigningGuard,
    document: &InterchangeDocument,
) -> Result<ImportReport, InterchangeError> {
    if document.metadata.interchange_format_version != SUPPORTED_FORMAT_VERSION {
        return Err(InterchangeError::UnsupportedVersion {
            found: document.metadata.interchange_format_version.clone(),
        });
    }
    let file_root = root_from_hex(&document.metadata.genesis_validators_root)
        .map_err(InterchangeError::Metadata)?;

    let mut report = ImportReport::default();

    match guard.store().genesis_validators_root()? {
        Some(stored) if stored != file_root => {
            // History from another chain is meaningless here and dangerous to
            // trust; nothing from this file may land.
            warn!(
                %stored,
                %file_root,
                "Rejecting interchange import scoped to a different chain"
            );
            for entry in &document.data {
                report.rejected_keys.push(RejectedKey {
                    pubkey: entry.pubkey.clone(),
                    reason: "genesis validators root mismatch".to_string(),
                });
            }
            return Ok(report);
        }
        Some(_) => {}
        None => guard.store().save_genesis_validators_root(file_root)?,
    }

    for entry in &document.data {
        import_entry(guard, entry, &mut report)?;
    }

    info!(
        imported_keys = report.imported_keys,
        accepted_blocks = report.accepted_blocks,
        accepted_attestations = report.accepted_attestations,
        skipped = report.skipped.len(),
        rejected_keys = report.rejected_keys.len(),
        "Interchange import finished"
    );
    Ok(report)
}

fn import_entry(
    guard: &SigningGuard,
    entry: &InterchangeEntry,
    report: &mut ImportReport,
) -> Result<(), StoreError> {
    // Decode the whole entry before writing anything: a key with malformed
    // data is rejected in one piece rather than half-imported.
    let decoded = decode_entry(entry);
    let (pubkey, blocks, attestations) = match decoded {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(pubkey = %entry.pubkey, %err, "Rejecting malformed interchange entry");
            report.rejected_keys.push(RejectedKey {
                pubkey: entry.pubkey.clone(),
                reason: err.to_string(),
            });
            return Ok(());
        }
    };

    let outcome = guard.import_key_history(&pubkey, &blocks, &attestations)?;
    report.imported_keys += 1;
    report.accepted_blocks += outcome.accepted_blocks;
    report.accepted_attestations += outcome.accepted_attestations;
    report.skipped.extend(
        outcome
            .skipped
            .into_iter()
            .map(|record| SkippedEntry { pubkey, record }),
    );
    Ok(())
}

type DecodedEntry = (
    ValidatorKey,
    Vec<aegis_types::record::SignedBlockRecord>,
    Vec<aegis_types::record::SignedAttestationRecord>,
);

fn decode_entry(entry: &InterchangeEntry) -> Result<DecodedEntry, ParseError> {
    let pubkey = pubkey_from_hex(&entry.pubkey)?;
    let blocks = entry
        .signed_blocks
        .iter()
        .map(|block| block.to_record())
        .collect::<Result<Vec<_>, _>>()?;
    let attestations = entry
        .signed_attestations
        .iter()
        .map(|attestation| attestation.to_record())
        .collect::<Result<Vec<_>, _>>()?;
    Ok((pubkey, blocks, attestations))
}
