use std::io::Write;

use aegis_storage::ProtectionStore;
use tracing::info;

use crate::format::{
    InterchangeAttestation, InterchangeBlock, InterchangeDocument, InterchangeEntry,
    InterchangeMetadata, SUPPORTED_FORMAT_VERSION, pubkey_to_hex, root_to_hex,
};
use crate::import::InterchangeError;

/// Export the store's complete history as an interchange document.
///
/// Walks every key with recorded history; a store that never learned its
/// genesis validators root has nothing meaningful to export and errors out.
pub fn export_interchange(store: &ProtectionStore) -> Result<InterchangeDocument, InterchangeError> {
    let genesis_root = store
        .genesis_validators_root()?
        .ok_or(InterchangeError::MissingGenesisRoot)?;

    let mut data = Vec::new();
    for pubkey in store.known_validator_keys()? {
        let blocks = store.signed_blocks(&pubkey)?;
        let attestations = store.signed_attestations(&pubkey)?;

        data.push(InterchangeEntry {
            pubkey: pubkey_to_hex(&pubkey),
            signed_blocks: blocks.iter().map(InterchangeBlock::from_record).collect(),
            signed_attestations: attestations
                .iter()
                .map(InterchangeAttestation::from_record)
                .collect(),
        });
    }

    info!(keys = data.len(), "Exported protection history");
    Ok(InterchangeDocument {
        metadata: InterchangeMetadata {
            interchange_format_version: SUPPORTED_FORMAT_VERSION.to_string(),
            genesis_validators_root: root_to_hex(&genesis_root),
        },
        data,
    })
}

/// Export directly to a writer as pretty-printed JSON.
///
/// The document is meant to be read and diffed by operators, not only parsed
/// by machines.
pub fn export_to_writer(
    store: &ProtectionStore,
    writer: impl Write,
) -> Result<(), InterchangeError> {
    let document = export_interchange(store)?;
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}
