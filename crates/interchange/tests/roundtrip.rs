//! Import/export behavior against a live guard and store.

use std::sync::Arc;

use aegis_interchange::{
    InterchangeDocument, InterchangeError, export_interchange, import_document,
    import_interchange, pubkey_to_hex, root_to_hex,
};
use aegis_protection::{GuardError, ProtectionViolation, SigningGuard};
use aegis_storage::{ProtectionStore, backend::InMemoryBackend};
use aegis_types::primitives::{H256, ValidatorKey};

fn new_guard() -> SigningGuard {
    SigningGuard::new(ProtectionStore::new(Arc::new(InMemoryBackend::new())))
}

fn genesis_root() -> H256 {
    H256::repeat_byte(0x42)
}

fn pubkey(byte: u8) -> ValidatorKey {
    ValidatorKey::repeat_byte(byte)
}

/// Build a populated guard: two keys with blocks and attestations.
fn populated_guard() -> SigningGuard {
    let guard = new_guard();
    guard
        .store()
        .save_genesis_validators_root(genesis_root())
        .unwrap();

    guard
        .record_block_sign(&pubkey(0xaa), 10, H256::repeat_byte(1))
        .unwrap();
    guard
        .record_block_sign(&pubkey(0xaa), 11, H256::repeat_byte(2))
        .unwrap();
    guard
        .record_attestation_sign(&pubkey(0xaa), 2, 5, H256::repeat_byte(3))
        .unwrap();
    guard
        .record_attestation_sign(&pubkey(0xbb), 0, 1, H256::repeat_byte(4))
        .unwrap();
    guard
}

#[test]
fn export_then_import_reproduces_decisions() {
    let source = populated_guard();
    let document = export_interchange(source.store()).unwrap();

    let fresh = new_guard();
    let report = import_document(&fresh, &document).unwrap();
    assert!(report.is_clean(), "round trip must import cleanly: {report:?}");
    assert_eq!(report.imported_keys, 2);
    assert_eq!(report.accepted_blocks, 2);
    assert_eq!(report.accepted_attestations, 2);

    // The imported store must refuse and accept exactly what the source does.
    for guard in [&source, &fresh] {
        assert!(matches!(
            guard.validate_before_block_sign(&pubkey(0xaa), 10, H256::repeat_byte(9)),
            Err(GuardError::Violation(
                ProtectionViolation::DoubleBlockProposal { .. }
            ))
        ));
        assert!(matches!(
            guard.validate_before_attestation_sign(&pubkey(0xaa), 1, 6, H256::repeat_byte(9)),
            Err(GuardError::Violation(
                ProtectionViolation::SurroundingVote { .. }
            ))
        ));
        guard
            .validate_before_block_sign(&pubkey(0xaa), 12, H256::repeat_byte(9))
            .unwrap();
        guard
            .validate_before_attestation_sign(&pubkey(0xbb), 5, 6, H256::repeat_byte(9))
            .unwrap();
    }
}

#[test]
fn cross_chain_import_rejects_every_key() {
    let guard = new_guard();
    guard
        .store()
        .save_genesis_validators_root(H256::repeat_byte(0x99))
        .unwrap();

    let document = export_interchange(populated_guard().store()).unwrap();
    let report = import_document(&guard, &document).unwrap();

    assert_eq!(report.imported_keys, 0);
    assert_eq!(report.rejected_keys.len(), 2);
    assert!(guard.store().known_validator_keys().unwrap().is_empty());
    // The store's own root is untouched.
    assert_eq!(
        guard.store().genesis_validators_root().unwrap(),
        Some(H256::repeat_byte(0x99))
    );
}

#[test]
fn version_mismatch_fails_the_whole_file() {
    let mut document = export_interchange(populated_guard().store()).unwrap();
    document.metadata.interchange_format_version = "4".to_string();

    let err = import_document(&new_guard(), &document).unwrap_err();
    assert!(matches!(err, InterchangeError::UnsupportedVersion { .. }));
}

#[test]
fn malformed_key_does_not_abort_others() {
    let good_key = pubkey(0xcc);
    let json = format!(
        r#"{{
            "metadata": {{
                "interchange_format_version": "5",
                "genesis_validators_root": "{root}"
            }},
            "data": [
                {{
                    "pubkey": "0xnothex",
                    "signed_blocks": [ {{ "slot": "1" }} ],
                    "signed_attestations": []
                }},
                {{
                    "pubkey": "{good}",
                    "signed_blocks": [ {{ "slot": "7" }} ],
                    "signed_attestations": [
                        {{ "source_epoch": "1", "target_epoch": "2" }},
                        {{ "source_epoch": "0", "target_epoch": "3" }}
                    ]
                }}
            ]
        }}"#,
        root = root_to_hex(&genesis_root()),
        good = pubkey_to_hex(&good_key),
    );

    let guard = new_guard();
    let report = import_interchange(&guard, json.as_bytes()).unwrap();

    assert_eq!(report.rejected_keys.len(), 1);
    assert_eq!(report.rejected_keys[0].pubkey, "0xnothex");
    assert_eq!(report.imported_keys, 1);
    assert_eq!(report.accepted_blocks, 1);
    // The surrounding (0, 3) entry is skipped, the (1, 2) one lands.
    assert_eq!(report.accepted_attestations, 1);
    assert_eq!(report.skipped.len(), 1);

    // An import with no stored root adopts the file's root.
    assert_eq!(
        guard.store().genesis_validators_root().unwrap(),
        Some(genesis_root())
    );
}

#[test]
fn imported_unknown_root_refuses_resigning() {
    let key = pubkey(0xdd);
    let json = format!(
        r#"{{
            "metadata": {{
                "interchange_format_version": "5",
                "genesis_validators_root": "{root}"
            }},
            "data": [
                {{
                    "pubkey": "{key}",
                    "signed_blocks": [ {{ "slot": "5" }} ],
                    "signed_attestations": []
                }}
            ]
        }}"#,
        root = root_to_hex(&genesis_root()),
        key = pubkey_to_hex(&key),
    );

    let guard = new_guard();
    let report = import_interchange(&guard, json.as_bytes()).unwrap();
    assert!(report.is_clean());

    // The recorded root is unknown, so no message can prove itself identical.
    assert!(matches!(
        guard.validate_before_block_sign(&key, 5, H256::repeat_byte(1)),
        Err(GuardError::Violation(
            ProtectionViolation::DoubleBlockProposal { .. }
        ))
    ));
    assert!(matches!(
        guard.validate_before_block_sign(&key, 5, H256::ZERO),
        Err(GuardError::Violation(
            ProtectionViolation::DoubleBlockProposal { .. }
        ))
    ));
}

#[test]
fn reimport_into_same_store_is_idempotent() {
    let guard = populated_guard();
    let document: InterchangeDocument = export_interchange(guard.store()).unwrap();

    // Re-importing a store's own export: every entry is an identical
    // re-sign, accepted without duplicating records.
    let report = import_document(&guard, &document).unwrap();
    assert!(report.is_clean());
    assert_eq!(guard.store().signed_blocks(&pubkey(0xaa)).unwrap().len(), 2);
}
