use aegis_types::{
    primitives::{H256, ValidatorKey},
    record::{SignedAttestationRecord, SignedBlockRecord},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The interchange format version this implementation reads and writes.
pub const SUPPORTED_FORMAT_VERSION: &str = "5";

/// The complete interchange document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeDocument {
    pub metadata: InterchangeMetadata,
    pub data: Vec<InterchangeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeMetadata {
    pub interchange_format_version: String,
    pub genesis_validators_root: String,
}

/// One key's exported history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeEntry {
    pub pubkey: String,
    #[serde(default)]
    pub signed_blocks: Vec<InterchangeBlock>,
    #[serde(default)]
    pub signed_attestations: Vec<InterchangeAttestation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeBlock {
    pub slot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeAttestation {
    pub source_epoch: String,
    pub target_epoch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_root: Option<String>,
}

/// A field of the document that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid decimal number {value:?}")]
    InvalidNumber { value: String },
    #[error("invalid hex in {what}: {value:?}")]
    InvalidHex { what: &'static str, value: String },
    #[error("{what} must be {expected} bytes, got {actual}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

// ============ Field Codecs ============

/// Parse a decimal-string number. The format quotes all numerics so
/// implementations with lossy number types cannot corrupt them.
pub fn u64_from_string(value: &str) -> Result<u64, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        value: value.to_string(),
    })
}

fn bytes_from_hex(what: &'static str, value: &str) -> Result<Vec<u8>, ParseError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|_| ParseError::InvalidHex {
        what,
        value: value.to_string(),
    })
}

pub fn root_from_hex(value: &str) -> Result<H256, ParseError> {
    let bytes = bytes_from_hex("signing root", value)?;
    if bytes.len() != 32 {
        return Err(ParseError::WrongLength {
            what: "signing root",
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(H256::from_slice(&bytes))
}

pub fn pubkey_from_hex(value: &str) -> Result<ValidatorKey, ParseError> {
    let bytes = bytes_from_hex("pubkey", value)?;
    if bytes.len() != 48 {
        return Err(ParseError::WrongLength {
            what: "pubkey",
            expected: 48,
            actual: bytes.len(),
        });
    }
    Ok(ValidatorKey::from_slice(&bytes))
}

pub fn root_to_hex(root: &H256) -> String {
    format!("0x{}", hex::encode(root))
}

pub fn pubkey_to_hex(pubkey: &ValidatorKey) -> String {
    format!("0x{}", hex::encode(pubkey))
}

// ============ Record Conversions ============

impl InterchangeBlock {
    /// Decode into a store record; an omitted root becomes the unknown
    /// (all-zero) root.
    pub fn to_record(&self) -> Result<SignedBlockRecord, ParseError> {
        Ok(SignedBlockRecord {
            slot: u64_from_string(&self.slot)?,
            signing_root: match &self.signing_root {
                Some(root) => root_from_hex(root)?,
                None => H256::ZERO,
            },
        })
    }

    pub fn from_record(record: &SignedBlockRecord) -> Self {
        Self {
            slot: record.slot.to_string(),
            signing_root: (!record.signing_root.is_zero())
                .then(|| root_to_hex(&record.signing_root)),
        }
    }
}

impl InterchangeAttestation {
    pub fn to_record(&self) -> Result<SignedAttestationRecord, ParseError> {
        Ok(SignedAttestationRecord {
            source: u64_from_string(&self.source_epoch)?,
            target: u64_from_string(&self.target_epoch)?,
            signing_root: match &self.signing_root {
                Some(root) => root_from_hex(root)?,
                None => H256::ZERO,
            },
        })
    }

    pub fn from_record(record: &SignedAttestationRecord) -> Self {
        Self {
            source_epoch: record.source.to_string(),
            target_epoch: record.target.to_string(),
            signing_root: (!record.signing_root.is_zero())
                .then(|| root_to_hex(&record.signing_root)),
        }
    }
}
