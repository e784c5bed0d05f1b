use aegis_types::primitives::H256;
use thiserror::Error;

/// An opaque signature produced by the external signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signer refused to sign: {0}")]
    Refused(String),
    #[error("signer timed out")]
    Timeout,
    #[error("signer transport failure: {0}")]
    Transport(String),
}

/// External signing backend (local keystore, remote signer, HSM).
///
/// The guard invokes this strictly between pre-sign validation and the
/// post-sign commit, with the key's lock held. The call may block for an
/// externally-controlled duration; on any error the store is left untouched
/// and the attempt fails with nothing recorded.
pub trait Signer: Send + Sync {
    fn sign(&self, signing_root: H256) -> Result<Signature, SignerError>;
}
