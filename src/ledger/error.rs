use thiserror::Error;

/// Startup-time failures. The process refuses to serve when any of these occur.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field} address {value:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },
    // Never carries the key material.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("public address {configured} does not match the signing key's address {derived}")]
    AddressMismatch { configured: String, derived: String },
    #[error("contract address must not be the zero address")]
    ZeroContract,
    #[error("invalid contract ABI: {0}")]
    Abi(String),
    #[error("ledger endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("chain id mismatch: configured {configured}, node reports {reported}")]
    ChainIdMismatch { configured: u64, reported: u64 },
}

/// Per-request failures while building, signing or broadcasting a transaction.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger rpc error: {0}")]
    Rpc(String),
    #[error("nonce conflict: {0}")]
    NonceConflict(String),
    /// The node already holds this exact signed transaction.
    #[error("transaction already known: {0}")]
    AlreadyKnown(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("call encoding failed: {0}")]
    Encoding(String),
}

impl LedgerError {
    /// Classifies a node rejection message. Stale nonces and duplicate
    /// submissions are reported under several wordings depending on the client.
    pub fn from_rpc_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let lower = msg.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        if has(&["already known", "known transaction"]) {
            LedgerError::AlreadyKnown(msg)
        } else if has(&["nonce too low", "replacement transaction underpriced", "invalid nonce"]) {
            LedgerError::NonceConflict(msg)
        } else {
            LedgerError::Rpc(msg)
        }
    }
}
