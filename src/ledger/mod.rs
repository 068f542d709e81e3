//! On-chain commitment of judged results.
//!
//! Only a SHA-256 fingerprint of each result is written, through a single
//! `storeData(string)` contract method. Recording is best-effort: the
//! [`LedgerRecorder`] turns every failure into `None` after logging it.

pub mod client;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod recorder;

pub use client::{EthLedgerClient, LedgerClient};
pub use error::{ConfigError, LedgerError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use identity::LedgerIdentity;
pub use recorder::{GasPricePolicy, LedgerRecorder, RecorderConfig, TransactionId};
