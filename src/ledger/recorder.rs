use crate::config::LedgerConfig;
use crate::ledger::client::LedgerClient;
use crate::ledger::error::LedgerError;
use crate::ledger::fingerprint::fingerprint;
use crate::ledger::identity::LedgerIdentity;
use crate::types::ResultRecord;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionRequest, TxHash, U256};
use ethers::utils::keccak256;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPricePolicy {
    Fixed(U256),
    /// `eth_gasPrice` at submission time.
    Live,
}

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub gas_limit: u64,
    pub gas_price: GasPricePolicy,
    pub max_nonce_retries: u32,
}

impl RecorderConfig {
    pub fn from_ledger_config(cfg: &LedgerConfig) -> Self {
        let gas_price = match cfg.gas_price_gwei {
            Some(gwei) => GasPricePolicy::Fixed(U256::from(gwei) * U256::exp10(9)),
            None => GasPricePolicy::Live,
        };
        Self {
            gas_limit: cfg.gas_limit,
            gas_price,
            max_nonce_retries: cfg.max_nonce_retries,
        }
    }
}

/// Hash of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId(pub TxHash);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Commits result fingerprints to the `storeData(string)` contract method.
///
/// Writes from this process are serialized, so each one queries the node's
/// pending nonce after the previous broadcast is already counted in it. A
/// node that still rejects the nonce (another writer using the same key, or
/// a lagging node) triggers a bounded re-fetch.
pub struct LedgerRecorder {
    identity: Arc<LedgerIdentity>,
    client: Arc<dyn LedgerClient>,
    cfg: RecorderConfig,
    write_lock: Mutex<()>,
}

impl LedgerRecorder {
    pub fn new(identity: Arc<LedgerIdentity>, client: Arc<dyn LedgerClient>, cfg: RecorderConfig) -> Self {
        Self {
            identity,
            client,
            cfg,
            write_lock: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &LedgerIdentity {
        &self.identity
    }

    /// Best-effort: never fails. `None` means nothing was broadcast, or the
    /// node rejected the transaction; details are in the logs.
    #[must_use]
    pub async fn record(&self, record: &ResultRecord) -> Option<TransactionId> {
        match self.try_record(record).await {
            Ok(tx) => {
                info!(tx_hash = %tx, "recorded result fingerprint on-chain");
                Some(tx)
            }
            Err(e) => {
                error!(
                    error = %e,
                    address = %self.identity.checksummed_address(),
                    contract = %self.identity.checksummed_contract(),
                    "failed to store result on-chain"
                );
                None
            }
        }
    }

    pub async fn try_record(&self, record: &ResultRecord) -> Result<TransactionId, LedgerError> {
        let fp = fingerprint(record);
        debug!(payload = %fp.payload, digest = %fp.digest, "result fingerprint");
        let data = self.identity.encode_store_call(&fp.digest)?;
        let address = self.identity.address();

        let _serial = self.write_lock.lock().await;
        let mut attempt = 0u32;
        loop {
            // Always the node's view; a local counter would keep running
            // ahead if a broadcast transaction got evicted from the mempool.
            let nonce = self.client.pending_nonce(address).await?;

            // Diagnostic only; an empty account surfaces as a send error.
            match self.client.balance(address).await {
                Ok(balance) => info!(
                    address = %self.identity.checksummed_address(),
                    balance_wei = %balance,
                    nonce = %nonce,
                    attempt,
                    "attempting tx"
                ),
                Err(e) => warn!(error = %e, nonce = %nonce, attempt, "balance query failed"),
            }

            let gas_price = match self.cfg.gas_price {
                GasPricePolicy::Fixed(p) => p,
                GasPricePolicy::Live => self.client.gas_price().await?,
            };

            let tx: TypedTransaction = TransactionRequest::new()
                .from(address)
                .to(self.identity.contract())
                .nonce(nonce)
                .gas(self.cfg.gas_limit)
                .gas_price(gas_price)
                .data(data.clone())
                .chain_id(self.identity.chain_id())
                .into();
            let raw = self.identity.sign(&tx).await?;
            let local_hash = TxHash::from(keccak256(raw.as_ref()));

            match self.client.send_raw_transaction(raw).await {
                Ok(hash) => return Ok(TransactionId(hash)),
                Err(LedgerError::AlreadyKnown(msg)) => {
                    info!(tx_hash = %TransactionId(local_hash), reason = %msg, "node already holds this transaction");
                    return Ok(TransactionId(local_hash));
                }
                Err(LedgerError::NonceConflict(msg)) if attempt < self.cfg.max_nonce_retries => {
                    warn!(nonce = %nonce, attempt, reason = %msg, "nonce rejected, refetching");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
