use crate::ledger::error::{ConfigError, LedgerError};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TxHash, U256};
use std::time::Duration;

/// The handful of node calls needed to build and submit one transaction.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, LedgerError>;
    /// Sequence number including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> Result<U256, LedgerError>;
    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;
    async fn gas_price(&self) -> Result<U256, LedgerError>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, LedgerError>;
}

/// JSON-RPC over HTTP.
#[derive(Clone, Debug)]
pub struct EthLedgerClient {
    provider: Provider<Http>,
}

impl EthLedgerClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|e| ConfigError::Unreachable(format!("invalid rpc url {rpc_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Unreachable(e.to_string()))?;
        let provider = Provider::new(Http::new_with_client(url, http));
        Ok(Self { provider })
    }

    /// Builds the client and confirms the node answers. Returns the chain id
    /// it reports.
    pub async fn connect(rpc_url: &str, timeout: Duration) -> Result<(Self, u64), ConfigError> {
        let client = Self::new(rpc_url, timeout)?;
        let chain_id = client
            .chain_id()
            .await
            .map_err(|e| ConfigError::Unreachable(e.to_string()))?;
        Ok((client, chain_id))
    }
}

fn rpc_err(e: ProviderError) -> LedgerError {
    LedgerError::from_rpc_message(e.to_string())
}

#[async_trait]
impl LedgerClient for EthLedgerClient {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        let id = self.provider.get_chainid().await.map_err(rpc_err)?;
        Ok(id.as_u64())
    }

    async fn pending_nonce(&self, address: Address) -> Result<U256, LedgerError> {
        let block: BlockId = BlockNumber::Pending.into();
        self.provider
            .get_transaction_count(address, Some(block))
            .await
            .map_err(rpc_err)
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.provider.get_balance(address, None).await.map_err(rpc_err)
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.provider.get_gas_price().await.map_err(rpc_err)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, LedgerError> {
        let pending = self.provider.send_raw_transaction(raw).await.map_err(rpc_err)?;
        Ok(*pending)
    }
}
