#![allow(dead_code)]

use async_trait::async_trait;
use debate_judge::config::LedgerConfig;
use debate_judge::evaluation::Evaluator;
use debate_judge::ledger::{
    GasPricePolicy, LedgerClient, LedgerError, LedgerIdentity, LedgerRecorder, RecorderConfig,
};
use debate_judge::types::SideOutcome;
use ethers::types::{Address, Bytes, TxHash, U256};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Scores each argument by exact text lookup; unknown text gets 50.
pub struct FakeEvaluator {
    pub scores: HashMap<String, f64>,
}

impl FakeEvaluator {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self { scores: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect() }
    }
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn evaluate(&self, argument: &str, _topic: &str) -> SideOutcome {
        let score = self.scores.get(argument).copied().unwrap_or(50.0);
        SideOutcome { score, rationale: format!("scored {argument}") }
    }
}

/// Accepts every transaction, or fails every call when `down` is set.
#[derive(Default)]
pub struct FakeLedgerClient {
    pub down: bool,
    pub nonce: AtomicU64,
    pub raw: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl LedgerClient for FakeLedgerClient {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.check()?;
        Ok(31337)
    }

    async fn pending_nonce(&self, _address: Address) -> Result<U256, LedgerError> {
        self.check()?;
        Ok(U256::from(self.nonce.load(Ordering::SeqCst)))
    }

    async fn balance(&self, _address: Address) -> Result<U256, LedgerError> {
        self.check()?;
        Ok(U256::exp10(18))
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.check()?;
        Ok(U256::from(1_000_000_000u64))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, LedgerError> {
        self.check()?;
        self.nonce.fetch_add(1, Ordering::SeqCst);
        let hash = TxHash::from(keccak256(raw.as_ref()));
        self.raw.lock().unwrap().push(raw);
        Ok(hash)
    }
}

impl FakeLedgerClient {
    fn check(&self) -> Result<(), LedgerError> {
        if self.down {
            Err(LedgerError::Rpc("error sending request: connection refused".into()))
        } else {
            Ok(())
        }
    }
}

pub fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        rpc_url: "http://127.0.0.1:8545".into(),
        private_key: KEY.into(),
        public_address: ADDRESS.into(),
        contract_address: CONTRACT.into(),
        ..LedgerConfig::default()
    }
}

pub fn recorder(client: Arc<FakeLedgerClient>) -> LedgerRecorder {
    let identity = LedgerIdentity::from_config(&ledger_config(), 31337).unwrap();
    let cfg = RecorderConfig {
        gas_limit: 200_000,
        gas_price: GasPricePolicy::Live,
        max_nonce_retries: 2,
    };
    LedgerRecorder::new(Arc::new(identity), client, cfg)
}
