use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_eval_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: default_model(),
            timeout_ms: default_eval_timeout_ms(),
            max_attempts: default_max_attempts(),
            rate_limit_rpm: default_rate_limit_rpm(),
        }
    }
}

impl EvaluatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Ledger settings as read from file/env. Required fields are validated in
/// [`AppConfig::validate`]; the identity itself is built by
/// `ledger::identity::LedgerIdentity::from_config`.
#[derive(Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_address: String,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub contract_abi_json: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub gas_price_gwei: Option<u64>,
    #[serde(default = "default_max_nonce_retries")]
    pub max_nonce_retries: u32,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            private_key: String::new(),
            public_address: String::new(),
            contract_address: String::new(),
            contract_abi_json: None,
            chain_id: None,
            gas_limit: default_gas_limit(),
            gas_price_gwei: None,
            max_nonce_retries: default_max_nonce_retries(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
        }
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("public_address", &self.public_address)
            .field("contract_address", &self.contract_address)
            .field("custom_abi", &self.contract_abi_json.is_some())
            .field("chain_id", &self.chain_id)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price_gwei", &self.gas_price_gwei)
            .field("max_nonce_retries", &self.max_nonce_retries)
            .field("rpc_timeout_ms", &self.rpc_timeout_ms)
            .finish()
    }
}

impl LedgerConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_eval_timeout_ms() -> u64 {
    20_000
}
fn default_max_attempts() -> u32 {
    1
}
fn default_rate_limit_rpm() -> u32 {
    60
}
fn default_gas_limit() -> u64 {
    200_000
}
fn default_max_nonce_retries() -> u32 {
    2
}
fn default_rpc_timeout_ms() -> u64 {
    15_000
}

impl AppConfig {
    /// Reads the optional TOML file, applies env overrides, resolves `env:VAR`
    /// references and validates. Any error here is fatal at startup.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed reading config file: {}", path.display()))?;
                toml::from_str::<AppConfig>(&raw).context("failed parsing config toml")?
            }
            None => AppConfig::default(),
        };

        cfg.apply_env_overrides()?;
        cfg.resolve_env_refs()?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        let l = &mut self.ledger;
        override_string(&mut l.rpc_url, &["INFURA_URL", "LEDGER_RPC_URL"]);
        override_string(&mut l.private_key, &["PRIVATE_KEY"]);
        override_string(&mut l.public_address, &["PUBLIC_ADDRESS"]);
        override_string(&mut l.contract_address, &["CONTRACT_ADDRESS"]);
        if let Some(abi) = env_nonempty("CONTRACT_ABI_JSON") {
            l.contract_abi_json = Some(abi);
        }
        if let Some(id) = env_nonempty("CHAIN_ID") {
            l.chain_id = Some(id.trim().parse().with_context(|| format!("invalid CHAIN_ID: {id}"))?);
        }

        let e = &mut self.evaluator;
        if let Some(key) = env_nonempty("OPENAI_API_KEY") {
            e.api_key = Some(key);
        }
        if let Some(url) = env_nonempty("OPENAI_BASE_URL") {
            e.base_url = Some(url);
        }
        override_string(&mut e.model, &["MODEL_NAME"]);

        override_string(&mut self.server.bind, &["BIND_ADDR"]);
        Ok(())
    }

    fn resolve_env_refs(&mut self) -> Result<()> {
        let l = &mut self.ledger;
        l.rpc_url = resolve_env_ref(&l.rpc_url)?;
        l.private_key = resolve_env_ref(&l.private_key)?;
        l.public_address = resolve_env_ref(&l.public_address)?;
        l.contract_address = resolve_env_ref(&l.contract_address)?;
        if let Some(abi) = l.contract_abi_json.take() {
            l.contract_abi_json = Some(resolve_env_ref(&abi)?);
        }

        let e = &mut self.evaluator;
        if let Some(key) = e.api_key.take() {
            e.api_key = Some(resolve_env_ref(&key)?);
        }
        if let Some(url) = e.base_url.take() {
            e.base_url = Some(resolve_env_ref(&url)?);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let l = &mut self.ledger;
        l.rpc_url = l.rpc_url.trim().to_string();
        l.private_key = l.private_key.trim().to_string();
        if !l.private_key.is_empty() && !l.private_key.starts_with("0x") {
            l.private_key = format!("0x{}", l.private_key);
        }
        l.public_address = l.public_address.trim().to_string();
        l.contract_address = l.contract_address.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.ledger;
        for (name, value) in [
            ("ledger.rpc_url (INFURA_URL)", &l.rpc_url),
            ("ledger.private_key (PRIVATE_KEY)", &l.private_key),
            ("ledger.public_address (PUBLIC_ADDRESS)", &l.public_address),
            ("ledger.contract_address (CONTRACT_ADDRESS)", &l.contract_address),
        ] {
            if value.is_empty() {
                return Err(anyhow!("missing required setting {name}"));
            }
        }
        if l.gas_limit == 0 {
            return Err(anyhow!("ledger.gas_limit must be > 0"));
        }
        if self.evaluator.max_attempts == 0 {
            return Err(anyhow!("evaluator.max_attempts must be > 0"));
        }
        if self.evaluator.timeout_ms == 0 {
            return Err(anyhow!("evaluator.timeout_ms must be > 0"));
        }
        Ok(())
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn override_string(slot: &mut String, names: &[&str]) {
    if let Some(v) = names.iter().find_map(|n| env_nonempty(n)) {
        *slot = v;
    }
}

pub fn resolve_env_ref(value: &str) -> Result<String> {
    const PREFIX: &str = "env:";
    if let Some(var) = value.strip_prefix(PREFIX) {
        let var = var.trim();
        if var.is_empty() {
            return Err(anyhow!("invalid env ref: {value}"));
        }
        return env::var(var).with_context(|| format!("missing env var {var} for {value}"));
    }
    Ok(value.to_string())
}
