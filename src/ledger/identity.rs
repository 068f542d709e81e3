use crate::config::LedgerConfig;
use crate::ledger::error::{ConfigError, LedgerError};
use ethers::abi::{Abi, Function, ParamType, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use ethers::utils::to_checksum;
use std::fmt;
use std::str::FromStr;

pub const STORE_METHOD: &str = "storeData";

pub const DEFAULT_ABI_JSON: &str = r#"[
  {
    "inputs": [{ "internalType": "string", "name": "data", "type": "string" }],
    "name": "storeData",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  }
]"#;

/// Signing key, addresses and contract binding. Built once at startup and
/// shared read-only afterwards.
pub struct LedgerIdentity {
    wallet: LocalWallet,
    contract: Address,
    store_fn: Function,
}

impl LedgerIdentity {
    /// Validates the configured identity against the chain id reported by the
    /// node. The configured public address must be the key's own address.
    pub fn from_config(cfg: &LedgerConfig, chain_id: u64) -> Result<Self, ConfigError> {
        let wallet = LocalWallet::from_str(cfg.private_key.trim())
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?
            .with_chain_id(chain_id);

        let configured = parse_address("public", &cfg.public_address)?;
        if configured != wallet.address() {
            return Err(ConfigError::AddressMismatch {
                configured: to_checksum(&configured, None),
                derived: to_checksum(&wallet.address(), None),
            });
        }

        let contract = parse_address("contract", &cfg.contract_address)?;
        if contract == Address::zero() {
            return Err(ConfigError::ZeroContract);
        }

        let abi_json = cfg.contract_abi_json.as_deref().unwrap_or(DEFAULT_ABI_JSON);
        let store_fn = resolve_store_fn(abi_json)?;

        Ok(Self { wallet, contract, store_fn })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    pub fn checksummed_address(&self) -> String {
        to_checksum(&self.address(), None)
    }

    pub fn checksummed_contract(&self) -> String {
        to_checksum(&self.contract, None)
    }

    /// ABI-encoded `storeData(data)` calldata, selector included.
    pub fn encode_store_call(&self, data: &str) -> Result<Bytes, LedgerError> {
        self.store_fn
            .encode_input(&[Token::String(data.to_string())])
            .map(Bytes::from)
            .map_err(|e| LedgerError::Encoding(e.to_string()))
    }

    /// Signs and RLP-encodes the transaction for `eth_sendRawTransaction`.
    pub async fn sign(&self, tx: &TypedTransaction) -> Result<Bytes, LedgerError> {
        let sig = self
            .wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()))?;
        Ok(tx.rlp_signed(&sig))
    }
}

impl fmt::Debug for LedgerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerIdentity")
            .field("address", &self.checksummed_address())
            .field("contract", &self.checksummed_contract())
            .field("chain_id", &self.chain_id())
            .field("method", &self.store_fn.signature())
            .finish_non_exhaustive()
    }
}

/// Accepts all-lowercase or all-uppercase hex, or mixed case that is a valid
/// EIP-55 checksum.
pub fn parse_address(field: &'static str, raw: &str) -> Result<Address, ConfigError> {
    let raw = raw.trim();
    let invalid = |reason: &str| ConfigError::InvalidAddress {
        field,
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let hex_part = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("expected 20 bytes of hex"));
    }
    let addr = Address::from_str(hex_part).map_err(|e| invalid(&e.to_string()))?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = to_checksum(&addr, None);
        if expected[2..] != *hex_part {
            return Err(invalid("bad EIP-55 checksum"));
        }
    }
    Ok(addr)
}

fn resolve_store_fn(abi_json: &str) -> Result<Function, ConfigError> {
    let abi: Abi = serde_json::from_str(abi_json).map_err(|e| ConfigError::Abi(e.to_string()))?;
    let func = abi
        .function(STORE_METHOD)
        .map_err(|e| ConfigError::Abi(format!("{STORE_METHOD}: {e}")))?;
    let takes_one_string = func.inputs.len() == 1 && func.inputs[0].kind == ParamType::String;
    if !takes_one_string {
        return Err(ConfigError::Abi(format!(
            "{STORE_METHOD} must take exactly one string argument, found {}",
            func.signature()
        )));
    }
    Ok(func.clone())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    pub const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    pub const OTHER_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    pub fn ledger_cfg() -> LedgerConfig {
        LedgerConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            private_key: KEY.into(),
            public_address: ADDRESS.into(),
            contract_address: CONTRACT.into(),
            ..LedgerConfig::default()
        }
    }

    #[test]
    fn builds_from_valid_config() {
        let id = LedgerIdentity::from_config(&ledger_cfg(), 31337).unwrap();
        assert_eq!(id.checksummed_address(), ADDRESS);
        assert_eq!(id.checksummed_contract(), CONTRACT);
        assert_eq!(id.chain_id(), 31337);
    }

    #[test]
    fn lowercase_addresses_are_normalized() {
        let mut cfg = ledger_cfg();
        cfg.public_address = ADDRESS.to_lowercase();
        cfg.contract_address = CONTRACT.to_lowercase();
        let id = LedgerIdentity::from_config(&cfg, 1).unwrap();
        assert_eq!(id.checksummed_address(), ADDRESS);
        assert_eq!(id.checksummed_contract(), CONTRACT);
    }

    #[test]
    fn key_without_prefix_is_accepted() {
        let mut cfg = ledger_cfg();
        cfg.private_key = KEY.trim_start_matches("0x").into();
        assert!(LedgerIdentity::from_config(&cfg, 1).is_ok());
    }

    #[test]
    fn rejects_address_not_matching_key() {
        let mut cfg = ledger_cfg();
        cfg.public_address = OTHER_ADDRESS.into();
        let err = LedgerIdentity::from_config(&cfg, 1).unwrap_err();
        assert!(matches!(err, ConfigError::AddressMismatch { .. }), "{err}");
    }

    #[test]
    fn rejects_bad_checksum_and_garbage() {
        assert!(parse_address("public", "0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").is_err());
        assert!(parse_address("public", "0x1234").is_err());
        assert!(parse_address("public", "0xzz9Fd6e51aad88F6F4ce6aB8827279cffFb92266").is_err());
    }

    #[test]
    fn rejects_zero_contract() {
        let mut cfg = ledger_cfg();
        cfg.contract_address = "0x0000000000000000000000000000000000000000".into();
        assert!(matches!(LedgerIdentity::from_config(&cfg, 1), Err(ConfigError::ZeroContract)));
    }

    #[test]
    fn custom_abi_must_expose_store_data_string() {
        let mut cfg = ledger_cfg();
        cfg.contract_abi_json = Some(
            r#"[{"inputs":[{"name":"x","type":"uint256"}],"name":"storeData","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#
                .into(),
        );
        assert!(matches!(LedgerIdentity::from_config(&cfg, 1), Err(ConfigError::Abi(_))));

        cfg.contract_abi_json = Some(r#"[]"#.into());
        assert!(matches!(LedgerIdentity::from_config(&cfg, 1), Err(ConfigError::Abi(_))));
    }

    #[test]
    fn encodes_store_data_call() {
        let id = LedgerIdentity::from_config(&ledger_cfg(), 1).unwrap();
        let data = id.encode_store_call("abc").unwrap();
        // keccak256("storeData(string)")[..4]
        let selector = &ethers::utils::keccak256("storeData(string)")[..4];
        assert_eq!(&data[..4], selector);
        let decoded = id.store_fn.decode_input(&data[4..]).unwrap();
        assert_eq!(decoded, vec![Token::String("abc".into())]);
    }

    #[test]
    fn debug_never_prints_key() {
        let id = LedgerIdentity::from_config(&ledger_cfg(), 1).unwrap();
        let dbg = format!("{id:?}");
        assert!(!dbg.contains(KEY.trim_start_matches("0x")));
        assert!(dbg.contains(ADDRESS));
    }
}
