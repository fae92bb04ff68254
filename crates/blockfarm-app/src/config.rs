//! Runtime configuration
//!
//! The contract address and RPC endpoint are deployment facts supplied
//! through the environment, the headless counterpart of the original
//! build-time configuration. No config file format exists.

use ethers::types::{Address, H256};
use thiserror::Error;

pub const RPC_URL_VAR: &str = "BLOCKFARM_RPC_URL";
pub const CONTRACT_ADDRESS_VAR: &str = "BLOCKFARM_CONTRACT_ADDRESS";
pub const CHAIN_ID_VAR: &str = "BLOCKFARM_CHAIN_ID";
pub const EXPLORER_URL_VAR: &str = "BLOCKFARM_EXPLORER_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Deployment configuration for one registry instance.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON-RPC endpoint of the target chain.
    pub rpc_url: String,

    /// Address of the deployed registry contract.
    pub contract_address: Address,

    /// Chain id used to bind signatures (EIP-155).
    pub chain_id: u64,

    /// Optional block-explorer base URL for transaction links.
    pub explorer_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = require(RPC_URL_VAR)?;
        let contract_address = require(CONTRACT_ADDRESS_VAR)?
            .parse::<Address>()
            .map_err(|err| ConfigError::Invalid(CONTRACT_ADDRESS_VAR, err.to_string()))?;
        let chain_id = require(CHAIN_ID_VAR)?
            .parse::<u64>()
            .map_err(|err| ConfigError::Invalid(CHAIN_ID_VAR, err.to_string()))?;
        let explorer_url = std::env::var(EXPLORER_URL_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(AppConfig { rpc_url, contract_address, chain_id, explorer_url })
    }

    /// Presentational explorer link for a transaction hash.
    pub fn tx_url(&self, hash: H256) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{:#x}", base.trim_end_matches('/'), hash))
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(var))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_explorer(base: &str) -> AppConfig {
        AppConfig {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: Address::zero(),
            chain_id: 31337,
            explorer_url: Some(base.to_string()),
        }
    }

    #[test]
    fn tx_url_joins_base_and_hash() {
        let config = config_with_explorer("https://sepolia.etherscan.io/");
        let hash = H256::from([0x11; 32]);
        let url = config.tx_url(hash).unwrap();
        assert_eq!(
            url,
            format!("https://sepolia.etherscan.io/tx/{:#x}", hash)
        );
        assert!(!url.contains("//tx"));
    }

    #[test]
    fn tx_url_is_absent_without_explorer() {
        let config = AppConfig {
            explorer_url: None,
            ..config_with_explorer("unused")
        };
        assert_eq!(config.tx_url(H256::zero()), None);
    }
}
