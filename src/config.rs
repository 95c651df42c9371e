//! Factory configuration
//!
//! Everything the factory needs arrives through this object; the crate
//! never reads environment variables or files. Credential material is
//! handed in separately through the `near::signer` adapter.

use crate::derive::BitcoinNetwork;
use crate::error::{OmnisigError, OmnisigResult};
use serde::{Deserialize, Serialize};

/// Coordinator-chain flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorNetwork {
    Mainnet,
    Testnet,
}

impl CoordinatorNetwork {
    /// Default public JSON-RPC endpoint
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            CoordinatorNetwork::Mainnet => "https://rpc.mainnet.near.org",
            CoordinatorNetwork::Testnet => "https://rpc.testnet.near.org",
        }
    }

    /// Signer contract deployed on each network
    pub fn default_signer_contract(self) -> &'static str {
        match self {
            CoordinatorNetwork::Mainnet => "v1.signer",
            CoordinatorNetwork::Testnet => "v1.signer-prod.testnet",
        }
    }
}

/// EVM endpoint parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmEndpoint {
    pub rpc_url: String,
    /// Fixed chain id; fetched via `eth_chainId` when absent
    pub chain_id: Option<u64>,
}

/// Bitcoin provider parameters (mempool.space-compatible REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinEndpoint {
    pub provider_url: String,
    pub network: BitcoinNetwork,
}

/// Full factory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub coordinator_network: CoordinatorNetwork,
    /// Signer contract account id; defaults per network when empty
    pub signer_contract_id: String,
    /// Coordinator RPC override
    pub rpc_url: Option<String>,
    /// Meta-transaction relayer; absent means direct change calls
    pub relayer_url: Option<String>,
    pub evm: Option<EvmEndpoint>,
    pub bitcoin: Option<BitcoinEndpoint>,
    /// Cosmos chain id resolved against the chain registry
    pub cosmos_chain_id: Option<String>,
}

impl FactoryConfig {
    pub fn new(network: CoordinatorNetwork) -> Self {
        Self {
            coordinator_network: network,
            signer_contract_id: network.default_signer_contract().to_string(),
            rpc_url: None,
            relayer_url: None,
            evm: None,
            bitcoin: None,
            cosmos_chain_id: None,
        }
    }

    pub fn coordinator_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.coordinator_network.default_rpc_url())
    }

    /// Reject missing or contradictory parameters before any I/O
    pub fn validate(&self) -> OmnisigResult<()> {
        if self.signer_contract_id.trim().is_empty() {
            return Err(OmnisigError::config_invalid("signer_contract_id is empty"));
        }
        if let Some(url) = &self.rpc_url {
            validate_url("rpc_url", url)?;
        }
        if let Some(url) = &self.relayer_url {
            validate_url("relayer_url", url)?;
        }
        if let Some(evm) = &self.evm {
            validate_url("evm.rpc_url", &evm.rpc_url)?;
        }
        if let Some(btc) = &self.bitcoin {
            validate_url("bitcoin.provider_url", &btc.provider_url)?;
        }
        if let Some(chain_id) = &self.cosmos_chain_id {
            if chain_id.trim().is_empty() {
                return Err(OmnisigError::config_invalid("cosmos_chain_id is empty"));
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, url: &str) -> OmnisigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(OmnisigError::config_invalid(format!(
            "{} is not an http(s) URL: '{}'",
            field, url
        )))
    }
}
