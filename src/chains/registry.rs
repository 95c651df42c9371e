//! Cosmos chain registry
//!
//! Per-chain parameters keyed by chain id. A chain missing from this
//! table (or a table entry missing a usable field) surfaces as
//! `UnsupportedChain` before any I/O happens.

use crate::error::{OmnisigError, OmnisigResult};

/// Everything the Cosmos assembler needs to know about one chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParams {
    pub chain_id: &'static str,
    /// bech32 address prefix
    pub hrp: &'static str,
    pub native_denom: &'static str,
    pub rpc_url: &'static str,
    pub rest_url: &'static str,
    /// Gas price in `native_denom` per gas unit
    pub gas_price: f64,
    pub decimals: u8,
}

const CHAINS: &[ChainParams] = &[
    ChainParams {
        chain_id: "cosmoshub-4",
        hrp: "cosmos",
        native_denom: "uatom",
        rpc_url: "https://cosmos-rpc.publicnode.com:443",
        rest_url: "https://cosmos-rest.publicnode.com",
        gas_price: 0.025,
        decimals: 6,
    },
    ChainParams {
        chain_id: "osmosis-1",
        hrp: "osmo",
        native_denom: "uosmo",
        rpc_url: "https://osmosis-rpc.publicnode.com:443",
        rest_url: "https://osmosis-rest.publicnode.com",
        gas_price: 0.025,
        decimals: 6,
    },
    ChainParams {
        chain_id: "celestia",
        hrp: "celestia",
        native_denom: "utia",
        rpc_url: "https://celestia-rpc.publicnode.com:443",
        rest_url: "https://celestia-rest.publicnode.com",
        gas_price: 0.02,
        decimals: 6,
    },
    ChainParams {
        chain_id: "neutron-1",
        hrp: "neutron",
        native_denom: "untrn",
        rpc_url: "https://neutron-rpc.publicnode.com:443",
        rest_url: "https://neutron-rest.publicnode.com",
        gas_price: 0.025,
        decimals: 6,
    },
    ChainParams {
        chain_id: "noble-1",
        hrp: "noble",
        native_denom: "uusdc",
        rpc_url: "https://noble-rpc.polkachu.com",
        rest_url: "https://noble-api.polkachu.com",
        gas_price: 0.1,
        decimals: 6,
    },
    ChainParams {
        chain_id: "juno-1",
        hrp: "juno",
        native_denom: "ujuno",
        rpc_url: "https://juno-rpc.publicnode.com:443",
        rest_url: "https://juno-rest.publicnode.com",
        gas_price: 0.075,
        decimals: 6,
    },
    ChainParams {
        chain_id: "theta-testnet-001",
        hrp: "cosmos",
        native_denom: "uatom",
        rpc_url: "https://rpc.sentry-01.theta-testnet.polypore.xyz",
        rest_url: "https://rest.sentry-01.theta-testnet.polypore.xyz",
        gas_price: 0.025,
        decimals: 6,
    },
];

/// Resolve a chain id against the registry
pub fn lookup(chain_id: &str) -> OmnisigResult<&'static ChainParams> {
    CHAINS
        .iter()
        .find(|params| params.chain_id == chain_id)
        .ok_or_else(|| OmnisigError::unsupported_chain(chain_id))
}

/// All registered chain ids
pub fn known_chain_ids() -> impl Iterator<Item = &'static str> {
    CHAINS.iter().map(|params| params.chain_id)
}
