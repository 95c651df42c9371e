//! Per-chain transaction assemblers
//!
//! Each chain family implements [`ChainAdapter`]: derive the caller's
//! address, assemble an unsigned transaction and extract its sighash
//! payload(s), then reattach MPC signatures and broadcast. Assemblers
//! never see private keys.

pub mod bitcoin;
pub mod cosmos;
pub mod evm;
pub mod registry;

use crate::error::OmnisigResult;
use crate::path::KeyDerivationPath;
use crate::types::{BroadcastResult, MpcPayload};
use k256::AffinePoint;
use serde::{Deserialize, Serialize};

use crate::mpc::signature::MpcSignature;

/// Capability every chain family provides
#[allow(async_fn_in_trait)]
pub trait ChainAdapter {
    /// Caller-facing transaction request shape
    type Request;
    /// Chain-specific unsigned transaction
    type Unsigned;

    /// Derive the caller's address and compressed public key on this
    /// chain. Pure: no network access.
    fn derive_address_and_pubkey(
        &self,
        root: &AffinePoint,
        caller_id: &str,
        path: &KeyDerivationPath,
    ) -> OmnisigResult<(String, [u8; 33])>;

    /// Assemble the unsigned transaction and the exact payload(s) the
    /// MPC must sign, ascending by payload index.
    async fn prepare_payload(
        &self,
        request: Self::Request,
    ) -> OmnisigResult<(Self::Unsigned, Vec<MpcPayload>)>;

    /// Reattach signatures (one per payload, same order) and hand the
    /// signed artifact to the chain's provider.
    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: Self::Unsigned,
        signatures: &[MpcSignature],
    ) -> OmnisigResult<BroadcastResult>;

    /// Spendable balance of `address` in the chain's base unit
    async fn get_balance(&self, address: &str) -> OmnisigResult<u128>;
}

/// Unsigned transaction across all supported families
///
/// Callers that persist a transaction across the signing round trip
/// store this (see [`crate::store::TransactionStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnsignedTransaction {
    Evm(evm::UnsignedEvmTransaction),
    Bitcoin(bitcoin::UnsignedBitcoinTransaction),
    Cosmos(cosmos::UnsignedCosmosTransaction),
}
