//! One signing round, end to end
//!
//! Drives a chain adapter and the MPC client through the per-sign
//! lifecycle: assemble, extract payloads, sign each payload, reattach,
//! broadcast. Any failure is terminal for the round; nothing here
//! retries.
//!
//! Callers that split the round across process boundaries checkpoint
//! the unsigned transaction into an injected [`TransactionStore`]
//! between extraction and signature attachment.

use crate::chains::ChainAdapter;
use crate::error::{OmnisigError, OmnisigResult};
use crate::log_info;
use crate::mpc::client::{MpcClient, SignRequest};
use crate::mpc::signature::MpcSignature;
use crate::path::KeyDerivationPath;
use crate::store::TransactionStore;
use crate::types::{BroadcastResult, SignProgress, SignStage};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Assemble, sign and broadcast one transaction
pub async fn sign_and_broadcast<C: ChainAdapter>(
    chain: &C,
    client: &MpcClient,
    path: &KeyDerivationPath,
    request: C::Request,
) -> OmnisigResult<BroadcastResult> {
    let mut progress = SignProgress::new();
    let result = drive(chain, client, path, request, &mut progress).await;
    if result.is_err() && !progress.stage().is_terminal() {
        // Transitions into Failed are legal from every live stage
        let _ = progress.advance(SignStage::Failed);
    }
    result
}

async fn drive<C: ChainAdapter>(
    chain: &C,
    client: &MpcClient,
    path: &KeyDerivationPath,
    request: C::Request,
    progress: &mut SignProgress,
) -> OmnisigResult<BroadcastResult> {
    let (unsigned, mut payloads) = chain.prepare_payload(request).await?;
    progress.advance(SignStage::PayloadExtracted)?;

    progress.advance(SignStage::Signing)?;
    payloads.sort_by_key(|payload| payload.index);
    let mut signatures: Vec<MpcSignature> = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        let signature = client
            .sign(SignRequest {
                payload: payload.payload,
                path: path.clone(),
                proposed_deposit: None,
            })
            .await?;
        signatures.push(signature);
    }
    progress.advance(SignStage::Signed)?;

    progress.advance(SignStage::Broadcasting)?;
    let result = chain
        .attach_signatures_and_broadcast(unsigned, &signatures)
        .await?;
    progress.advance(SignStage::Broadcast)?;

    log_info!(
        "flow",
        "Transaction broadcast",
        tx_hash = result.tx_hash,
        payloads = payloads.len(),
    );
    Ok(result)
}

/// Persist an unsigned transaction under `key` for a later resume
pub fn checkpoint<U: Serialize>(
    store: &dyn TransactionStore,
    key: &str,
    unsigned: &U,
) -> OmnisigResult<()> {
    let bytes = serde_json::to_vec(unsigned)?;
    store.put(key, bytes);
    Ok(())
}

/// Take a previously checkpointed transaction out of the store.
/// Consuming: a second call with the same key returns `None`.
pub fn restore<U: DeserializeOwned>(
    store: &dyn TransactionStore,
    key: &str,
) -> OmnisigResult<Option<U>> {
    match store.take(key) {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| OmnisigError::protocol_invariant("Stored transaction is corrupt").with_details(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::evm::UnsignedEvmTransaction;
    use crate::store::InMemoryStore;

    fn sample_unsigned() -> UnsignedEvmTransaction {
        UnsignedEvmTransaction {
            chain_id: 1,
            nonce: 0,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            gas_limit: 21_000,
            to: [0u8; 20],
            value: 1,
            data: vec![],
        }
    }

    #[test]
    fn test_checkpoint_restore_round_trip() {
        let store = InMemoryStore::new();
        let unsigned = sample_unsigned();

        checkpoint(&store, "pending:evm", &unsigned).unwrap();
        let restored: Option<UnsignedEvmTransaction> = restore(&store, "pending:evm").unwrap();
        assert_eq!(restored, Some(unsigned));

        // Applied exactly once
        let second: Option<UnsignedEvmTransaction> = restore(&store, "pending:evm").unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_restore_rejects_corrupt_entries() {
        let store = InMemoryStore::new();
        store.put("pending:evm", b"not json".to_vec());
        let result: OmnisigResult<Option<UnsignedEvmTransaction>> = restore(&store, "pending:evm");
        assert!(result.is_err());
    }
}
