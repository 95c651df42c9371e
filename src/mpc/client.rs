//! MPC signing client
//!
//! One public operation: [`MpcClient::sign`]. Canonicalizes the path,
//! quotes the deposit, submits the `sign` change call (directly or via
//! a relayer-dispatched delegate) and parses the signature out of the
//! execution outcome. Exactly one attempt per call; retry policy
//! belongs to callers.

use crate::config::FactoryConfig;
use crate::derive::{derive_child_pubkey, parse_root_public_key};
use crate::error::{ErrorCode, OmnisigError, OmnisigResult};
use crate::log_debug;
use crate::mpc::contract::SignerContract;
use crate::mpc::signature::MpcSignature;
use crate::near::nonce::{NonceCache, NonceLease};
use crate::near::rpc::{FinalExecutionOutcome, NearRpcClient};
use crate::near::signer::{format_public_key, CoordinatorSigner};
use crate::near::tx::{build_function_call_tx, build_signed_delegate, signed_delegate_to_json};
use crate::path::KeyDerivationPath;
use crate::utils::http;
use k256::AffinePoint;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Gas attached to every `sign` change call (300 Tgas)
pub const SIGN_GAS: u64 = 300_000_000_000_000;

/// Blocks a signed delegate stays valid for
const DELEGATE_TTL_BLOCKS: u64 = 600;

/// Relayed-path status poll interval
const TX_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// One signature request
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// The 32-byte sighash to sign
    pub payload: [u8; 32],
    pub path: KeyDerivationPath,
    /// Attach exactly this deposit instead of quoting
    pub proposed_deposit: Option<u128>,
}

impl SignRequest {
    pub fn new(payload: [u8; 32], path: impl Into<KeyDerivationPath>) -> Self {
        Self {
            payload,
            path: path.into(),
            proposed_deposit: None,
        }
    }
}

/// Client around one signer contract and one coordinator account
pub struct MpcClient {
    contract: SignerContract,
    signer: Arc<dyn CoordinatorSigner>,
    relayer_url: Option<String>,
    nonce_cache: NonceCache,
    // Signs sharing this client share an access key; the chain
    // serializes them by nonce anyway, so serialize them here instead
    // of burning attempts on NonceConflict
    sign_lock: Mutex<()>,
}

impl MpcClient {
    pub fn new(config: &FactoryConfig, signer: Arc<dyn CoordinatorSigner>) -> OmnisigResult<Self> {
        config.validate()?;
        let rpc = NearRpcClient::new(config.coordinator_rpc_url());
        Ok(Self {
            contract: SignerContract::new(rpc, config.signer_contract_id.clone()),
            signer,
            relayer_url: config.relayer_url.clone(),
            nonce_cache: NonceCache::new(),
            sign_lock: Mutex::new(()),
        })
    }

    pub fn contract(&self) -> &SignerContract {
        &self.contract
    }

    pub fn caller_id(&self) -> &str {
        self.signer.account_id()
    }

    /// Fetch and parse the network root key
    pub async fn root_public_key(&self) -> OmnisigResult<AffinePoint> {
        let encoded = self.contract.public_key().await?;
        parse_root_public_key(&encoded)
    }

    /// Current deposit quote for one signature
    pub async fn current_fee(&self) -> OmnisigResult<u128> {
        self.contract.signature_deposit().await
    }

    /// Child key for `(predecessor, path)`: the contract view when it
    /// is deployed, local derivation otherwise.
    pub async fn derived_public_key(
        &self,
        path: &KeyDerivationPath,
        predecessor: Option<&str>,
    ) -> OmnisigResult<AffinePoint> {
        let canonical = path.canonicalize();
        let predecessor = predecessor.unwrap_or_else(|| self.signer.account_id());
        match self
            .contract
            .derived_public_key(&canonical, predecessor)
            .await
        {
            Ok(encoded) => parse_root_public_key(&encoded),
            Err(_) => {
                let root = self.root_public_key().await?;
                derive_child_pubkey(&root, predecessor, &canonical)
            }
        }
    }

    /// Request an MPC signature over `request.payload`
    pub async fn sign(&self, request: SignRequest) -> OmnisigResult<MpcSignature> {
        let _serialized = self.sign_lock.lock().await;

        let canonical_path = request.path.canonicalize();
        let deposit = match request.proposed_deposit {
            Some(deposit) => deposit,
            None => self.contract.signature_deposit().await?.max(1),
        };
        let args = sign_args(&request.payload, &canonical_path);
        let args_bytes = serde_json::to_vec(&args)?;

        log_debug!(
            "mpc",
            "Submitting sign request",
            path = canonical_path,
            deposit = deposit,
            relayed = self.relayer_url.is_some(),
        );

        let outcome = match &self.relayer_url {
            None => self.submit_direct(args_bytes, deposit).await?,
            Some(relayer_url) => self.submit_relayed(relayer_url, args_bytes, deposit).await?,
        };
        extract_signature(&outcome)
    }

    /// Direct change call authenticated by the caller's account key
    async fn submit_direct(
        &self,
        args: Vec<u8>,
        deposit: u128,
    ) -> OmnisigResult<FinalExecutionOutcome> {
        let public_key = format_public_key(&self.signer.public_key());
        let lease = self.lease_nonce(&public_key).await?;

        let (signed_tx, tx_hash) = build_function_call_tx(
            self.signer.as_ref(),
            self.contract.contract_id(),
            lease.nonce,
            lease.block_hash,
            "sign",
            args,
            SIGN_GAS,
            deposit,
        )?;

        log_debug!("mpc", "Direct sign call", tx_hash = tx_hash);
        let result = self.contract.rpc().send_tx(signed_tx.to_base64()?).await;
        if let Err(error) = &result {
            if error.code == ErrorCode::NonceConflict {
                self.nonce_cache.invalidate(&public_key);
            }
        }
        result
    }

    /// Relayed path: sign a delegate, hand it to the relayer, poll the
    /// coordinator for the terminal outcome.
    async fn submit_relayed(
        &self,
        relayer_url: &str,
        args: Vec<u8>,
        deposit: u128,
    ) -> OmnisigResult<FinalExecutionOutcome> {
        let public_key = format_public_key(&self.signer.public_key());
        let lease = self.lease_nonce(&public_key).await?;

        let signed_delegate = build_signed_delegate(
            self.signer.as_ref(),
            self.contract.contract_id(),
            lease.nonce,
            lease.block_height + DELEGATE_TTL_BLOCKS,
            "sign",
            args,
            SIGN_GAS,
            deposit,
        )?;
        // The relayer lands the delegate on its own schedule; any nonce
        // we still hold for this key is stale the moment the envelope
        // exists
        self.nonce_cache.invalidate(&public_key);

        let endpoint = format!("{}/send_meta_tx_async", relayer_url.trim_end_matches('/'));
        let body = signed_delegate_to_json(&signed_delegate);
        let tx_hash = http::post_json_text(&endpoint, &body).await?.trim().to_string();
        if tx_hash.is_empty() {
            return Err(OmnisigError::provider_unreachable(
                "Relayer returned an empty transaction hash",
            ));
        }
        log_debug!("mpc", "Delegate accepted by relayer", tx_hash = tx_hash);

        loop {
            if let Some(outcome) = self
                .contract
                .rpc()
                .tx_status(&tx_hash, self.signer.account_id())
                .await?
            {
                return Ok(outcome);
            }
            tokio::time::sleep(TX_POLL_INTERVAL).await;
        }
    }

    async fn lease_nonce(&self, public_key: &str) -> OmnisigResult<NonceLease> {
        if let Some(lease) = self.nonce_cache.allocate(public_key) {
            return Ok(lease);
        }
        let fresh = self
            .contract
            .rpc()
            .view_access_key(self.signer.account_id(), public_key)
            .await?;
        self.nonce_cache.put(public_key, fresh);
        self.nonce_cache
            .allocate(public_key)
            .ok_or_else(|| OmnisigError::protocol_invariant("Nonce cache lost a fresh entry"))
    }
}

/// The `sign` method's argument shape
fn sign_args(payload: &[u8; 32], canonical_path: &str) -> Value {
    json!({
        "request": {
            "payload": payload.to_vec(),
            "path": canonical_path,
            "key_version": 0,
        }
    })
}

/// Pull the signature out of a terminal execution outcome.
///
/// The transaction-level `SuccessValue` wins when present; otherwise
/// the receipts are scanned in order and the first non-empty
/// `SuccessValue` is taken. Anything else is terminal.
fn extract_signature(outcome: &FinalExecutionOutcome) -> OmnisigResult<MpcSignature> {
    if let Some(failure) = outcome.first_failure() {
        return Err(failure_to_error(failure));
    }

    let candidates = outcome
        .status
        .success_value()
        .into_iter()
        .chain(
            outcome
                .receipts_outcome
                .iter()
                .filter_map(|receipt| receipt.outcome.status.success_value()),
        );
    for bytes in candidates {
        if let Some(signature) = parse_signature_value(&bytes) {
            return Ok(signature);
        }
    }
    Err(OmnisigError::signature_unavailable(
        "No receipt carried a signature",
    ))
}

fn parse_signature_value(bytes: &[u8]) -> Option<MpcSignature> {
    #[derive(Deserialize)]
    struct Wrapped {
        #[serde(rename = "Ok")]
        ok: MpcSignature,
    }

    if let Ok(wrapped) = serde_json::from_slice::<Wrapped>(bytes) {
        return Some(wrapped.ok);
    }
    serde_json::from_slice::<MpcSignature>(bytes).ok()
}

fn failure_to_error(failure: &Value) -> OmnisigError {
    let rendered = failure.to_string();
    if rendered.contains("Insufficient deposit") || rendered.contains("DepositTooLow") {
        OmnisigError::fee_too_low("Contract rejected the attached deposit").with_details(rendered)
    } else if rendered.contains("InvalidNonce") {
        OmnisigError::nonce_conflict("Delegate nonce was already used").with_details(rendered)
    } else {
        OmnisigError::signature_unavailable("Sign call failed on-chain").with_details(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    #[test]
    fn test_sign_args_shape() {
        let payload = [7u8; 32];
        let args = sign_args(&payload, "m/44'/60'/0'/0/0");
        assert_eq!(args["request"]["key_version"], 0);
        assert_eq!(args["request"]["path"], "m/44'/60'/0'/0/0");
        let array = args["request"]["payload"].as_array().unwrap();
        assert_eq!(array.len(), 32);
        assert!(array.iter().all(|v| v == 7));
    }

    fn outcome_with_receipts(values: Vec<Option<&str>>) -> FinalExecutionOutcome {
        let receipts: Vec<Value> = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let status = match v {
                    Some(payload) => json!({"SuccessValue": BASE64.encode(payload)}),
                    None => json!({"SuccessValue": ""}),
                };
                json!({"id": format!("r{}", i), "outcome": {"status": status, "logs": []}})
            })
            .collect();
        serde_json::from_value(json!({
            "status": {"SuccessValue": ""},
            "receipts_outcome": receipts,
        }))
        .unwrap()
    }

    #[test]
    fn test_first_nonempty_receipt_wins() {
        let signature_json = r#"{"Ok":{"big_r":{"affine_point":"03aa00000000000000000000000000000000000000000000000000000000000011"},"s":{"scalar":"bb00000000000000000000000000000000000000000000000000000000000022"},"recovery_id":1}}"#;
        let outcome = outcome_with_receipts(vec![None, None, Some(signature_json), None]);

        let signature = extract_signature(&outcome).unwrap();
        assert_eq!(signature.recovery_id, 1);
        assert!(signature.big_r.affine_point.starts_with("03aa"));
    }

    #[test]
    fn test_non_signature_success_values_are_skipped() {
        let signature_json = r#"{"Ok":{"big_r":{"affine_point":"02cc00000000000000000000000000000000000000000000000000000000000011"},"s":{"scalar":"dd"},"recovery_id":0}}"#;
        let outcome = outcome_with_receipts(vec![Some("\"unrelated\""), Some(signature_json)]);

        let signature = extract_signature(&outcome).unwrap();
        assert_eq!(signature.recovery_id, 0);
    }

    #[test]
    fn test_no_signature_is_terminal() {
        let outcome = outcome_with_receipts(vec![None, None]);
        let err = extract_signature(&outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureUnavailable);
    }

    #[test]
    fn test_deposit_failure_maps_to_fee_too_low() {
        let outcome: FinalExecutionOutcome = serde_json::from_value(json!({
            "status": {"Failure": {"ActionError": {"kind": {"FunctionCallError": {"ExecutionError": "Smart contract panicked: Insufficient deposit attached"}}}}},
            "receipts_outcome": [],
        }))
        .unwrap();
        let err = extract_signature(&outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::FeeTooLow);
    }

    #[test]
    fn test_receipt_failure_maps_to_signature_unavailable() {
        let outcome: FinalExecutionOutcome = serde_json::from_value(json!({
            "status": {"SuccessValue": ""},
            "receipts_outcome": [
                {"id": "r0", "outcome": {"status": {"Failure": {"ActionError": {"kind": "Timeout"}}}, "logs": []}}
            ],
        }))
        .unwrap();
        let err = extract_signature(&outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureUnavailable);
    }

    #[test]
    fn test_bare_signature_value_is_accepted() {
        let bare = br#"{"big_r":{"affine_point":"02ee00000000000000000000000000000000000000000000000000000000000011"},"s":{"scalar":"ff"},"recovery_id":0}"#;
        assert!(parse_signature_value(bare).is_some());
        assert!(parse_signature_value(b"\"just a string\"").is_none());
    }
}
