//! Coordinator-chain JSON-RPC client
//!
//! Covers the four calls the factory needs: contract view functions,
//! access-key lookups, transaction submission and status polling.

use crate::error::{OmnisigError, OmnisigResult};
use crate::near::nonce::AccessKeyState;
use crate::utils::http;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

/// Execution status of a transaction or receipt
#[derive(Debug, Clone, Deserialize)]
pub enum ExecutionStatusView {
    Unknown,
    NotStarted,
    Started,
    Failure(Value),
    SuccessValue(String),
    SuccessReceiptId(String),
}

impl ExecutionStatusView {
    /// Base64-decoded `SuccessValue`, `None` when absent or empty
    pub fn success_value(&self) -> Option<Vec<u8>> {
        match self {
            ExecutionStatusView::SuccessValue(encoded) if !encoded.is_empty() => {
                BASE64.decode(encoded).ok().filter(|v| !v.is_empty())
            }
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Value> {
        match self {
            ExecutionStatusView::Failure(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptOutcomeView {
    pub id: String,
    pub outcome: OutcomeView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeView {
    pub status: ExecutionStatusView,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Terminal outcome of a transaction and all its receipts
#[derive(Debug, Clone, Deserialize)]
pub struct FinalExecutionOutcome {
    pub status: ExecutionStatusView,
    #[serde(default)]
    pub receipts_outcome: Vec<ReceiptOutcomeView>,
}

impl FinalExecutionOutcome {
    /// First failure anywhere in the outcome tree
    pub fn first_failure(&self) -> Option<&Value> {
        self.status.failure().or_else(|| {
            self.receipts_outcome
                .iter()
                .find_map(|r| r.outcome.status.failure())
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorView>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorView {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<RpcErrorCause>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorCause {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    info: Option<Value>,
}

impl RpcErrorView {
    fn cause_name(&self) -> &str {
        self.cause
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .or(self.name.as_deref())
            .unwrap_or("UNKNOWN")
    }

    fn render(&self) -> String {
        let mut text = self.cause_name().to_string();
        if let Some(message) = &self.message {
            text.push_str(": ");
            text.push_str(message);
        }
        if let Some(info) = self.cause.as_ref().and_then(|c| c.info.as_ref()) {
            text.push_str(&format!(" {}", info));
        } else if let Some(data) = &self.data {
            text.push_str(&format!(" {}", data));
        }
        text
    }
}

/// JSON-RPC client for one coordinator endpoint
#[derive(Debug, Clone)]
pub struct NearRpcClient {
    rpc_url: String,
}

impl NearRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> OmnisigResult<Result<T, RpcErrorView>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "omnisig",
            "method": method,
            "params": params,
        });
        let envelope: RpcEnvelope<T> = http::post_json(&self.rpc_url, &body).await?;
        match (envelope.result, envelope.error) {
            (Some(result), _) => Ok(Ok(result)),
            (None, Some(error)) => Ok(Err(error)),
            (None, None) => Err(OmnisigError::protocol_invariant(
                "RPC response carried neither result nor error",
            )),
        }
    }

    /// Call a contract view function, returning its raw byte result
    pub async fn call_function(
        &self,
        account_id: &str,
        method_name: &str,
        args: &Value,
    ) -> OmnisigResult<Vec<u8>> {
        #[derive(Deserialize)]
        struct CallResult {
            result: Vec<u8>,
        }

        let params = json!({
            "request_type": "call_function",
            "finality": "optimistic",
            "account_id": account_id,
            "method_name": method_name,
            "args_base64": BASE64.encode(args.to_string()),
        });
        match self.request::<CallResult>("query", params).await? {
            Ok(result) => Ok(result.result),
            Err(error) => Err(OmnisigError::provider_unreachable(format!(
                "View call {}.{} failed",
                account_id, method_name
            ))
            .with_details(error.render())),
        }
    }

    /// Fetch access-key state for `(account_id, public_key)`
    pub async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> OmnisigResult<AccessKeyState> {
        #[derive(Deserialize)]
        struct AccessKeyResult {
            nonce: u64,
            block_height: u64,
            block_hash: String,
        }

        let params = json!({
            "request_type": "view_access_key",
            "finality": "final",
            "account_id": account_id,
            "public_key": public_key,
        });
        let result = match self.request::<AccessKeyResult>("query", params).await? {
            Ok(result) => result,
            Err(error) => {
                return Err(OmnisigError::account_not_found(format!(
                    "Access key lookup failed for {}",
                    account_id
                ))
                .with_details(error.render()))
            }
        };
        let block_hash = decode_block_hash(&result.block_hash)?;
        Ok(AccessKeyState {
            nonce: result.nonce,
            block_hash,
            block_height: result.block_height,
        })
    }

    /// Submit a signed transaction and wait for a terminal outcome
    pub async fn send_tx(&self, signed_tx_base64: String) -> OmnisigResult<FinalExecutionOutcome> {
        let params = json!({
            "signed_tx_base64": signed_tx_base64,
            "wait_until": "FINAL",
        });
        match self.request::<FinalExecutionOutcome>("send_tx", params).await? {
            Ok(outcome) => Ok(outcome),
            Err(error) => Err(map_submit_error(&error)),
        }
    }

    /// Look up a transaction's terminal outcome. `Ok(None)` means the
    /// chain does not know the hash yet; callers poll again.
    pub async fn tx_status(
        &self,
        tx_hash: &str,
        sender_account_id: &str,
    ) -> OmnisigResult<Option<FinalExecutionOutcome>> {
        let params = json!({
            "tx_hash": tx_hash,
            "sender_account_id": sender_account_id,
            "wait_until": "FINAL",
        });
        match self.request::<FinalExecutionOutcome>("tx", params).await? {
            Ok(outcome) => Ok(Some(outcome)),
            Err(error) if error.cause_name() == "UNKNOWN_TRANSACTION" => Ok(None),
            Err(error) => Err(map_submit_error(&error)),
        }
    }
}

fn map_submit_error(error: &RpcErrorView) -> OmnisigError {
    let rendered = error.render();
    if rendered.contains("InvalidNonce") || rendered.contains("NonceTooSmall") {
        OmnisigError::nonce_conflict("Transaction nonce was already used").with_details(rendered)
    } else if rendered.contains("INVALID_TRANSACTION") || rendered.contains("InvalidTxError") {
        OmnisigError::protocol_invariant("Coordinator rejected the transaction")
            .with_details(rendered)
    } else {
        OmnisigError::provider_unreachable("Coordinator RPC error").with_details(rendered)
    }
}

fn decode_block_hash(encoded: &str) -> OmnisigResult<[u8; 32]> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| OmnisigError::protocol_invariant(format!("Invalid block hash: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| OmnisigError::protocol_invariant("Block hash is not 32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_value_decoding() {
        let status = ExecutionStatusView::SuccessValue(BASE64.encode(b"\"ok\""));
        assert_eq!(status.success_value().unwrap(), b"\"ok\"");

        let empty = ExecutionStatusView::SuccessValue(String::new());
        assert!(empty.success_value().is_none());

        let receipt = ExecutionStatusView::SuccessReceiptId("abc".to_string());
        assert!(receipt.success_value().is_none());
    }

    #[test]
    fn test_outcome_deserialization() {
        let raw = json!({
            "status": {"SuccessValue": ""},
            "receipts_outcome": [
                {"id": "r1", "outcome": {"status": {"SuccessReceiptId": "r2"}, "logs": []}},
                {"id": "r2", "outcome": {"status": {"SuccessValue": "eyJPayI6e319"}, "logs": ["signed"]}}
            ]
        });
        let outcome: FinalExecutionOutcome = serde_json::from_value(raw).unwrap();
        assert_eq!(outcome.receipts_outcome.len(), 2);
        assert!(outcome.receipts_outcome[1].outcome.status.success_value().is_some());
        assert!(outcome.first_failure().is_none());
    }

    #[test]
    fn test_failure_surfaces() {
        let raw = json!({
            "status": {"Failure": {"ActionError": {"kind": "FunctionCallError"}}},
            "receipts_outcome": []
        });
        let outcome: FinalExecutionOutcome = serde_json::from_value(raw).unwrap();
        assert!(outcome.first_failure().is_some());
    }

    #[test]
    fn test_unit_status_variants_parse() {
        let status: ExecutionStatusView = serde_json::from_value(json!("NotStarted")).unwrap();
        assert!(matches!(status, ExecutionStatusView::NotStarted));
    }

    #[test]
    fn test_nonce_error_mapping() {
        let error = RpcErrorView {
            name: Some("HANDLER_ERROR".to_string()),
            cause: Some(RpcErrorCause {
                name: Some("INVALID_TRANSACTION".to_string()),
                info: Some(json!({"error": "InvalidNonce { tx_nonce: 5, ak_nonce: 5 }"})),
            }),
            message: None,
            data: None,
        };
        let mapped = map_submit_error(&error);
        assert_eq!(mapped.code, crate::error::ErrorCode::NonceConflict);
    }

    #[test]
    fn test_block_hash_decoding() {
        let hash = [3u8; 32];
        let encoded = bs58::encode(hash).into_string();
        assert_eq!(decode_block_hash(&encoded).unwrap(), hash);
        assert!(decode_block_hash("tooshort").is_err());
    }
}
