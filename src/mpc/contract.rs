//! Signer-contract view surface
//!
//! The contract exposes three views the factory reads: the network root
//! key, the current signature deposit, and (optionally) a derived child
//! key. Change calls go through `mpc::client`.

use crate::error::{ErrorCode, OmnisigError, OmnisigResult};
use crate::near::rpc::NearRpcClient;
use serde_json::{json, Value};

/// Read-only handle on the signer contract
#[derive(Debug, Clone)]
pub struct SignerContract {
    rpc: NearRpcClient,
    contract_id: String,
}

impl SignerContract {
    pub fn new(rpc: NearRpcClient, contract_id: impl Into<String>) -> Self {
        Self {
            rpc,
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn rpc(&self) -> &NearRpcClient {
        &self.rpc
    }

    /// `public_key()` view: the NAJ-encoded network root key
    pub async fn public_key(&self) -> OmnisigResult<String> {
        let bytes = self
            .rpc
            .call_function(&self.contract_id, "public_key", &json!({}))
            .await
            .map_err(|e| recode(e, ErrorCode::RootKeyUnavailable))?;
        let key: String = serde_json::from_slice(&bytes)
            .map_err(|e| OmnisigError::root_key_unavailable(format!("Malformed root key: {}", e)))?;
        if key.is_empty() {
            return Err(OmnisigError::root_key_unavailable(
                "Contract returned an empty root key",
            ));
        }
        Ok(key)
    }

    /// `experimental_signature_deposit()` view: the deposit to attach
    /// to `sign`. Quoted fresh before every sign; the value drifts.
    pub async fn signature_deposit(&self) -> OmnisigResult<u128> {
        let bytes = self
            .rpc
            .call_function(&self.contract_id, "experimental_signature_deposit", &json!({}))
            .await
            .map_err(|e| recode(e, ErrorCode::FeeQuoteUnavailable))?;
        // The contract has returned both a bare number and a quoted
        // string across versions; accept either
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| OmnisigError::fee_quote_unavailable(format!("Malformed deposit: {}", e)))?;
        parse_u128(&value)
            .ok_or_else(|| OmnisigError::fee_quote_unavailable(format!("Malformed deposit: {}", value)))
    }

    /// `derived_public_key({path, predecessor})` view; not every
    /// deployment exposes it, callers fall back to local derivation
    pub async fn derived_public_key(
        &self,
        path: &str,
        predecessor: &str,
    ) -> OmnisigResult<String> {
        let args = json!({"path": path, "predecessor": predecessor});
        let bytes = self
            .rpc
            .call_function(&self.contract_id, "derived_public_key", &args)
            .await
            .map_err(|e| recode(e, ErrorCode::RootKeyUnavailable))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| OmnisigError::root_key_unavailable(format!("Malformed derived key: {}", e)))
    }
}

fn recode(error: OmnisigError, code: ErrorCode) -> OmnisigError {
    OmnisigError {
        code,
        message: error.message,
        details: error.details,
    }
}

fn parse_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u128_number_and_string() {
        assert_eq!(parse_u128(&json!(1)), Some(1));
        assert_eq!(
            parse_u128(&json!("340282366920938463463374607431768211455")),
            Some(u128::MAX)
        );
        assert_eq!(parse_u128(&json!("1250000000000000000000")), Some(1_250_000_000_000_000_000_000));
        assert_eq!(parse_u128(&json!(null)), None);
        assert_eq!(parse_u128(&json!("abc")), None);
    }

    #[test]
    fn test_recode_preserves_context() {
        let original = OmnisigError::provider_unreachable("boom").with_details("timeout");
        let recoded = recode(original, ErrorCode::FeeQuoteUnavailable);
        assert_eq!(recoded.code, ErrorCode::FeeQuoteUnavailable);
        assert_eq!(recoded.message, "boom");
        assert_eq!(recoded.details.as_deref(), Some("timeout"));
    }
}
