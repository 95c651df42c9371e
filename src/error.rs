//! Unified error types for omnisig
//!
//! Every fallible operation in the crate surfaces an `OmnisigError`;
//! the `ErrorCode` sum is closed and maps one-to-one onto the failure
//! classes callers are expected to branch on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all omnisig operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmnisigError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl OmnisigError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, msg)
    }

    pub fn unsupported_chain(chain_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnsupportedChain,
            format!("No registry entry for chain '{}'", chain_id),
        )
    }

    pub fn root_key_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RootKeyUnavailable, msg)
    }

    pub fn derivation_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DerivationFailed, msg)
    }

    pub fn fee_quote_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeeQuoteUnavailable, msg)
    }

    pub fn nonce_conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NonceConflict, msg)
    }

    pub fn signature_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureUnavailable, msg)
    }

    pub fn fee_too_low(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeeTooLow, msg)
    }

    pub fn account_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccountNotFound, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    /// The foreign chain refused the signed transaction. `code` is the
    /// chain's own rejection code (0 where the provider only returns text).
    pub fn broadcast_rejected(code: u32, raw_log: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::BroadcastRejected,
            format!("Broadcast rejected (code {})", code),
        )
        .with_details(raw_log)
    }

    pub fn provider_unreachable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderUnreachable, msg)
    }

    /// Assertion-class failures: a wire shape or internal invariant did
    /// not hold. These indicate a bug, not an operational condition.
    pub fn protocol_invariant(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProtocolInvariantViolated, msg)
    }
}

impl fmt::Display for OmnisigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for OmnisigError {}

/// Closed set of failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Configuration
    ConfigInvalid,
    UnsupportedChain,

    // Signer contract
    RootKeyUnavailable,
    DerivationFailed,
    FeeQuoteUnavailable,
    NonceConflict,
    SignatureUnavailable,
    FeeTooLow,

    // Foreign chains
    AccountNotFound,
    InsufficientFunds,
    BroadcastRejected,

    // Transport
    ProviderUnreachable,

    // Bugs
    ProtocolInvariantViolated,
}

/// Result type alias for omnisig operations
pub type OmnisigResult<T> = Result<T, OmnisigError>;

// Conversions from common error types

impl From<serde_json::Error> for OmnisigError {
    fn from(e: serde_json::Error) -> Self {
        OmnisigError::protocol_invariant("JSON shape mismatch").with_details(e.to_string())
    }
}

impl From<hex::FromHexError> for OmnisigError {
    fn from(e: hex::FromHexError) -> Self {
        OmnisigError::protocol_invariant("Invalid hex payload").with_details(e.to_string())
    }
}

impl From<reqwest::Error> for OmnisigError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OmnisigError::provider_unreachable("Request timed out").with_details(e.to_string())
        } else if e.is_connect() {
            OmnisigError::provider_unreachable("Connection failed").with_details(e.to_string())
        } else {
            OmnisigError::provider_unreachable(e.to_string())
        }
    }
}

impl From<bitcoin::sighash::P2wpkhError> for OmnisigError {
    fn from(e: bitcoin::sighash::P2wpkhError) -> Self {
        OmnisigError::protocol_invariant(format!("Sighash computation failed: {}", e))
    }
}

impl From<k256::ecdsa::Error> for OmnisigError {
    fn from(e: k256::ecdsa::Error) -> Self {
        OmnisigError::protocol_invariant(format!("Signature assembly failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = OmnisigError::insufficient_funds("Need 120000 sats")
            .with_details("Available: 95000 sats");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_funds"));
        assert!(json.contains("Need 120000 sats"));
    }

    #[test]
    fn test_broadcast_rejected_carries_code_and_log() {
        let err = OmnisigError::broadcast_rejected(13, "out of gas");
        assert_eq!(err.code, ErrorCode::BroadcastRejected);
        assert!(err.message.contains("13"));
        assert_eq!(err.details.as_deref(), Some("out of gas"));
    }

    #[test]
    fn test_display_includes_details() {
        let err = OmnisigError::fee_too_low("Deposit below quote").with_details("attached 1");
        let text = err.to_string();
        assert!(text.contains("FeeTooLow"));
        assert!(text.contains("attached 1"));
    }
}
