//! Coordinator-chain credential adapter
//!
//! The only secret in the whole system is the caller's coordinator
//! account key. It enters through this trait and never leaves it; the
//! rest of the crate sees account id, public key and a sign callback.

use crate::error::{OmnisigError, OmnisigResult};
use ed25519_dalek::{Signer, SigningKey};

/// Signing capability for the caller's coordinator-chain account
pub trait CoordinatorSigner: Send + Sync {
    fn account_id(&self) -> &str;

    /// Raw ed25519 public key bytes
    fn public_key(&self) -> [u8; 32];

    /// Sign an arbitrary 32-byte digest
    fn sign(&self, digest: &[u8; 32]) -> [u8; 64];
}

/// In-memory ed25519 keypair implementation
pub struct KeyPairSigner {
    account_id: String,
    signing_key: SigningKey,
}

impl KeyPairSigner {
    /// Build from a 32-byte seed
    pub fn from_seed(account_id: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            account_id: account_id.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse an `ed25519:<base58>` secret key string. Accepts both the
    /// 64-byte keypair form and a bare 32-byte seed.
    pub fn from_secret_key(
        account_id: impl Into<String>,
        secret_key: &str,
    ) -> OmnisigResult<Self> {
        let encoded = secret_key.strip_prefix("ed25519:").ok_or_else(|| {
            OmnisigError::config_invalid("Secret key must be 'ed25519:<base58>'")
        })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| OmnisigError::config_invalid(format!("Invalid base58 key: {}", e)))?;
        let seed: [u8; 32] = match bytes.len() {
            32 => bytes.as_slice().try_into().expect("length checked"),
            64 => bytes[..32].try_into().expect("length checked"),
            n => {
                return Err(OmnisigError::config_invalid(format!(
                    "Expected 32- or 64-byte key, got {} bytes",
                    n
                )))
            }
        };
        Ok(Self::from_seed(account_id, seed))
    }
}

impl CoordinatorSigner for KeyPairSigner {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn sign(&self, digest: &[u8; 32]) -> [u8; 64] {
        self.signing_key.sign(digest).to_bytes()
    }
}

/// Format a raw ed25519 key the way the coordinator chain expects
pub fn format_public_key(key: &[u8; 32]) -> String {
    format!("ed25519:{}", bs58::encode(key).into_string())
}
