//! Signature translation
//!
//! The signer contract returns an affine nonce point, an `s` scalar and
//! a recovery id. Chains want that in three shapes: `{r, s, v}` for
//! EVM, raw 64-byte `R || S` for Bitcoin witnesses and Cosmos, and
//! low-S DER for Bitcoin script verification. The raw `r` is the nonce
//! point's x-coordinate, i.e. the compressed affine point minus its
//! parity byte, a convention fixed by the contract.

use crate::derive;
use crate::error::{OmnisigError, OmnisigResult};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Compressed affine point as the contract serializes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinePointHex {
    /// 33-byte compressed SEC1 point, hex
    pub affine_point: String,
}

/// Scalar as the contract serializes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarHex {
    /// 32-byte big-endian scalar, hex
    pub scalar: String,
}

/// Signature in the signer contract's wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSignature {
    pub big_r: AffinePointHex,
    pub s: ScalarHex,
    pub recovery_id: u8,
}

/// `{r, s, v}` form used by EVM chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl MpcSignature {
    pub fn new(big_r_hex: impl Into<String>, s_hex: impl Into<String>, recovery_id: u8) -> Self {
        Self {
            big_r: AffinePointHex {
                affine_point: big_r_hex.into(),
            },
            s: ScalarHex {
                scalar: s_hex.into(),
            },
            recovery_id,
        }
    }

    /// Convert to `{r, s, v}`: drop the parity byte off `big_r`, keep
    /// `s`, use the recovery id as `v`.
    pub fn to_rsv(&self) -> OmnisigResult<RsvSignature> {
        let point = &self.big_r.affine_point;
        if point.len() != 66 {
            return Err(OmnisigError::protocol_invariant(format!(
                "Expected 33-byte compressed nonce point, got {} hex chars",
                point.len()
            )));
        }
        let r_bytes = hex::decode(&point[2..])?;
        let s_bytes = hex::decode(&self.s.scalar)?;
        if s_bytes.len() > 32 {
            return Err(OmnisigError::protocol_invariant(
                "Signature s component exceeds 32 bytes",
            ));
        }
        let mut r = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        // Left-pad short scalars
        let mut s = [0u8; 32];
        s[32 - s_bytes.len()..].copy_from_slice(&s_bytes);
        Ok(RsvSignature {
            r,
            s,
            v: self.recovery_id,
        })
    }

    /// Raw `R || S` used by Bitcoin witnesses and Cosmos `TxRaw`
    pub fn raw_64(&self) -> OmnisigResult<[u8; 64]> {
        Ok(self.to_rsv()?.raw_64())
    }

    /// Low-S DER encoding for Bitcoin script verification
    pub fn to_der_low_s(&self) -> OmnisigResult<Vec<u8>> {
        let (signature, _) = self.to_k256()?;
        let normalized = signature.normalize_s().unwrap_or(signature);
        Ok(normalized.to_der().as_bytes().to_vec())
    }

    /// Parse into curve-checked k256 form
    pub fn to_k256(&self) -> OmnisigResult<(Signature, RecoveryId)> {
        let rsv = self.to_rsv()?;
        let signature = Signature::from_scalars(rsv.r, rsv.s)?;
        let recovery = RecoveryId::from_byte(rsv.v).ok_or_else(|| {
            OmnisigError::protocol_invariant(format!("Invalid recovery id {}", rsv.v))
        })?;
        Ok((signature, recovery))
    }
}

impl RsvSignature {
    pub fn raw_64(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

/// Recover the EVM address that produced `signature` over `prehash`
pub fn recover_evm_address(prehash: &[u8; 32], signature: &MpcSignature) -> OmnisigResult<[u8; 20]> {
    let (sig, recovery) = signature.to_k256()?;
    let key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery)
        .map_err(|e| OmnisigError::protocol_invariant(format!("Recovery failed: {}", e)))?;
    Ok(derive::evm_address(key.as_affine()))
}

/// Verify a raw `R || S` signature over `prehash` against a compressed
/// secp256k1 public key
pub fn verify_raw(
    compressed_pubkey: &[u8],
    prehash: &[u8; 32],
    raw: &[u8; 64],
) -> OmnisigResult<bool> {
    let key = VerifyingKey::from_sec1_bytes(compressed_pubkey)
        .map_err(|e| OmnisigError::protocol_invariant(format!("Invalid public key: {}", e)))?;
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&raw[..32]);
    s.copy_from_slice(&raw[32..]);
    let signature = Signature::from_scalars(r, s)?;
    Ok(key.verify_prehash(prehash, &signature).is_ok())
}
