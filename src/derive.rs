//! Child key derivation and address hashing
//!
//! Maps `(root public key, caller id, canonical path)` to a child
//! secp256k1 key and from there to per-chain addresses. Everything in
//! this module is deterministic and side-effect-free; no operation
//! touches the network.
//!
//! The child key is `Q = P + epsilon * G` where `epsilon` is the
//! SHA3-256 of a fixed prefix plus `<caller_id>,<canonical_path>`,
//! reduced mod the curve order. The prefix string is part of the wire
//! contract shared with the signer network and must not change.

use crate::error::{OmnisigError, OmnisigResult};
use bech32::{ToBase32, Variant};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::generic_array::GenericArray;
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar, U256};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use tiny_keccak::{Hasher, Keccak};

/// Wire-contract constant: the epsilon domain-separation prefix
pub const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// Bitcoin network flavor, selecting the bech32 HRP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl BitcoinNetwork {
    pub fn hrp(self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "bc",
            BitcoinNetwork::Testnet => "tb",
            BitcoinNetwork::Regtest => "bcrt",
        }
    }
}

/// Compute the derivation scalar for `(caller_id, canonical_path)`
pub fn derive_epsilon(caller_id: &str, canonical_path: &str) -> Scalar {
    let mut hasher = Sha3_256::new();
    hasher.update(EPSILON_DERIVATION_PREFIX.as_bytes());
    hasher.update(caller_id.as_bytes());
    hasher.update(b",");
    hasher.update(canonical_path.as_bytes());
    let digest = hasher.finalize();
    <Scalar as Reduce<U256>>::reduce_bytes(GenericArray::from_slice(&digest))
}

/// Derive the child public key `root + epsilon * G`
///
/// Rejects the (astronomically unlikely) identity result rather than
/// returning a key no chain can use.
pub fn derive_child_pubkey(
    root: &AffinePoint,
    caller_id: &str,
    canonical_path: &str,
) -> OmnisigResult<AffinePoint> {
    let epsilon = derive_epsilon(caller_id, canonical_path);
    let child = ProjectivePoint::from(*root) + ProjectivePoint::GENERATOR * epsilon;
    if child == ProjectivePoint::IDENTITY {
        return Err(OmnisigError::derivation_failed(
            "Derived key is the point at infinity",
        ));
    }
    Ok(child.to_affine())
}

/// Parse a NAJ-encoded secp256k1 root key, `"secp256k1:<base58-of-XY>"`
pub fn parse_root_public_key(encoded: &str) -> OmnisigResult<AffinePoint> {
    let data = encoded.strip_prefix("secp256k1:").ok_or_else(|| {
        OmnisigError::root_key_unavailable(format!(
            "Expected secp256k1-curve key, got '{}'",
            encoded
        ))
    })?;
    let bytes = bs58::decode(data)
        .into_vec()
        .map_err(|e| OmnisigError::root_key_unavailable(format!("Invalid base58: {}", e)))?;
    if bytes.len() != 64 {
        return Err(OmnisigError::root_key_unavailable(format!(
            "Expected 64-byte uncompressed point, got {} bytes",
            bytes.len()
        )));
    }
    let point = EncodedPoint::from_untagged_bytes(GenericArray::from_slice(&bytes));
    let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&point).into();
    affine.ok_or_else(|| OmnisigError::root_key_unavailable("Point is not on secp256k1"))
}

/// NAJ-encode a secp256k1 public key the way the signer contract does
pub fn to_naj_public_key(point: &AffinePoint) -> String {
    let uncompressed = uncompressed_bytes(point);
    format!("secp256k1:{}", bs58::encode(&uncompressed[1..]).into_string())
}

/// 65-byte SEC1 uncompressed serialization, `0x04 || X || Y`
pub fn uncompressed_bytes(point: &AffinePoint) -> [u8; 65] {
    let encoded = point.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// 33-byte SEC1 compressed serialization, `0x02/0x03 || X`
pub fn compressed_bytes(point: &AffinePoint) -> [u8; 33] {
    let encoded = point.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// EVM address: keccak-256 of the uncompressed point without its tag
/// byte, last 20 bytes
pub fn evm_address(point: &AffinePoint) -> [u8; 20] {
    let uncompressed = uncompressed_bytes(point);
    let digest = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}

/// EVM address as a lowercase 0x-prefixed string
pub fn evm_address_string(point: &AffinePoint) -> String {
    format!("0x{}", hex::encode(evm_address(point)))
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (digest[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Bitcoin P2WPKH address: hash160 of the compressed key behind a
/// witness-v0 bech32 envelope
pub fn bitcoin_p2wpkh_address(
    point: &AffinePoint,
    network: BitcoinNetwork,
) -> OmnisigResult<String> {
    let program = hash160(&compressed_bytes(point));
    let mut data = vec![bech32::u5::try_from_u8(0).expect("witness version 0 fits in u5")];
    data.extend(program.to_base32());
    bech32::encode(network.hrp(), data, Variant::Bech32)
        .map_err(|e| OmnisigError::protocol_invariant(format!("Bech32 encoding failed: {}", e)))
}

/// Cosmos bech32 address: hash160 of the compressed key with a
/// chain-specific HRP
pub fn cosmos_bech32_address(point: &AffinePoint, hrp: &str) -> OmnisigResult<String> {
    let digest = hash160(&compressed_bytes(point));
    bech32::encode(hrp, digest.to_base32(), Variant::Bech32)
        .map_err(|e| OmnisigError::protocol_invariant(format!("Bech32 encoding failed: {}", e)))
}

/// SHA-256 then RIPEMD-160
fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(sha));
    out
}

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
