//! EVM transaction assembler
//!
//! Builds type-2 (EIP-1559) transactions, computes the keccak signing
//! hash over the RLP form, and reassembles the signed raw transaction
//! for `eth_sendRawTransaction`. Legacy and access-list types are not
//! produced; every transaction is forced to type 2.

use crate::chains::ChainAdapter;
use crate::derive::{self, keccak256};
use crate::error::{OmnisigError, OmnisigResult};
use crate::log_debug;
use crate::mpc::signature::MpcSignature;
use crate::path::KeyDerivationPath;
use crate::types::{BroadcastResult, ChainFamily, MpcPayload};
use crate::utils::{amount, http};
use k256::AffinePoint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Fallback for both fee fields when estimation fails (10 gwei)
pub const DEFAULT_GAS_PRICE_WEI: u128 = 10_000_000_000;

/// Gas for a plain value transfer
const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// One EVM endpoint
#[derive(Debug, Clone)]
pub struct EvmChain {
    rpc_url: String,
    chain_id: Option<u64>,
}

/// Caller-facing transfer/call request. Optional fields are filled
/// from the RPC during assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmTransactionRequest {
    pub from: String,
    pub to: String,
    /// Value in wei
    pub value: u128,
    #[serde(default)]
    pub data: Vec<u8>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Fully determined EIP-1559 transaction awaiting a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvmTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

impl UnsignedEvmTransaction {
    /// `0x02 || rlp(unsigned fields)`
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let items = vec![
            rlp_encode_u64(self.chain_id),
            rlp_encode_u64(self.nonce),
            rlp_encode_u128(self.max_priority_fee_per_gas),
            rlp_encode_u128(self.max_fee_per_gas),
            rlp_encode_u64(self.gas_limit),
            rlp_encode_bytes(&self.to),
            rlp_encode_u128(self.value),
            rlp_encode_bytes(&self.data),
            rlp_encode_list(&[]), // access list stays empty
        ];
        let mut encoded = vec![0x02];
        encoded.extend_from_slice(&rlp_encode_list(&items));
        encoded
    }

    /// The 32-byte payload the MPC signs
    pub fn signing_payload(&self) -> [u8; 32] {
        keccak256(&self.encode_unsigned())
    }

    /// `0x02 || rlp(unsigned fields ++ [yParity, r, s])`
    pub fn encode_signed(&self, r: &[u8; 32], s: &[u8; 32], y_parity: u8) -> Vec<u8> {
        let items = vec![
            rlp_encode_u64(self.chain_id),
            rlp_encode_u64(self.nonce),
            rlp_encode_u128(self.max_priority_fee_per_gas),
            rlp_encode_u128(self.max_fee_per_gas),
            rlp_encode_u64(self.gas_limit),
            rlp_encode_bytes(&self.to),
            rlp_encode_u128(self.value),
            rlp_encode_bytes(&self.data),
            rlp_encode_list(&[]),
            rlp_encode_u64(y_parity as u64),
            rlp_encode_bytes(trim_leading_zeros(r)),
            rlp_encode_bytes(trim_leading_zeros(s)),
        ];
        let mut encoded = vec![0x02];
        encoded.extend_from_slice(&rlp_encode_list(&items));
        encoded
    }

    /// Worst-case fee, surfaced for caller display
    pub fn max_fee(&self) -> u128 {
        self.max_fee_per_gas.saturating_mul(self.gas_limit as u128)
    }
}

impl EvmChain {
    pub fn new(rpc_url: impl Into<String>, chain_id: Option<u64>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
        }
    }

    async fn rpc_call(&self, method: &'static str, params: Value) -> OmnisigResult<Value> {
        #[derive(Deserialize)]
        struct RpcResponse {
            result: Option<Value>,
            error: Option<RpcErrorBody>,
        }

        #[derive(Deserialize)]
        struct RpcErrorBody {
            #[serde(default)]
            code: i64,
            message: String,
        }

        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let response: RpcResponse = http::post_json(&self.rpc_url, &body).await?;
        if let Some(error) = response.error {
            return Err(if method == "eth_sendRawTransaction" {
                OmnisigError::broadcast_rejected(error.code.unsigned_abs() as u32, error.message)
            } else {
                OmnisigError::provider_unreachable(format!("{} failed", method))
                    .with_details(error.message)
            });
        }
        response
            .result
            .ok_or_else(|| OmnisigError::protocol_invariant(format!("{} returned no result", method)))
    }

    async fn rpc_quantity(&self, method: &'static str, params: Value) -> OmnisigResult<u128> {
        let result = self.rpc_call(method, params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| OmnisigError::protocol_invariant(format!("{} returned non-string", method)))?;
        parse_quantity(text)
    }

    pub async fn chain_id(&self) -> OmnisigResult<u64> {
        if let Some(id) = self.chain_id {
            return Ok(id);
        }
        Ok(self.rpc_quantity("eth_chainId", json!([])).await? as u64)
    }

    pub async fn transaction_count(&self, address: &str) -> OmnisigResult<u64> {
        Ok(self
            .rpc_quantity("eth_getTransactionCount", json!([address, "latest"]))
            .await? as u64)
    }

    /// `(max_fee_per_gas, max_priority_fee_per_gas)` from recent fee
    /// history; both fall back to [`DEFAULT_GAS_PRICE_WEI`] when the
    /// node cannot quote.
    pub async fn estimate_fees(&self) -> (u128, u128) {
        match self.fee_history().await {
            Ok(fees) => fees,
            Err(_) => (DEFAULT_GAS_PRICE_WEI, DEFAULT_GAS_PRICE_WEI),
        }
    }

    async fn fee_history(&self) -> OmnisigResult<(u128, u128)> {
        let result = self
            .rpc_call("eth_feeHistory", json!(["0x1", "latest", [50]]))
            .await?;
        let base_fee = result["baseFeePerGas"]
            .as_array()
            .and_then(|fees| fees.last())
            .and_then(|v| v.as_str())
            .ok_or_else(|| OmnisigError::protocol_invariant("feeHistory missing baseFeePerGas"))?;
        let base_fee = parse_quantity(base_fee)?;
        let priority = result["reward"]
            .get(0)
            .and_then(|r| r.get(0))
            .and_then(|v| v.as_str())
            .and_then(|s| parse_quantity(s).ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_GAS_PRICE_WEI);
        // Two full base-fee steps of headroom on top of the tip
        Ok((base_fee.saturating_mul(2).saturating_add(priority), priority))
    }

    pub async fn estimate_gas(&self, request: &EvmTransactionRequest) -> OmnisigResult<u64> {
        let call = json!([{
            "from": request.from,
            "to": request.to,
            "value": format!("0x{:x}", request.value),
            "data": format!("0x{}", hex::encode(&request.data)),
        }]);
        match self.rpc_quantity("eth_estimateGas", call).await {
            Ok(gas) => Ok(gas as u64),
            // Plain transfers have a fixed cost; anything with calldata
            // needs the node's answer
            Err(_) if request.data.is_empty() => Ok(TRANSFER_GAS_LIMIT),
            Err(e) => Err(e),
        }
    }

    /// ERC-20 balance of `holder` on `token`, via `eth_call`
    pub async fn token_balance(&self, token: &str, holder: &str) -> OmnisigResult<u128> {
        let holder_bytes = parse_address(holder)?;
        parse_address(token)?;
        let mut data = ERC20_BALANCE_OF_SELECTOR.to_vec();
        data.extend_from_slice(&abi_word_address(&holder_bytes));
        let call = json!([{
            "to": token,
            "data": format!("0x{}", hex::encode(data)),
        }, "latest"]);
        let result = self.rpc_call("eth_call", call).await?;
        let text = result
            .as_str()
            .ok_or_else(|| OmnisigError::protocol_invariant("eth_call returned non-string"))?;
        parse_abi_word(text)
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> OmnisigResult<String> {
        let result = self
            .rpc_call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OmnisigError::protocol_invariant("No transaction hash in response"))
    }
}

impl ChainAdapter for EvmChain {
    type Request = EvmTransactionRequest;
    type Unsigned = UnsignedEvmTransaction;

    fn derive_address_and_pubkey(
        &self,
        root: &AffinePoint,
        caller_id: &str,
        path: &KeyDerivationPath,
    ) -> OmnisigResult<(String, [u8; 33])> {
        let child = derive::derive_child_pubkey(root, caller_id, &path.canonicalize())?;
        Ok((
            derive::evm_address_string(&child),
            derive::compressed_bytes(&child),
        ))
    }

    async fn prepare_payload(
        &self,
        request: EvmTransactionRequest,
    ) -> OmnisigResult<(UnsignedEvmTransaction, Vec<MpcPayload>)> {
        let to = parse_address(&request.to)?;
        parse_address(&request.from)?;

        let chain_id = self.chain_id().await?;
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.transaction_count(&request.from).await?,
        };
        let (max_fee_default, priority_default) =
            if request.max_fee_per_gas.is_none() || request.max_priority_fee_per_gas.is_none() {
                self.estimate_fees().await
            } else {
                (0, 0)
            };
        let max_fee_per_gas = request.max_fee_per_gas.unwrap_or(max_fee_default);
        let max_priority_fee_per_gas =
            request.max_priority_fee_per_gas.unwrap_or(priority_default);
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => self.estimate_gas(&request).await?,
        };

        let unsigned = UnsignedEvmTransaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit,
            to,
            value: request.value,
            data: request.data,
        };
        log_debug!(
            "evm",
            "Assembled EIP-1559 transaction",
            nonce = nonce,
            gas_limit = gas_limit,
            max_fee_eth = amount::format_units(unsigned.max_fee(), amount::EVM_DECIMALS),
        );
        let payload = MpcPayload::new(0, unsigned.signing_payload());
        Ok((unsigned, vec![payload]))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: UnsignedEvmTransaction,
        signatures: &[MpcSignature],
    ) -> OmnisigResult<BroadcastResult> {
        let [signature] = signatures else {
            return Err(OmnisigError::protocol_invariant(format!(
                "EVM transactions take exactly one signature, got {}",
                signatures.len()
            )));
        };
        let rsv = signature.to_rsv()?;
        if rsv.v > 1 {
            return Err(OmnisigError::protocol_invariant(format!(
                "yParity must be 0 or 1, got {}",
                rsv.v
            )));
        }
        let raw = unsigned.encode_signed(&rsv.r, &rsv.s, rsv.v);
        let tx_hash = self.send_raw_transaction(&raw).await?;
        Ok(BroadcastResult {
            family: ChainFamily::Evm,
            tx_hash,
        })
    }

    async fn get_balance(&self, address: &str) -> OmnisigResult<u128> {
        parse_address(address)?;
        self.rpc_quantity("eth_getBalance", json!([address, "latest"]))
            .await
    }
}

// Minimal ABI encoding for the two ERC-20 entry points the factory
// touches. A selector is the first four keccak bytes of the function
// signature.

const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const ERC20_BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Calldata for `transfer(address,uint256)`; use as
/// [`EvmTransactionRequest::data`] with the token contract as `to` and
/// zero value.
pub fn erc20_transfer_data(recipient: &str, amount: u128) -> OmnisigResult<Vec<u8>> {
    let to = parse_address(recipient)?;
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&abi_word_address(&to));
    data.extend_from_slice(&abi_word_u128(amount));
    Ok(data)
}

fn abi_word_address(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn abi_word_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Parse one returned 32-byte ABI word into a u128
fn parse_abi_word(text: &str) -> OmnisigResult<u128> {
    let digits = text.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        let (high, low) = digits.split_at(digits.len() - 32);
        if high.bytes().any(|b| b != b'0') {
            return Err(OmnisigError::protocol_invariant(
                "ABI word exceeds u128 range",
            ));
        }
        return parse_quantity(&format!("0x{}", low));
    }
    parse_quantity(&format!("0x{}", digits))
}

/// Parse a `0x`-prefixed 20-byte address
pub fn parse_address(address: &str) -> OmnisigResult<[u8; 20]> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| OmnisigError::config_invalid(format!("Address missing 0x prefix: {}", address)))?;
    let bytes = hex::decode(stripped)
        .map_err(|_| OmnisigError::config_invalid(format!("Address is not hex: {}", address)))?;
    bytes
        .try_into()
        .map_err(|_| OmnisigError::config_invalid(format!("Address is not 20 bytes: {}", address)))
}

/// Parse a JSON-RPC hex quantity
fn parse_quantity(text: &str) -> OmnisigResult<u128> {
    let digits = text.trim_start_matches("0x");
    u128::from_str_radix(digits, 16)
        .map_err(|_| OmnisigError::protocol_invariant(format!("Invalid hex quantity: {}", text)))
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

// RLP encoding

fn rlp_encode_u64(value: u64) -> Vec<u8> {
    rlp_encode_bytes(trim_leading_zeros(&value.to_be_bytes()))
}

fn rlp_encode_u128(value: u128) -> Vec<u8> {
    rlp_encode_bytes(trim_leading_zeros(&value.to_be_bytes()))
}

fn rlp_encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![0x80];
    }
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    if data.len() < 56 {
        let mut result = vec![0x80 + data.len() as u8];
        result.extend_from_slice(data);
        result
    } else {
        let len_bytes = encode_length(data.len());
        let mut result = vec![0xb7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(data);
        result
    }
}

fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for item in items {
        payload.extend_from_slice(item);
    }
    if payload.len() < 56 {
        let mut result = vec![0xc0 + payload.len() as u8];
        result.extend_from_slice(&payload);
        result
    } else {
        let len_bytes = encode_length(payload.len());
        let mut result = vec![0xf7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(&payload);
        result
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    trim_leading_zeros(&len.to_be_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unsigned() -> UnsignedEvmTransaction {
        UnsignedEvmTransaction {
            chain_id: 11155111,
            nonce: 5,
            max_priority_fee_per_gas: 1_500_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            to: [0xaa; 20],
            value: 500_000_000_000_000_000,
            data: vec![],
        }
    }

    #[test]
    fn test_rlp_encode_scalars() {
        assert_eq!(rlp_encode_u64(0), vec![0x80]);
        assert_eq!(rlp_encode_u64(127), vec![127]);
        assert_eq!(rlp_encode_u64(128), vec![0x81, 128]);
        assert_eq!(rlp_encode_u64(256), vec![0x82, 1, 0]);
        assert_eq!(rlp_encode_u128(1_000_000), vec![0x83, 0x0f, 0x42, 0x40]);
    }

    #[test]
    fn test_rlp_encode_bytes() {
        assert_eq!(rlp_encode_bytes(&[]), vec![0x80]);
        assert_eq!(rlp_encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(rlp_encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(rlp_encode_bytes(&[1, 2, 3]), vec![0x83, 1, 2, 3]);

        let long = vec![0xcc; 60];
        let encoded = rlp_encode_bytes(&long);
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 60);
        assert_eq!(encoded.len(), 62);
    }

    #[test]
    fn test_rlp_empty_list() {
        assert_eq!(rlp_encode_list(&[]), vec![0xc0]);
    }

    #[test]
    fn test_unsigned_encoding_is_typed_and_deterministic() {
        let unsigned = sample_unsigned();
        let first = unsigned.encode_unsigned();
        assert_eq!(first[0], 0x02);
        assert_eq!(first, unsigned.encode_unsigned());
        assert_eq!(unsigned.signing_payload(), unsigned.signing_payload());
    }

    #[test]
    fn test_signed_encoding_extends_unsigned() {
        let unsigned = sample_unsigned();
        let r = [0x11u8; 32];
        let s = [0x22u8; 32];
        let signed = unsigned.encode_signed(&r, &s, 1);
        assert_eq!(signed[0], 0x02);
        assert!(signed.len() > unsigned.encode_unsigned().len());

        // Signature with a short r still round-trips through trimming
        let mut short_r = [0u8; 32];
        short_r[31] = 0x05;
        let signed_short = unsigned.encode_signed(&short_r, &s, 0);
        assert!(signed_short.len() < signed.len());
    }

    #[test]
    fn test_max_fee_product() {
        let unsigned = sample_unsigned();
        assert_eq!(unsigned.max_fee(), 30_000_000_000u128 * 21_000);
    }

    #[test]
    fn test_erc20_transfer_data_layout() {
        let data =
            erc20_transfer_data("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045", 1_000_000).unwrap();
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        // Address word: 12 zero bytes then the address
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(data[16], 0xd8);
        // Amount word, big-endian
        assert_eq!(&data[64..], &1_000_000u32.to_be_bytes());
    }

    #[test]
    fn test_parse_abi_word() {
        assert_eq!(parse_abi_word("0x").unwrap(), 0);
        assert_eq!(
            parse_abi_word("0x00000000000000000000000000000000000000000000000000000000000f4240")
                .unwrap(),
            1_000_000
        );
        let over = format!("0x{}{}", "01", "00".repeat(16));
        assert!(parse_abi_word(&over).is_err());
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        assert_eq!(addr[0], 0xd8);
        assert!(parse_address("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045").is_err());
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x2a").unwrap(), 42);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_trim_leading_zeros() {
        assert_eq!(trim_leading_zeros(&[0, 0, 5]), &[5]);
        assert!(trim_leading_zeros(&[0, 0]).is_empty());
        assert_eq!(trim_leading_zeros(&[9, 0]), &[9, 0]);
    }
}
