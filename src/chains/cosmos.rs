//! Cosmos SDK transaction assembler
//!
//! Encodes `TxBody`/`AuthInfo`/`SignDoc` protobuf by hand (the message
//! set is tiny and fixed), signs with SIGN_MODE_DIRECT and broadcasts
//! through the chain's REST endpoint with BROADCAST_MODE_SYNC.

use crate::chains::registry::{self, ChainParams};
use crate::chains::ChainAdapter;
use crate::derive;
use crate::error::{OmnisigError, OmnisigResult};
use crate::log_debug;
use crate::mpc::signature::MpcSignature;
use crate::path::KeyDerivationPath;
use crate::types::{BroadcastResult, ChainFamily, MpcPayload};
use crate::utils::http;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::AffinePoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default gas limit when the caller does not supply one
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
const MSG_DELEGATE_TYPE_URL: &str = "/cosmos.staking.v1beta1.MsgDelegate";

/// SIGN_MODE_DIRECT discriminant
const SIGN_MODE_DIRECT: u64 = 1;

/// Coin denomination and amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Amount as string; Cosmos amounts routinely exceed u64
    pub amount: String,
}

/// Bank transfer message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

/// Staking delegation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator_address: String,
    pub validator_address: String,
    pub amount: Coin,
}

/// A transaction message: a typed message this crate encodes itself,
/// or a pre-encoded `Any` it passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CosmosMessage {
    Send(MsgSend),
    Delegate(MsgDelegate),
    Raw { type_url: String, value: Vec<u8> },
}

impl CosmosMessage {
    pub fn type_url(&self) -> &str {
        match self {
            CosmosMessage::Send(_) => MSG_SEND_TYPE_URL,
            CosmosMessage::Delegate(_) => MSG_DELEGATE_TYPE_URL,
            CosmosMessage::Raw { type_url, .. } => type_url,
        }
    }

    fn encode_value(&self) -> Vec<u8> {
        match self {
            CosmosMessage::Send(msg) => encode_msg_send(msg),
            CosmosMessage::Delegate(msg) => encode_msg_delegate(msg),
            CosmosMessage::Raw { value, .. } => value.clone(),
        }
    }
}

/// Caller-facing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosTransactionRequest {
    /// Signer's bech32 address on this chain
    pub address: String,
    /// Compressed secp256k1 public key matching `address`
    #[serde(with = "crate::utils::serde_hex::hex33")]
    pub public_key: [u8; 33],
    pub messages: Vec<CosmosMessage>,
    pub memo: Option<String>,
    pub gas: Option<u64>,
}

/// SIGN_MODE_DIRECT material awaiting one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCosmosTransaction {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

impl UnsignedCosmosTransaction {
    /// Proto-encoded `SignDoc`
    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        let mut doc = Vec::new();
        put_bytes_field(&mut doc, 1, &self.body_bytes);
        put_bytes_field(&mut doc, 2, &self.auth_info_bytes);
        put_string_field(&mut doc, 3, &self.chain_id);
        put_varint_field(&mut doc, 4, self.account_number);
        doc
    }

    /// The 32-byte payload the MPC signs
    pub fn signing_payload(&self) -> [u8; 32] {
        Sha256::digest(self.sign_doc_bytes()).into()
    }

    /// Proto-encoded `TxRaw` carrying the raw 64-byte signature
    pub fn encode_tx_raw(&self, signature: &[u8; 64]) -> Vec<u8> {
        let mut raw = Vec::new();
        put_bytes_field(&mut raw, 1, &self.body_bytes);
        put_bytes_field(&mut raw, 2, &self.auth_info_bytes);
        put_bytes_field(&mut raw, 3, signature);
        raw
    }
}

/// One Cosmos SDK chain, resolved from the registry
#[derive(Debug, Clone)]
pub struct CosmosChain {
    params: &'static ChainParams,
}

impl CosmosChain {
    pub fn new(chain_id: &str) -> OmnisigResult<Self> {
        Ok(Self {
            params: registry::lookup(chain_id)?,
        })
    }

    pub fn params(&self) -> &ChainParams {
        self.params
    }

    /// Fee for `gas_limit` gas at the registry's gas price, rounded up
    pub fn compute_fee(&self, gas_limit: u64) -> Coin {
        Coin {
            denom: self.params.native_denom.to_string(),
            amount: fee_amount(self.params.gas_price, gas_limit).to_string(),
        }
    }

    /// On-chain account state for `address`
    pub async fn fetch_account(&self, address: &str) -> OmnisigResult<(u64, u64)> {
        let url = format!(
            "{}/cosmos/auth/v1beta1/accounts/{}",
            self.params.rest_url, address
        );
        let response = http::client().get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(OmnisigError::account_not_found(format!(
                "Account {} does not exist on {}",
                address, self.params.chain_id
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OmnisigError::provider_unreachable(format!(
                "Account query returned {}",
                status
            ))
            .with_details(body));
        }
        let document: Value = response
            .json()
            .await
            .map_err(|e| OmnisigError::protocol_invariant("Malformed account document").with_details(e.to_string()))?;
        parse_account_fields(&document).ok_or_else(|| {
            OmnisigError::account_not_found(format!(
                "Account document for {} carries no account_number",
                address
            ))
        })
    }

    /// Chain id reported by the live node, for config verification
    pub async fn node_chain_id(&self) -> OmnisigResult<String> {
        #[derive(Deserialize)]
        struct NodeInfoResponse {
            default_node_info: NodeInfo,
        }
        #[derive(Deserialize)]
        struct NodeInfo {
            network: String,
        }

        let url = format!(
            "{}/cosmos/base/tendermint/v1beta1/node_info",
            self.params.rest_url
        );
        let response: NodeInfoResponse = http::get_json(&url).await?;
        Ok(response.default_node_info.network)
    }

    /// Fail `ConfigInvalid` when the registry entry and the live node
    /// disagree about the chain id
    pub async fn verify_chain_id(&self) -> OmnisigResult<()> {
        let live = self.node_chain_id().await?;
        if live != self.params.chain_id {
            return Err(OmnisigError::config_invalid(format!(
                "Registry says {} but node reports {}",
                self.params.chain_id, live
            )));
        }
        Ok(())
    }
}

impl ChainAdapter for CosmosChain {
    type Request = CosmosTransactionRequest;
    type Unsigned = UnsignedCosmosTransaction;

    fn derive_address_and_pubkey(
        &self,
        root: &AffinePoint,
        caller_id: &str,
        path: &KeyDerivationPath,
    ) -> OmnisigResult<(String, [u8; 33])> {
        let child = derive::derive_child_pubkey(root, caller_id, &path.canonicalize())?;
        let address = derive::cosmos_bech32_address(&child, self.params.hrp)?;
        Ok((address, derive::compressed_bytes(&child)))
    }

    async fn prepare_payload(
        &self,
        request: CosmosTransactionRequest,
    ) -> OmnisigResult<(UnsignedCosmosTransaction, Vec<MpcPayload>)> {
        if request.messages.is_empty() {
            return Err(OmnisigError::config_invalid(
                "Transaction carries no messages",
            ));
        }
        let (account_number, sequence) = self.fetch_account(&request.address).await?;
        let messages = normalize_messages(request.messages, &request.address);

        let gas_limit = request.gas.unwrap_or(DEFAULT_GAS_LIMIT);
        let fee = self.compute_fee(gas_limit);

        let body_bytes = encode_tx_body(&messages, request.memo.as_deref().unwrap_or(""));
        let auth_info_bytes =
            encode_auth_info(&request.public_key, sequence, &fee, gas_limit);

        let unsigned = UnsignedCosmosTransaction {
            body_bytes,
            auth_info_bytes,
            chain_id: self.params.chain_id.to_string(),
            account_number,
        };
        log_debug!(
            "cosmos",
            "Assembled SIGN_MODE_DIRECT transaction",
            chain_id = unsigned.chain_id,
            sequence = sequence,
            gas = gas_limit,
            fee = fee.amount,
        );
        let payload = MpcPayload::new(0, unsigned.signing_payload());
        Ok((unsigned, vec![payload]))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: UnsignedCosmosTransaction,
        signatures: &[MpcSignature],
    ) -> OmnisigResult<BroadcastResult> {
        let [signature] = signatures else {
            return Err(OmnisigError::protocol_invariant(format!(
                "Cosmos transactions take exactly one signature, got {}",
                signatures.len()
            )));
        };
        let raw = unsigned.encode_tx_raw(&signature.raw_64()?);

        #[derive(Serialize)]
        struct BroadcastRequest {
            tx_bytes: String,
            mode: &'static str,
        }

        #[derive(Deserialize)]
        struct BroadcastResponse {
            tx_response: TxResponse,
        }

        #[derive(Deserialize)]
        struct TxResponse {
            code: u32,
            txhash: String,
            #[serde(default)]
            raw_log: String,
        }

        let url = format!("{}/cosmos/tx/v1beta1/txs", self.params.rest_url);
        let response: BroadcastResponse = http::post_json(
            &url,
            &BroadcastRequest {
                tx_bytes: BASE64.encode(&raw),
                mode: "BROADCAST_MODE_SYNC",
            },
        )
        .await?;

        if response.tx_response.code != 0 {
            return Err(OmnisigError::broadcast_rejected(
                response.tx_response.code,
                response.tx_response.raw_log,
            ));
        }
        Ok(BroadcastResult {
            family: ChainFamily::Cosmos,
            tx_hash: response.tx_response.txhash,
        })
    }

    async fn get_balance(&self, address: &str) -> OmnisigResult<u128> {
        #[derive(Deserialize)]
        struct BalancesResponse {
            #[serde(default)]
            balances: Vec<Coin>,
        }

        let url = format!(
            "{}/cosmos/bank/v1beta1/balances/{}",
            self.params.rest_url, address
        );
        let response: BalancesResponse = http::get_json(&url).await?;
        let amount = response
            .balances
            .iter()
            .find(|coin| coin.denom == self.params.native_denom)
            .map(|coin| coin.amount.as_str())
            .unwrap_or("0");
        amount.parse().map_err(|_| {
            OmnisigError::protocol_invariant(format!("Non-numeric balance '{}'", amount))
        })
    }
}

/// Rewrite an empty `from_address` on typed bank sends to the signer.
///
/// Deliberately narrow: raw `Any` messages and sender-like fields under
/// other names (`delegator_address`, `granter`, ...) pass through
/// untouched, including the typed [`MsgDelegate`].
pub fn normalize_messages(messages: Vec<CosmosMessage>, address: &str) -> Vec<CosmosMessage> {
    messages
        .into_iter()
        .map(|message| match message {
            CosmosMessage::Send(mut msg) if msg.from_address.is_empty() => {
                msg.from_address = address.to_string();
                CosmosMessage::Send(msg)
            }
            other => other,
        })
        .collect()
}

/// `ceil(gas_price * gas_limit)` in the chain's native denom
pub fn fee_amount(gas_price: f64, gas_limit: u64) -> u128 {
    (gas_price * gas_limit as f64).ceil() as u128
}

/// Pull `(account_number, sequence)` out of an auth account document,
/// descending through wrapper accounts (vesting, module) when needed.
fn parse_account_fields(document: &Value) -> Option<(u64, u64)> {
    fn extract(value: &Value) -> Option<(u64, u64)> {
        if let Some(number) = parse_u64_field(value.get("account_number")) {
            let sequence = parse_u64_field(value.get("sequence")).unwrap_or(0);
            return Some((number, sequence));
        }
        for wrapper in ["base_account", "base_vesting_account", "account"] {
            if let Some(inner) = value.get(wrapper) {
                if let Some(found) = extract(inner) {
                    return Some(found);
                }
            }
        }
        None
    }

    extract(document.get("account")?)
}

fn parse_u64_field(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

// Protobuf encoding. Field tags are `(field_number << 3) | wire_type`;
// everything here is wire type 2 (length-delimited) or 0 (varint).

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn put_varint_field(buf: &mut Vec<u8>, field: u8, value: u64) {
    if value == 0 {
        return; // proto3 default
    }
    buf.push(field << 3);
    put_varint(buf, value);
}

fn put_bytes_field(buf: &mut Vec<u8>, field: u8, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    buf.push((field << 3) | 2);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn put_string_field(buf: &mut Vec<u8>, field: u8, value: &str) {
    put_bytes_field(buf, field, value.as_bytes());
}

fn encode_coin(coin: &Coin) -> Vec<u8> {
    let mut out = Vec::new();
    put_string_field(&mut out, 1, &coin.denom);
    put_string_field(&mut out, 2, &coin.amount);
    out
}

fn encode_msg_send(msg: &MsgSend) -> Vec<u8> {
    let mut out = Vec::new();
    put_string_field(&mut out, 1, &msg.from_address);
    put_string_field(&mut out, 2, &msg.to_address);
    for coin in &msg.amount {
        put_bytes_field(&mut out, 3, &encode_coin(coin));
    }
    out
}

fn encode_msg_delegate(msg: &MsgDelegate) -> Vec<u8> {
    let mut out = Vec::new();
    put_string_field(&mut out, 1, &msg.delegator_address);
    put_string_field(&mut out, 2, &msg.validator_address);
    put_bytes_field(&mut out, 3, &encode_coin(&msg.amount));
    out
}

fn encode_any(type_url: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_string_field(&mut out, 1, type_url);
    put_bytes_field(&mut out, 2, value);
    out
}

fn encode_tx_body(messages: &[CosmosMessage], memo: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for message in messages {
        let any = encode_any(message.type_url(), &message.encode_value());
        put_bytes_field(&mut body, 1, &any);
    }
    put_string_field(&mut body, 2, memo);
    body
}

fn encode_auth_info(public_key: &[u8; 33], sequence: u64, fee: &Coin, gas_limit: u64) -> Vec<u8> {
    // PubKey { key: bytes }
    let mut pubkey_proto = Vec::new();
    put_bytes_field(&mut pubkey_proto, 1, public_key);
    let pubkey_any = encode_any(SECP256K1_PUBKEY_TYPE_URL, &pubkey_proto);

    // ModeInfo { single { mode: SIGN_MODE_DIRECT } }
    let mut single = Vec::new();
    put_varint_field(&mut single, 1, SIGN_MODE_DIRECT);
    let mut mode_info = Vec::new();
    put_bytes_field(&mut mode_info, 1, &single);

    // SignerInfo { public_key, mode_info, sequence }
    let mut signer_info = Vec::new();
    put_bytes_field(&mut signer_info, 1, &pubkey_any);
    put_bytes_field(&mut signer_info, 2, &mode_info);
    put_varint_field(&mut signer_info, 3, sequence);

    // Fee { amount, gas_limit }
    let mut fee_proto = Vec::new();
    put_bytes_field(&mut fee_proto, 1, &encode_coin(fee));
    put_varint_field(&mut fee_proto, 2, gas_limit);

    let mut auth_info = Vec::new();
    put_bytes_field(&mut auth_info, 1, &signer_info);
    put_bytes_field(&mut auth_info, 2, &fee_proto);
    auth_info
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> CosmosTransactionRequest {
        CosmosTransactionRequest {
            address: "cosmos1signer".to_string(),
            public_key: [0x02; 33],
            messages: vec![CosmosMessage::Send(MsgSend {
                from_address: String::new(),
                to_address: "cosmos1recipient".to_string(),
                amount: vec![Coin {
                    denom: "uatom".to_string(),
                    amount: "1000000".to_string(),
                }],
            })],
            memo: Some("ping".to_string()),
            gas: None,
        }
    }

    #[test]
    fn test_fee_computation() {
        // cosmoshub-4 at 0.025 uatom/gas, 200k gas => 5000 uatom
        let chain = CosmosChain::new("cosmoshub-4").unwrap();
        let fee = chain.compute_fee(DEFAULT_GAS_LIMIT);
        assert_eq!(fee.denom, "uatom");
        assert_eq!(fee.amount, "5000");

        // Rounds up
        assert_eq!(fee_amount(0.025, 100_001), 2501);
    }

    #[test]
    fn test_unknown_chain_rejected() {
        assert!(CosmosChain::new("unknown-1").is_err());
    }

    #[test]
    fn test_varint_encoding() {
        let mut buf = Vec::new();
        put_varint(&mut buf, 0);
        assert_eq!(buf, vec![0]);

        buf.clear();
        put_varint(&mut buf, 127);
        assert_eq!(buf, vec![127]);

        buf.clear();
        put_varint(&mut buf, 128);
        assert_eq!(buf, vec![0x80, 0x01]);

        buf.clear();
        put_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xac, 0x02]);
    }

    #[test]
    fn test_msg_send_layout() {
        let msg = MsgSend {
            from_address: "a".to_string(),
            to_address: "b".to_string(),
            amount: vec![Coin {
                denom: "uatom".to_string(),
                amount: "5".to_string(),
            }],
        };
        let encoded = encode_msg_send(&msg);
        // field 1 (from), field 2 (to), field 3 (coin)
        assert_eq!(encoded[0], 0x0a);
        assert_eq!(encoded[1], 1);
        assert_eq!(encoded[2], b'a');
        assert_eq!(encoded[3], 0x12);
        assert_eq!(encoded[5], b'b');
        assert_eq!(encoded[6], 0x1a);
    }

    #[test]
    fn test_normalization_is_narrow() {
        let messages = vec![
            CosmosMessage::Send(MsgSend {
                from_address: String::new(),
                to_address: "cosmos1x".to_string(),
                amount: vec![],
            }),
            CosmosMessage::Send(MsgSend {
                from_address: "cosmos1other".to_string(),
                to_address: "cosmos1y".to_string(),
                amount: vec![],
            }),
            CosmosMessage::Delegate(MsgDelegate {
                delegator_address: String::new(),
                validator_address: "cosmosvaloper1z".to_string(),
                amount: Coin {
                    denom: "uatom".to_string(),
                    amount: "1".to_string(),
                },
            }),
            CosmosMessage::Raw {
                type_url: "/cosmos.authz.v1beta1.MsgGrant".to_string(),
                value: vec![0x0a, 0x00],
            },
        ];
        let normalized = normalize_messages(messages, "cosmos1signer");

        match &normalized[0] {
            CosmosMessage::Send(msg) => assert_eq!(msg.from_address, "cosmos1signer"),
            _ => panic!("expected send"),
        }
        match &normalized[1] {
            CosmosMessage::Send(msg) => assert_eq!(msg.from_address, "cosmos1other"),
            _ => panic!("expected send"),
        }
        // Only from_address is rewritten; an empty delegator_address
        // stays empty
        match &normalized[2] {
            CosmosMessage::Delegate(msg) => assert!(msg.delegator_address.is_empty()),
            _ => panic!("expected delegate"),
        }
        // Raw messages are exempt even if their body names a sender
        assert!(matches!(&normalized[3], CosmosMessage::Raw { .. }));
    }

    #[test]
    fn test_msg_delegate_encoding() {
        let msg = MsgDelegate {
            delegator_address: "cosmos1d".to_string(),
            validator_address: "cosmosvaloper1v".to_string(),
            amount: Coin {
                denom: "uatom".to_string(),
                amount: "500".to_string(),
            },
        };
        let message = CosmosMessage::Delegate(msg.clone());
        assert_eq!(message.type_url(), "/cosmos.staking.v1beta1.MsgDelegate");

        let encoded = encode_msg_delegate(&msg);
        assert_eq!(encoded[0], 0x0a);
        assert_eq!(encoded[1] as usize, msg.delegator_address.len());
        // validator field follows, then the coin
        let validator_offset = 2 + msg.delegator_address.len();
        assert_eq!(encoded[validator_offset], 0x12);
    }

    #[test]
    fn test_sign_doc_is_deterministic() {
        let unsigned = UnsignedCosmosTransaction {
            body_bytes: vec![1, 2, 3],
            auth_info_bytes: vec![4, 5],
            chain_id: "cosmoshub-4".to_string(),
            account_number: 12345,
        };
        assert_eq!(unsigned.signing_payload(), unsigned.signing_payload());

        let doc = unsigned.sign_doc_bytes();
        // body_bytes field
        assert_eq!(&doc[..5], &[0x0a, 3, 1, 2, 3]);
        // auth_info field
        assert_eq!(&doc[5..9], &[0x12, 2, 4, 5]);
        // chain_id field
        assert_eq!(doc[9], 0x1a);
    }

    #[test]
    fn test_tx_raw_carries_signature() {
        let unsigned = UnsignedCosmosTransaction {
            body_bytes: vec![1],
            auth_info_bytes: vec![2],
            chain_id: "x".to_string(),
            account_number: 1,
        };
        let raw = unsigned.encode_tx_raw(&[0xee; 64]);
        // signatures field tag with 64-byte payload at the tail
        let tail = &raw[raw.len() - 66..];
        assert_eq!(tail[0], 0x1a);
        assert_eq!(tail[1], 64);
        assert!(tail[2..].iter().all(|b| *b == 0xee));
    }

    #[test]
    fn test_auth_info_embeds_pubkey_and_sequence() {
        let fee = Coin {
            denom: "uatom".to_string(),
            amount: "5000".to_string(),
        };
        let auth = encode_auth_info(&[0x03; 33], 42, &fee, 200_000);
        let rendered = hex::encode(&auth);
        // Compressed key appears verbatim
        assert!(rendered.contains(&"03".repeat(33)));
        // Type URL appears verbatim
        assert!(rendered.contains(&hex::encode(SECP256K1_PUBKEY_TYPE_URL)));
    }

    #[test]
    fn test_account_document_parsing() {
        let plain = json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "cosmos1x",
                "account_number": "8",
                "sequence": "2"
            }
        });
        assert_eq!(parse_account_fields(&plain), Some((8, 2)));

        let nested = json!({
            "account": {
                "@type": "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
                "base_vesting_account": {
                    "base_account": {"account_number": "77", "sequence": "0"}
                }
            }
        });
        assert_eq!(parse_account_fields(&nested), Some((77, 0)));

        let missing = json!({"account": {"@type": "/x.Weird"}});
        assert_eq!(parse_account_fields(&missing), None);
    }

    #[tokio::test]
    async fn test_prepare_requires_messages() {
        let chain = CosmosChain::new("cosmoshub-4").unwrap();
        let mut request = sample_request();
        request.messages.clear();
        let err = chain.prepare_payload(request).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigInvalid);
    }
}
