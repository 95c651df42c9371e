//! Coordinator-chain transaction and delegate envelopes
//!
//! Borsh wire forms for the direct change-call path and the NEP-366
//! signed-delegate path, plus the JSON shape relayers accept. Only the
//! action kinds this crate emits are modeled; their enum tags match the
//! chain's full action set.

use crate::error::{OmnisigError, OmnisigResult};
use crate::near::signer::{format_public_key, CoordinatorSigner};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use borsh::{io, BorshSerialize};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// NEP-461 message discriminant for delegate actions (`2^30 + 366`)
const DELEGATE_ACTION_DISCRIMINANT: u32 = (1 << 30) + 366;

/// Enum tag of `FunctionCall` in the chain's action set
const TAG_FUNCTION_CALL: u8 = 2;
/// Enum tag of `Delegate` in the chain's action set
const TAG_DELEGATE: u8 = 8;

/// ed25519 public key in chain wire form (key-type byte 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl BorshSerialize for Ed25519PublicKey {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&0u8, writer)?;
        writer.write_all(&self.0)
    }
}

/// ed25519 signature in chain wire form (key-type byte 0)
#[derive(Debug, Clone, Copy)]
pub struct Ed25519Signature(pub [u8; 64]);

impl BorshSerialize for Ed25519Signature {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&0u8, writer)?;
        writer.write_all(&self.0)
    }
}

/// Contract method invocation with attached gas and deposit
#[derive(Debug, Clone, BorshSerialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

/// Actions this crate submits directly
#[derive(Debug, Clone)]
pub enum Action {
    FunctionCall(FunctionCallAction),
    Delegate(SignedDelegateAction),
}

impl BorshSerialize for Action {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Action::FunctionCall(call) => {
                BorshSerialize::serialize(&TAG_FUNCTION_CALL, writer)?;
                call.serialize(writer)
            }
            Action::Delegate(signed) => {
                BorshSerialize::serialize(&TAG_DELEGATE, writer)?;
                signed.serialize(writer)
            }
        }
    }
}

/// Action nested inside a delegate (delegates cannot nest)
#[derive(Debug, Clone)]
pub struct NonDelegateAction(pub FunctionCallAction);

impl BorshSerialize for NonDelegateAction {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&TAG_FUNCTION_CALL, writer)?;
        self.0.serialize(writer)
    }
}

/// Unsigned coordinator-chain transaction
#[derive(Debug, Clone, BorshSerialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: Ed25519PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

impl Transaction {
    /// The digest the account key signs; its base58 form is also the
    /// transaction hash providers index by.
    pub fn signing_digest(&self) -> OmnisigResult<[u8; 32]> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| OmnisigError::protocol_invariant(format!("Borsh encoding failed: {}", e)))?;
        Ok(Sha256::digest(&bytes).into())
    }
}

/// Transaction plus account-key signature, ready to broadcast
#[derive(Debug, Clone, BorshSerialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Ed25519Signature,
}

impl SignedTransaction {
    pub fn to_base64(&self) -> OmnisigResult<String> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| OmnisigError::protocol_invariant(format!("Borsh encoding failed: {}", e)))?;
        Ok(BASE64.encode(bytes))
    }
}

/// NEP-366 delegate action: the relayer wraps this in its own
/// transaction and pays the gas.
#[derive(Debug, Clone, BorshSerialize)]
pub struct DelegateAction {
    pub sender_id: String,
    pub receiver_id: String,
    pub actions: Vec<NonDelegateAction>,
    pub nonce: u64,
    pub max_block_height: u64,
    pub public_key: Ed25519PublicKey,
}

impl DelegateAction {
    /// NEP-461 signing digest: the discriminant-prefixed borsh form
    pub fn signing_digest(&self) -> OmnisigResult<[u8; 32]> {
        let mut bytes = Vec::new();
        BorshSerialize::serialize(&DELEGATE_ACTION_DISCRIMINANT, &mut bytes)
            .and_then(|_| self.serialize(&mut bytes))
            .map_err(|e| OmnisigError::protocol_invariant(format!("Borsh encoding failed: {}", e)))?;
        Ok(Sha256::digest(&bytes).into())
    }
}

#[derive(Debug, Clone, BorshSerialize)]
pub struct SignedDelegateAction {
    pub delegate_action: DelegateAction,
    pub signature: Ed25519Signature,
}

/// Build and sign a single-function-call transaction
pub fn build_function_call_tx(
    signer: &dyn CoordinatorSigner,
    receiver_id: &str,
    nonce: u64,
    block_hash: [u8; 32],
    method_name: &str,
    args: Vec<u8>,
    gas: u64,
    deposit: u128,
) -> OmnisigResult<(SignedTransaction, String)> {
    let transaction = Transaction {
        signer_id: signer.account_id().to_string(),
        public_key: Ed25519PublicKey(signer.public_key()),
        nonce,
        receiver_id: receiver_id.to_string(),
        block_hash,
        actions: vec![Action::FunctionCall(FunctionCallAction {
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
        })],
    };
    let digest = transaction.signing_digest()?;
    let tx_hash = bs58::encode(digest).into_string();
    let signature = Ed25519Signature(signer.sign(&digest));
    Ok((SignedTransaction { transaction, signature }, tx_hash))
}

/// Build and sign a single-function-call delegate envelope
pub fn build_signed_delegate(
    signer: &dyn CoordinatorSigner,
    receiver_id: &str,
    nonce: u64,
    max_block_height: u64,
    method_name: &str,
    args: Vec<u8>,
    gas: u64,
    deposit: u128,
) -> OmnisigResult<SignedDelegateAction> {
    let delegate_action = DelegateAction {
        sender_id: signer.account_id().to_string(),
        receiver_id: receiver_id.to_string(),
        actions: vec![NonDelegateAction(FunctionCallAction {
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
        })],
        nonce,
        max_block_height,
        public_key: Ed25519PublicKey(signer.public_key()),
    };
    let digest = delegate_action.signing_digest()?;
    let signature = Ed25519Signature(signer.sign(&digest));
    Ok(SignedDelegateAction {
        delegate_action,
        signature,
    })
}

// JSON wire shape relayers accept at /send_meta_tx_async

#[derive(Serialize)]
struct SignedDelegateWire {
    delegate_action: DelegateActionWire,
    signature: String,
}

#[derive(Serialize)]
struct DelegateActionWire {
    actions: Vec<ActionWire>,
    nonce: u64,
    max_block_height: u64,
    public_key: String,
    receiver_id: String,
    sender_id: String,
}

#[derive(Serialize)]
enum ActionWire {
    FunctionCall {
        method_name: String,
        args: String,
        gas: u64,
        deposit: String,
    },
}

/// Render a signed delegate as relayer JSON
pub fn signed_delegate_to_json(signed: &SignedDelegateAction) -> serde_json::Value {
    let action = &signed.delegate_action;
    let wire = SignedDelegateWire {
        delegate_action: DelegateActionWire {
            actions: action
                .actions
                .iter()
                .map(|NonDelegateAction(call)| ActionWire::FunctionCall {
                    method_name: call.method_name.clone(),
                    args: BASE64.encode(&call.args),
                    gas: call.gas,
                    deposit: call.deposit.to_string(),
                })
                .collect(),
            nonce: action.nonce,
            max_block_height: action.max_block_height,
            public_key: format_public_key(&action.public_key.0),
            receiver_id: action.receiver_id.clone(),
            sender_id: action.sender_id.clone(),
        },
        signature: format!("ed25519:{}", bs58::encode(signed.signature.0).into_string()),
    };
    serde_json::to_value(wire).expect("wire shape is serializable")
}
