//! Bitcoin transaction assembler
//!
//! P2WPKH only: witness v0, bech32 addresses, BIP-143 sighashes. The
//! assembler selects UTXOs, builds a PSBT with `witness_utxo` proofs,
//! computes one sighash per input directly from the PSBT fields, and
//! finalizes witnesses from MPC signatures. Mixed script types are
//! rejected.
//!
//! The provider is a mempool.space-compatible REST API.

use crate::chains::ChainAdapter;
use crate::derive;
use crate::error::{OmnisigError, OmnisigResult};
use crate::log_debug;
use crate::mpc::signature::MpcSignature;
use crate::path::KeyDerivationPath;
use crate::types::{BroadcastResult, ChainFamily, MpcPayload};
use crate::utils::{amount, http};
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, CompressedPublicKey, Network, OutPoint, Psbt, ScriptBuf, Sequence,
    Transaction, TxIn, TxOut, Txid, Witness,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outputs below this are treated as dust and folded into the fee
const DUST_LIMIT_SATS: u64 = 546;

/// Default confirmation target for the fee recommendation
const DEFAULT_CONFIRMATION_TARGET: u16 = 6;

/// Approximate vbyte cost of a P2WPKH input
const INPUT_VBYTES: u64 = 68;
/// Approximate vbyte cost of a P2WPKH output
const OUTPUT_VBYTES: u64 = 31;
/// Fixed transaction overhead in vbytes
const OVERHEAD_VBYTES: u64 = 11;

/// One Bitcoin provider endpoint
#[derive(Debug, Clone)]
pub struct BitcoinChain {
    provider_url: String,
    network: Network,
}

/// UTXO as the provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub status: UtxoStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u32>,
}

/// An outpoint the caller (or the selector) committed to spending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// Destination output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value_sats: u64,
}

/// Fee recommendation in sat/vB keyed by urgency
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecommendation {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

impl FeeRecommendation {
    /// Map a confirmation target (blocks) onto a rate
    pub fn rate_for_target(&self, target: u16) -> u64 {
        let rate = match target {
            0..=1 => self.fastest_fee,
            2..=3 => self.half_hour_fee,
            4..=6 => self.hour_fee,
            _ => self.economy_fee,
        };
        rate.max(self.minimum_fee)
    }
}

/// Caller-facing request: the sender plus either a plain transfer (the
/// assembler selects coins) or a fully specified input/output set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtcTransactionRequest {
    pub from_address: String,
    #[serde(with = "crate::utils::serde_hex::hex33")]
    pub compressed_pubkey: [u8; 33],
    pub funding: BtcFunding,
}

/// Coin-control mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BtcFunding {
    /// Assembler fetches UTXOs and runs coin selection
    Auto {
        to_address: String,
        /// Value in satoshis, as a string
        value: String,
        confirmation_target: Option<u16>,
    },
    /// Caller supplies the exact inputs and outputs
    Manual {
        inputs: Vec<SelectedUtxo>,
        outputs: Vec<TxOutput>,
    },
}

/// PSBT with witness proofs attached, awaiting per-input signatures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsignedBitcoinTransaction {
    pub psbt: Psbt,
    #[serde(with = "crate::utils::serde_hex::hex33")]
    pub compressed_pubkey: [u8; 33],
}

impl BitcoinChain {
    pub fn new(provider_url: impl Into<String>, network: derive::BitcoinNetwork) -> Self {
        Self {
            provider_url: provider_url.into(),
            network: match network {
                derive::BitcoinNetwork::Mainnet => Network::Bitcoin,
                derive::BitcoinNetwork::Testnet => Network::Testnet,
                derive::BitcoinNetwork::Regtest => Network::Regtest,
            },
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn derive_network(&self) -> derive::BitcoinNetwork {
        match self.network {
            Network::Bitcoin => derive::BitcoinNetwork::Mainnet,
            Network::Regtest => derive::BitcoinNetwork::Regtest,
            _ => derive::BitcoinNetwork::Testnet,
        }
    }

    /// Unspent outputs of `address`
    pub async fn fetch_utxos(&self, address: &str) -> OmnisigResult<Vec<Utxo>> {
        let url = format!("{}/address/{}/utxo", self.provider_url, address);
        http::get_json(&url).await
    }

    /// Current fee recommendation
    pub async fn fetch_fee_recommendation(&self) -> OmnisigResult<FeeRecommendation> {
        let url = format!("{}/v1/fees/recommended", self.provider_url);
        http::get_json(&url).await
    }

    /// The exact previous output `txid:vout`, for the witness proof
    async fn fetch_prevout(&self, txid: &str, vout: u32) -> OmnisigResult<TxOut> {
        #[derive(Deserialize)]
        struct TxInfo {
            vout: Vec<VoutInfo>,
        }
        #[derive(Deserialize)]
        struct VoutInfo {
            scriptpubkey: String,
            value: u64,
        }

        let url = format!("{}/tx/{}", self.provider_url, txid);
        let info: TxInfo = http::get_json(&url).await?;
        let prevout = info.vout.get(vout as usize).ok_or_else(|| {
            OmnisigError::protocol_invariant(format!("{} has no output {}", txid, vout))
        })?;
        let script_pubkey = ScriptBuf::from_hex(&prevout.scriptpubkey).map_err(|e| {
            OmnisigError::protocol_invariant(format!("Provider returned bad script: {}", e))
        })?;
        Ok(TxOut {
            value: Amount::from_sat(prevout.value),
            script_pubkey,
        })
    }

    async fn broadcast_raw(&self, raw_hex: String) -> OmnisigResult<String> {
        let url = format!("{}/tx", self.provider_url);
        let (status, body) = http::post_text(&url, raw_hex).await?;
        if !status.is_success() {
            return Err(OmnisigError::broadcast_rejected(status.as_u16() as u32, body));
        }
        Ok(body.trim().to_string())
    }

    /// Resolve `(inputs, outputs, fee)` for an Auto request
    async fn auto_select(
        &self,
        from_address: &str,
        to_address: &str,
        value: &str,
        confirmation_target: Option<u16>,
    ) -> OmnisigResult<(Vec<SelectedUtxo>, Vec<TxOutput>, u64)> {
        let value_sats = parse_satoshis(value)?;
        let utxos = self.fetch_utxos(from_address).await?;
        if utxos.is_empty() {
            return Err(OmnisigError::account_not_found(format!(
                "No UTXOs for {}",
                from_address
            )));
        }
        let recommendation = self.fetch_fee_recommendation().await?;
        let fee_rate =
            recommendation.rate_for_target(confirmation_target.unwrap_or(DEFAULT_CONFIRMATION_TARGET));
        select_coins(&utxos, value_sats, fee_rate, from_address, to_address)
    }
}

impl ChainAdapter for BitcoinChain {
    type Request = BtcTransactionRequest;
    type Unsigned = UnsignedBitcoinTransaction;

    fn derive_address_and_pubkey(
        &self,
        root: &k256::AffinePoint,
        caller_id: &str,
        path: &KeyDerivationPath,
    ) -> OmnisigResult<(String, [u8; 33])> {
        let child = derive::derive_child_pubkey(root, caller_id, &path.canonicalize())?;
        let address = derive::bitcoin_p2wpkh_address(&child, self.derive_network())?;
        Ok((address, derive::compressed_bytes(&child)))
    }

    async fn prepare_payload(
        &self,
        request: BtcTransactionRequest,
    ) -> OmnisigResult<(UnsignedBitcoinTransaction, Vec<MpcPayload>)> {
        let sender_pubkey = parse_compressed_pubkey(&request.compressed_pubkey)?;
        let sender_script = ScriptBuf::new_p2wpkh(&sender_pubkey.wpubkey_hash());
        let sender_address = Address::p2wpkh(&sender_pubkey, self.network);
        if sender_address.to_string() != request.from_address {
            return Err(OmnisigError::config_invalid(format!(
                "Public key derives {}, request says {}",
                sender_address, request.from_address
            )));
        }

        let (inputs, outputs, fee) = match &request.funding {
            BtcFunding::Manual { inputs, outputs } => {
                let in_total: u64 = inputs.iter().map(|i| i.value).sum();
                let out_total: u64 = outputs.iter().map(|o| o.value_sats).sum();
                let fee = in_total.checked_sub(out_total).ok_or_else(|| {
                    OmnisigError::insufficient_funds(format!(
                        "Outputs ({} sats) exceed inputs ({} sats)",
                        out_total, in_total
                    ))
                })?;
                (inputs.clone(), outputs.clone(), fee)
            }
            BtcFunding::Auto {
                to_address,
                value,
                confirmation_target,
            } => {
                self.auto_select(&request.from_address, to_address, value, *confirmation_target)
                    .await?
            }
        };

        let unsigned_tx = build_unsigned_tx(&inputs, &outputs, self.network)?;
        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)
            .map_err(|e| OmnisigError::protocol_invariant(format!("PSBT assembly failed: {}", e)))?;

        // Attach the exact funding outputs as witness proofs
        for (index, input) in inputs.iter().enumerate() {
            let prevout = self.fetch_prevout(&input.txid, input.vout).await?;
            if prevout.value.to_sat() != input.value {
                return Err(OmnisigError::protocol_invariant(format!(
                    "Provider reports {} sats for {}:{}, request says {}",
                    prevout.value.to_sat(),
                    input.txid,
                    input.vout,
                    input.value
                )));
            }
            psbt.inputs[index].witness_utxo = Some(prevout);
        }

        let payloads = extract_payloads(&psbt, &sender_script)?;
        log_debug!(
            "bitcoin",
            "Assembled P2WPKH transaction",
            inputs = inputs.len(),
            outputs = outputs.len(),
            fee_btc = amount::format_units(fee as u128, amount::BTC_DECIMALS),
        );
        Ok((
            UnsignedBitcoinTransaction {
                psbt,
                compressed_pubkey: request.compressed_pubkey,
            },
            payloads,
        ))
    }

    async fn attach_signatures_and_broadcast(
        &self,
        unsigned: UnsignedBitcoinTransaction,
        signatures: &[MpcSignature],
    ) -> OmnisigResult<BroadcastResult> {
        let tx = finalize_transaction(unsigned, signatures)?;
        let raw_hex = encode::serialize_hex(&tx);
        let txid = self.broadcast_raw(raw_hex).await?;
        Ok(BroadcastResult {
            family: ChainFamily::Bitcoin,
            tx_hash: txid,
        })
    }

    async fn get_balance(&self, address: &str) -> OmnisigResult<u128> {
        let utxos = self.fetch_utxos(address).await?;
        Ok(utxos.iter().map(|u| u.value as u128).sum())
    }
}

/// Parse a satoshi amount string (1 BTC = 100_000_000 sats)
pub fn parse_satoshis(value: &str) -> OmnisigResult<u64> {
    let trimmed = value.trim();
    trimmed.parse().map_err(|_| {
        OmnisigError::config_invalid(format!("Value is not a satoshi amount: '{}'", value))
    })
}

/// Largest-first accumulation with a change output back to the sender.
///
/// Change below the dust limit is folded into the fee; the dust policy
/// itself lives here, not with callers.
pub fn select_coins(
    utxos: &[Utxo],
    value_sats: u64,
    fee_rate: u64,
    change_address: &str,
    to_address: &str,
) -> OmnisigResult<(Vec<SelectedUtxo>, Vec<TxOutput>, u64)> {
    let estimate_fee = |input_count: u64, output_count: u64| {
        (OVERHEAD_VBYTES + input_count * INPUT_VBYTES + output_count * OUTPUT_VBYTES) * fee_rate
    };

    let mut candidates: Vec<&Utxo> = utxos.iter().collect();
    candidates.sort_by(|a, b| b.value.cmp(&a.value));

    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for utxo in candidates {
        if total >= value_sats + estimate_fee(selected.len() as u64, 2) {
            break;
        }
        total += utxo.value;
        selected.push(SelectedUtxo {
            txid: utxo.txid.clone(),
            vout: utxo.vout,
            value: utxo.value,
        });
    }

    let fee_two_outputs = estimate_fee(selected.len() as u64, 2);
    let needed = value_sats
        .checked_add(fee_two_outputs)
        .ok_or_else(|| OmnisigError::insufficient_funds("Value overflows"))?;
    if total < needed {
        // A change-less round might still fit
        let fee_one_output = estimate_fee(selected.len() as u64, 1);
        if total < value_sats + fee_one_output {
            return Err(OmnisigError::insufficient_funds(format!(
                "Need {} sats, have {} sats",
                value_sats + fee_one_output,
                total
            )));
        }
        let fee = total - value_sats;
        let outputs = vec![TxOutput {
            address: to_address.to_string(),
            value_sats,
        }];
        return Ok((selected, outputs, fee));
    }

    let change = total - value_sats - fee_two_outputs;
    let mut outputs = vec![TxOutput {
        address: to_address.to_string(),
        value_sats,
    }];
    let fee = if change > DUST_LIMIT_SATS {
        outputs.push(TxOutput {
            address: change_address.to_string(),
            value_sats: change,
        });
        fee_two_outputs
    } else {
        fee_two_outputs + change
    };
    Ok((selected, outputs, fee))
}

fn build_unsigned_tx(
    inputs: &[SelectedUtxo],
    outputs: &[TxOutput],
    network: Network,
) -> OmnisigResult<Transaction> {
    let mut tx_inputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let txid = Txid::from_str(&input.txid)
            .map_err(|e| OmnisigError::config_invalid(format!("Bad txid {}: {}", input.txid, e)))?;
        tx_inputs.push(TxIn {
            previous_output: OutPoint::new(txid, input.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
    }

    let mut tx_outputs = Vec::with_capacity(outputs.len());
    for output in outputs {
        let address = Address::from_str(&output.address)
            .map_err(|e| OmnisigError::config_invalid(format!("Bad address: {}", e)))?
            .require_network(network)
            .map_err(|e| OmnisigError::config_invalid(format!("Address network mismatch: {}", e)))?;
        tx_outputs.push(TxOut {
            value: Amount::from_sat(output.value_sats),
            script_pubkey: address.script_pubkey(),
        });
    }

    Ok(Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_inputs,
        output: tx_outputs,
    })
}

/// BIP-143 sighash per input, straight from the PSBT fields.
///
/// Every input must be a P2WPKH spend of `expected_script`; anything
/// else is a mixed-input transaction and is rejected.
pub fn extract_payloads(psbt: &Psbt, expected_script: &ScriptBuf) -> OmnisigResult<Vec<MpcPayload>> {
    let mut cache = SighashCache::new(&psbt.unsigned_tx);
    let mut payloads = Vec::with_capacity(psbt.inputs.len());
    for (index, input) in psbt.inputs.iter().enumerate() {
        let witness_utxo = input.witness_utxo.as_ref().ok_or_else(|| {
            OmnisigError::protocol_invariant(format!("Input {} is missing witness_utxo", index))
        })?;
        if !witness_utxo.script_pubkey.is_p2wpkh()
            || witness_utxo.script_pubkey != *expected_script
        {
            return Err(OmnisigError::config_invalid(format!(
                "Input {} is not a P2WPKH spend of the sender key",
                index
            )));
        }
        let sighash = cache.p2wpkh_signature_hash(
            index,
            &witness_utxo.script_pubkey,
            witness_utxo.value,
            EcdsaSighashType::All,
        )?;
        payloads.push(MpcPayload::new(index as u32, sighash.to_byte_array()));
    }
    Ok(payloads)
}

/// Attach one witness per input and extract the broadcastable
/// transaction. `signatures[i]` belongs to input `i`: reassembly is by
/// ascending input index regardless of signing order.
pub fn finalize_transaction(
    unsigned: UnsignedBitcoinTransaction,
    signatures: &[MpcSignature],
) -> OmnisigResult<Transaction> {
    let mut psbt = unsigned.psbt;
    if signatures.len() != psbt.inputs.len() {
        return Err(OmnisigError::protocol_invariant(format!(
            "{} inputs but {} signatures",
            psbt.inputs.len(),
            signatures.len()
        )));
    }
    for (index, signature) in signatures.iter().enumerate() {
        let mut der = signature.to_der_low_s()?;
        der.push(EcdsaSighashType::All as u8);
        let mut witness = Witness::new();
        witness.push(&der);
        witness.push(unsigned.compressed_pubkey);
        psbt.inputs[index].final_script_witness = Some(witness);
    }
    psbt.extract_tx()
        .map_err(|e| OmnisigError::protocol_invariant(format!("PSBT extraction failed: {:?}", e)))
}

fn parse_compressed_pubkey(bytes: &[u8; 33]) -> OmnisigResult<CompressedPublicKey> {
    let key = bitcoin::PublicKey::from_slice(bytes)
        .map_err(|e| OmnisigError::config_invalid(format!("Invalid public key: {}", e)))?;
    CompressedPublicKey::try_from(key)
        .map_err(|_| OmnisigError::config_invalid("Public key is not in compressed form"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_utxos() -> Vec<Utxo> {
        [(50_000u64, 0u32), (120_000, 1), (8_000, 2)]
            .iter()
            .map(|(value, vout)| Utxo {
                txid: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
                    .to_string(),
                vout: *vout,
                value: *value,
                status: UtxoStatus {
                    confirmed: true,
                    block_height: Some(800_000),
                },
            })
            .collect()
    }

    const SENDER: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const RECIPIENT: &str = "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3";

    #[test]
    fn test_fee_recommendation_mapping() {
        let fees = FeeRecommendation {
            fastest_fee: 40,
            half_hour_fee: 25,
            hour_fee: 12,
            economy_fee: 6,
            minimum_fee: 3,
        };
        assert_eq!(fees.rate_for_target(1), 40);
        assert_eq!(fees.rate_for_target(3), 25);
        assert_eq!(fees.rate_for_target(6), 12);
        assert_eq!(fees.rate_for_target(144), 6);
    }

    #[test]
    fn test_fee_floor_applies() {
        let fees = FeeRecommendation {
            fastest_fee: 5,
            half_hour_fee: 2,
            hour_fee: 1,
            economy_fee: 1,
            minimum_fee: 4,
        };
        assert_eq!(fees.rate_for_target(6), 4);
    }

    #[test]
    fn test_parse_satoshis() {
        assert_eq!(parse_satoshis("150000").unwrap(), 150_000);
        assert_eq!(parse_satoshis(" 21 ").unwrap(), 21);
        assert!(parse_satoshis("0.5").is_err());
        assert!(parse_satoshis("1 BTC").is_err());
    }

    #[test]
    fn test_selection_prefers_large_coins() {
        let (inputs, outputs, fee) =
            select_coins(&sample_utxos(), 100_000, 2, SENDER, RECIPIENT).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].value, 120_000);
        // Recipient + change
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].value_sats, 100_000);
        assert_eq!(outputs[1].address, SENDER);
        assert_eq!(outputs[1].value_sats, 120_000 - 100_000 - fee);
    }

    #[test]
    fn test_dust_change_folds_into_fee() {
        // 120k input, 119.5k value: change would be far below dust
        let (_, outputs, fee) =
            select_coins(&sample_utxos(), 119_500, 1, SENDER, RECIPIENT).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(fee, 120_000 - 119_500);
    }

    #[test]
    fn test_selection_insufficient_funds() {
        let err = select_coins(&sample_utxos(), 500_000, 2, SENDER, RECIPIENT).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InsufficientFunds);
    }

    fn sample_pubkey() -> CompressedPublicKey {
        // Compressed generator point: the key behind the BIP-173
        // example address
        let bytes: [u8; 33] =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap()
                .try_into()
                .unwrap();
        parse_compressed_pubkey(&bytes).unwrap()
    }

    fn sample_psbt(input_values: &[u64]) -> Psbt {
        let pubkey = sample_pubkey();
        let script = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
        let inputs: Vec<SelectedUtxo> = input_values
            .iter()
            .enumerate()
            .map(|(i, value)| SelectedUtxo {
                txid: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
                    .to_string(),
                vout: i as u32,
                value: *value,
            })
            .collect();
        let outputs = vec![TxOutput {
            address: RECIPIENT.to_string(),
            value_sats: input_values.iter().sum::<u64>() - 1_000,
        }];
        let tx = build_unsigned_tx(&inputs, &outputs, Network::Bitcoin).unwrap();
        let mut psbt = Psbt::from_unsigned_tx(tx).unwrap();
        for (i, value) in input_values.iter().enumerate() {
            psbt.inputs[i].witness_utxo = Some(TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: script.clone(),
            });
        }
        psbt
    }

    #[test]
    fn test_payload_per_input_ascending() {
        let pubkey = sample_pubkey();
        let script = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
        let psbt = sample_psbt(&[40_000, 30_000, 20_000]);

        let payloads = extract_payloads(&psbt, &script).unwrap();
        assert_eq!(payloads.len(), 3);
        for (i, payload) in payloads.iter().enumerate() {
            assert_eq!(payload.index, i as u32);
        }
        // Inputs differ, so sighashes differ
        assert_ne!(payloads[0].payload, payloads[1].payload);

        // Deterministic
        let again = extract_payloads(&psbt, &script).unwrap();
        assert_eq!(payloads, again);
    }

    #[test]
    fn test_foreign_script_rejected() {
        let pubkey = sample_pubkey();
        let script = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
        let mut psbt = sample_psbt(&[40_000]);
        // Replace the witness proof with someone else's P2WPKH script
        let other = ScriptBuf::from_hex("0014aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        psbt.inputs[0].witness_utxo = Some(TxOut {
            value: Amount::from_sat(40_000),
            script_pubkey: other,
        });

        let err = extract_payloads(&psbt, &script).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_missing_witness_utxo_rejected() {
        let pubkey = sample_pubkey();
        let script = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
        let mut psbt = sample_psbt(&[40_000]);
        psbt.inputs[0].witness_utxo = None;

        let err = extract_payloads(&psbt, &script).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ProtocolInvariantViolated);
    }

    #[test]
    fn test_signature_count_must_match_inputs() {
        let psbt = sample_psbt(&[40_000, 30_000]);
        let unsigned = UnsignedBitcoinTransaction {
            psbt,
            compressed_pubkey: sample_pubkey().to_bytes(),
        };
        let one_sig = vec![MpcSignature::new(
            format!("02{}", "11".repeat(32)),
            "22".repeat(32),
            0,
        )];
        let err = finalize_transaction(unsigned, &one_sig).unwrap_err();
        assert!(err.message.contains("2 inputs but 1 signatures"));
    }
}
