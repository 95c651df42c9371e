//! Shared value types
//!
//! Types that cross subsystem boundaries live here; chain-specific
//! request/transaction shapes stay with their assemblers.

use crate::error::{OmnisigError, OmnisigResult};
use serde::{Deserialize, Serialize};

/// The three chain families the factory can sign for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Evm,
    Bitcoin,
    Cosmos,
}

/// A 32-byte sighash the MPC must sign, tagged with the position the
/// resulting signature is inserted at.
///
/// A transaction may need several payloads (one per Bitcoin input);
/// ordering is always ascending by `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcPayload {
    pub index: u32,
    pub payload: [u8; 32],
}

impl MpcPayload {
    pub fn new(index: u32, payload: [u8; 32]) -> Self {
        Self { index, payload }
    }

    pub fn payload_hex(&self) -> String {
        hex::encode(self.payload)
    }
}

/// Outcome of handing a signed transaction to a foreign-chain provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub family: ChainFamily,
    pub tx_hash: String,
}

/// Per-sign lifecycle stages
///
/// `Signing -> Signed` requires a terminal-success receipt parse and
/// `Broadcasting -> Broadcast` requires provider acknowledgement; any
/// failure is terminal, there is no in-core retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignStage {
    Assembled,
    PayloadExtracted,
    Signing,
    Signed,
    Broadcasting,
    Broadcast,
    Failed,
}

impl SignStage {
    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(self, next: SignStage) -> bool {
        use SignStage::*;
        if matches!(self, Broadcast | Failed) {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Assembled, PayloadExtracted)
                | (PayloadExtracted, Signing)
                | (Signing, Signed)
                | (Signed, Broadcasting)
                | (Broadcasting, Broadcast)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SignStage::Broadcast | SignStage::Failed)
    }
}

/// Tracks one signing round through its stages, rejecting out-of-order
/// transitions as assertion-class bugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignProgress {
    stage: SignStage,
}

impl SignProgress {
    pub fn new() -> Self {
        Self {
            stage: SignStage::Assembled,
        }
    }

    pub fn stage(&self) -> SignStage {
        self.stage
    }

    pub fn advance(&mut self, next: SignStage) -> OmnisigResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(OmnisigError::protocol_invariant(format!(
                "Illegal stage transition {:?} -> {:?}",
                self.stage, next
            )));
        }
        self.stage = next;
        Ok(())
    }
}

impl Default for SignProgress {
    fn default() -> Self {
        Self::new()
    }
}
