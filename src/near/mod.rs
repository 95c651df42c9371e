//! Coordinator-chain adapter
//!
//! View calls, change calls and signed-delegate envelopes against the
//! NEAR-style coordinator chain. Key custody stays behind the
//! [`signer::CoordinatorSigner`] adapter; this module never reads
//! credential material from the environment.

pub mod nonce;
pub mod rpc;
pub mod signer;
pub mod tx;
