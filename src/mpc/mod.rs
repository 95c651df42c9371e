//! MPC signing client
//!
//! Wraps the signer contract's `sign` method: quotes the fee, submits
//! the change call directly or through a relayer, and pulls the ECDSA
//! signature out of the execution receipts.

pub mod client;
pub mod contract;
pub mod signature;
