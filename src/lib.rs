//! omnisig core library
//!
//! Client-side multi-chain transaction factory driven by MPC chain
//! signatures. A single identity on the coordinator chain authorizes
//! transactions on Bitcoin, EVM and Cosmos SDK chains without ever
//! holding a native key for those chains.
//!
//! # Architecture
//!
//! - **derive**: child-key derivation and per-chain address hashing
//! - **path**: derivation paths and canonical JSON reduction
//! - **near**: coordinator-chain RPC, envelopes, nonce cache
//! - **mpc**: fee quoting, the `sign` call, signature translation
//! - **chains**: EVM / Bitcoin / Cosmos assemblers behind one trait
//! - **store**: injected persistence for split signing rounds
//!
//! # Flow
//!
//! Derive an address from the signer contract's root key, assemble an
//! unsigned transaction, extract its sighash payload(s), have the
//! contract sign each payload, reattach and broadcast:
//!
//! ```rust,ignore
//! use omnisig::{FactoryConfig, CoordinatorNetwork, MpcClient, SignRequest};
//! use omnisig::chains::{evm::EvmChain, ChainAdapter};
//!
//! let config = FactoryConfig::new(CoordinatorNetwork::Testnet);
//! let client = MpcClient::new(&config, signer)?;
//!
//! let root = client.root_public_key().await?;
//! let evm = EvmChain::new("https://sepolia.drpc.org", None);
//! let (address, _) = evm.derive_address_and_pubkey(&root, client.caller_id(), &path)?;
//!
//! let (unsigned, payloads) = evm.prepare_payload(request).await?;
//! let signature = client.sign(SignRequest::new(payloads[0].payload, path)).await?;
//! let result = evm.attach_signatures_and_broadcast(unsigned, &[signature]).await?;
//! ```
//!
//! The only secret in the system is the coordinator account key, held
//! behind [`near::signer::CoordinatorSigner`]; nothing here reads the
//! environment or the filesystem.

pub mod chains;
pub mod config;
pub mod derive;
pub mod error;
pub mod flow;
pub mod mpc;
pub mod near;
pub mod path;
pub mod store;
pub mod types;
pub mod utils;

// Re-export the types most callers touch
pub use chains::{ChainAdapter, UnsignedTransaction};
pub use config::{BitcoinEndpoint, CoordinatorNetwork, EvmEndpoint, FactoryConfig};
pub use derive::BitcoinNetwork;
pub use error::{ErrorCode, OmnisigError, OmnisigResult};
pub use flow::sign_and_broadcast;
pub use mpc::client::{MpcClient, SignRequest};
pub use mpc::signature::{MpcSignature, RsvSignature};
pub use near::signer::{CoordinatorSigner, KeyPairSigner};
pub use path::KeyDerivationPath;
pub use store::{InMemoryStore, TransactionStore};
pub use types::{BroadcastResult, ChainFamily, MpcPayload, SignProgress, SignStage};
