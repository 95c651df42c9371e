//! Cross-cutting utilities

pub mod amount;
pub mod http;
pub mod logging;
pub mod serde_hex;
