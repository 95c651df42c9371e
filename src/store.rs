//! Transaction store capability
//!
//! Some callers split a signing round across process boundaries (the
//! unsigned transaction is produced, the signature arrives later). The
//! core never assumes a specific backing store; it consumes this
//! interface and ships an in-memory default.

use std::collections::HashMap;
use std::sync::Mutex;

/// Ephemeral byte store keyed by caller-chosen strings
///
/// `take` is removal: an unsigned transaction is applied exactly once.
pub trait TransactionStore: Send + Sync {
    fn put(&self, key: &str, bytes: Vec<u8>);
    fn take(&self, key: &str) -> Option<Vec<u8>>;
}

/// Default store backed by a process-local map
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for InMemoryStore {
    fn put(&self, key: &str, bytes: Vec<u8>) {
        if let Ok(mut map) = self.entries.lock() {
            map.insert(key.to_string(), bytes);
        }
    }

    fn take(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.remove(key)
    }
}
