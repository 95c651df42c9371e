//! Structured logging with partial redaction
//!
//! Addresses and transaction hashes are shortened before they reach the
//! log stream; credential material never enters a log field in the
//! first place (the delegate key lives behind the signer adapter).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable debug-level log output
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One structured log line
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field; known-sensitive keys are shortened automatically
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let rendered = value.to_string();
        let stored = if is_identifier_key(key) {
            shorten(&rendered)
        } else {
            rendered
        };
        self.fields.push((key, stored));
        self
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        if self.fields.is_empty() {
            eprintln!("[{}] {} [{}] {}", timestamp, self.level, self.module, self.message);
        } else {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            eprintln!(
                "[{}] {} [{}] {} | {}",
                timestamp, self.level, self.module, self.message, fields
            );
        }
    }
}

fn is_identifier_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["address", "account", "recipient", "sender", "txid", "tx_hash", "hash", "pubkey"]
        .iter()
        .any(|k| key.contains(k))
}

/// Keep enough of an identifier to correlate, not enough to scrape
fn shorten(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() <= 16 {
        return trimmed.to_string();
    }
    let prefix_len = if trimmed.starts_with("0x") { 10 } else { 8 };
    format!(
        "{}...{}",
        &trimmed[..prefix_len],
        &trimmed[trimmed.len() - 6..]
    )
}

/// Debug-level structured log
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg,
        )
        .log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Info-level structured log
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg,
        )
        .log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Warn-level structured log
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg,
        )
        .log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Error-level structured log
#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg,
        )
        .log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_keeps_ends() {
        let addr = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
        let short = shorten(addr);
        assert!(short.starts_with("0xd8dA6BF2"));
        assert!(short.ends_with("96045"));
        assert!(short.contains("..."));
    }

    #[test]
    fn test_short_values_untouched() {
        assert_eq!(shorten("alice.near"), "alice.near");
    }

    #[test]
    fn test_identifier_keys_are_shortened() {
        let entry = LogEntry::new(LogLevel::Info, "test", "msg")
            .field("tx_hash", "4bacd9fb06a9a20cdfa8d6e1f71b5ce9bba2b2ef7d43f1d3e8a9")
            .field("deposit", "1000000");

        let hash_field = entry.fields.iter().find(|(k, _)| *k == "tx_hash").unwrap();
        assert!(hash_field.1.contains("..."));
        let deposit_field = entry.fields.iter().find(|(k, _)| *k == "deposit").unwrap();
        assert_eq!(deposit_field.1, "1000000");
    }
}
