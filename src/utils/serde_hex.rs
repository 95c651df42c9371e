//! Serde helpers for byte arrays
//!
//! Fixed-size arrays longer than 32 bytes have no native serde
//! support; compressed public keys (33 bytes) ride through JSON as hex
//! strings instead.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize `[u8; 33]` as a hex string
pub mod hex33 {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 33], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 33], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 33 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::hex33")]
        key: [u8; 33],
    }

    #[test]
    fn test_hex33_round_trip() {
        let holder = Holder { key: [0x02; 33] };
        let json = serde_json::to_string(&holder).unwrap();
        assert!(json.contains(&"02".repeat(33)));

        let parsed: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key, [0x02; 33]);
    }

    #[test]
    fn test_hex33_rejects_wrong_length() {
        let err = serde_json::from_str::<Holder>(r#"{"key":"0202"}"#);
        assert!(err.is_err());
    }
}
