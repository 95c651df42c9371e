//! Key derivation paths and canonicalization
//!
//! The signer contract only ever sees a canonical string. Callers may
//! hand us an opaque string (used as-is) or a structured path, which is
//! reduced to RFC 8785 canonical JSON: keys sorted, no insignificant
//! whitespace, null members omitted. Identical structured inputs must
//! yield byte-identical canonical strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application-chosen derivation path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyDerivationPath {
    Structured(StructuredPath),
    Plain(String),
}

/// Structured path form: SLIP-44 coin number plus optional context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPath {
    pub chain: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl KeyDerivationPath {
    pub fn plain(s: impl Into<String>) -> Self {
        KeyDerivationPath::Plain(s.into())
    }

    pub fn structured(chain: u32, domain: Option<String>, meta: Option<Value>) -> Self {
        KeyDerivationPath::Structured(StructuredPath { chain, domain, meta })
    }

    /// The exact string the signer contract sees
    pub fn canonicalize(&self) -> String {
        match self {
            KeyDerivationPath::Plain(s) => s.clone(),
            KeyDerivationPath::Structured(p) => {
                let mut value = serde_json::Map::new();
                value.insert("chain".to_string(), Value::from(p.chain));
                if let Some(domain) = &p.domain {
                    value.insert("domain".to_string(), Value::from(domain.clone()));
                }
                if let Some(meta) = &p.meta {
                    value.insert("meta".to_string(), meta.clone());
                }
                let mut out = Vec::new();
                write_canonical(&Value::Object(value), &mut out);
                // Output is built from valid JSON values only
                String::from_utf8(out).expect("canonical JSON is UTF-8")
            }
        }
    }
}

impl From<&str> for KeyDerivationPath {
    fn from(s: &str) -> Self {
        KeyDerivationPath::Plain(s.to_string())
    }
}

impl From<String> for KeyDerivationPath {
    fn from(s: String) -> Self {
        KeyDerivationPath::Plain(s)
    }
}

/// RFC 8785 serialization: sorted keys, minimal escapes, nulls dropped
/// from objects.
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(arr) => {
            out.push(b'[');
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(v, out);
            }
            out.push(b']');
        }
        Value::Object(obj) => {
            out.push(b'{');
            let mut keys: Vec<_> = obj.keys().filter(|k| !obj[*k].is_null()).collect();
            // RFC 8785 sorts by UTF-16 code units; identical to byte
            // order for all keys outside the supplementary planes
            keys.sort_by(|a, b| {
                a.encode_utf16()
                    .collect::<Vec<_>>()
                    .cmp(&b.encode_utf16().collect::<Vec<_>>())
            });
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_escaped(key, out);
                out.push(b':');
                write_canonical(&obj[key.as_str()], out);
            }
            out.push(b'}');
        }
    }
}

fn write_escaped(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\x08' => out.extend_from_slice(b"\\b"),
            '\x0c' => out.extend_from_slice(b"\\f"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if c.is_control() => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_path_passes_through() {
        let path = KeyDerivationPath::plain("m/44'/60'/0'/0/0");
        assert_eq!(path.canonicalize(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn test_structured_path_canonical_form() {
        let path = KeyDerivationPath::structured(
            60,
            Some("example.com".to_string()),
            Some(json!({"a": 1, "b": 2})),
        );
        assert_eq!(
            path.canonicalize(),
            r#"{"chain":60,"domain":"example.com","meta":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn test_key_order_is_insensitive_to_input_order() {
        // Same content keyed in different order must canonicalize
        // byte-identically
        let p1 = KeyDerivationPath::structured(
            60,
            Some("example.com".to_string()),
            Some(json!({"a": 1, "b": 2})),
        );
        let p2: KeyDerivationPath = serde_json::from_str(
            r#"{"meta":{"b":2,"a":1},"domain":"example.com","chain":60}"#,
        )
        .unwrap();
        assert_eq!(p1.canonicalize(), p2.canonicalize());
    }

    #[test]
    fn test_null_members_are_omitted() {
        let path = KeyDerivationPath::structured(0, None, Some(json!({"x": null, "y": 3})));
        assert_eq!(path.canonicalize(), r#"{"chain":0,"meta":{"y":3}}"#);
    }

    #[test]
    fn test_omitted_and_null_domain_agree() {
        let without = KeyDerivationPath::structured(118, None, None);
        let with_null: KeyDerivationPath =
            serde_json::from_str(r#"{"chain":118,"domain":null}"#).unwrap();
        assert_eq!(without.canonicalize(), with_null.canonicalize());
    }

    #[test]
    fn test_string_escapes() {
        let path =
            KeyDerivationPath::structured(0, Some("a\"b\\c\nd".to_string()), None);
        assert_eq!(
            path.canonicalize(),
            "{\"chain\":0,\"domain\":\"a\\\"b\\\\c\\nd\"}"
        );
    }

    #[test]
    fn test_nested_arrays_and_objects() {
        let path = KeyDerivationPath::structured(
            60,
            None,
            Some(json!({"list": [3, {"z": 1, "a": 2}], "flag": true})),
        );
        assert_eq!(
            path.canonicalize(),
            r#"{"chain":60,"meta":{"flag":true,"list":[3,{"a":2,"z":1}]}}"#
        );
    }
}
