//! Structured compare values and content fingerprinting.
//!
//! A resource may carry an opaque `compare` payload whose content - not the
//! command arguments themselves - signals that an update is needed. The
//! payload is modeled as a small tagged tree and hashed through a canonical
//! byte encoding, so structurally-equal values always produce the same digest
//! regardless of the key order the authoring side happened to emit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Sentinel hashed in place of an absent compare value.
pub const ABSENT_SENTINEL: &str = "undefined";

/// An arbitrary structured value: scalar, sequence, or mapping.
///
/// Mappings use a `BTreeMap` so key order is canonical by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Encode a value into its canonical byte form.
///
/// The encoding is type-prefixed and length-delimited, with mapping entries
/// emitted in key order. Non-finite floats have no canonical representation
/// and fail with [`Error::Serialization`].
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_canonical(value, &mut buf)?;
    Ok(buf)
}

fn write_canonical(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => buf.push(b'z'),
        Value::Bool(b) => {
            buf.push(b'b');
            buf.push(u8::from(*b));
        }
        Value::Integer(i) => {
            buf.push(b'i');
            buf.extend_from_slice(&i.to_be_bytes());
        }
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(Error::Serialization {
                    message: format!("non-finite float {f} has no canonical form"),
                });
            }
            // Collapse -0.0 into 0.0 so numerically equal values hash alike.
            let normalized = if *f == 0.0 { 0.0 } else { *f };
            buf.push(b'f');
            buf.extend_from_slice(&normalized.to_bits().to_be_bytes());
        }
        Value::String(s) => write_str(s, buf),
        Value::Sequence(items) => {
            buf.push(b'l');
            write_len(items.len(), buf);
            for item in items {
                write_canonical(item, buf)?;
            }
        }
        Value::Mapping(map) => {
            buf.push(b'm');
            write_len(map.len(), buf);
            // BTreeMap iteration is already sorted by key.
            for (key, item) in map {
                write_str(key, buf);
                write_canonical(item, buf)?;
            }
        }
    }
    Ok(())
}

fn write_str(s: &str, buf: &mut Vec<u8>) {
    buf.push(b's');
    write_len(s.len(), buf);
    buf.extend_from_slice(s.as_bytes());
}

fn write_len(len: usize, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(len as u64).to_be_bytes());
}

/// Serde adapter persisting an optional compare value as compact JSON text.
///
/// TOML has no null, so a `Value::Null` anywhere in a compare payload cannot
/// be written to a TOML state file in its native form. JSON text carries the
/// full `Value` domain through any format that has strings, and the
/// `BTreeMap`-backed mappings keep the text deterministic.
pub mod json_text {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Value;

    pub fn serialize<S: Serializer>(
        value: &Option<Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => {
                let text = serde_json::to_string(value).map_err(S::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Value>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Compute the fingerprint digest of an optional compare value.
///
/// Absent values hash a fixed sentinel rather than failing, so "no compare
/// declared" is itself a stable, comparable state.
pub fn fingerprint(value: Option<&Value>) -> Result<String> {
    let digest = match value {
        Some(value) => blake3::hash(&canonical_bytes(value)?),
        None => blake3::hash(ABSENT_SENTINEL.as_bytes()),
    };
    Ok(digest.to_hex().to_string())
}
