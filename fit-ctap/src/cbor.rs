//! CBOR helpers for CTAP2 messages, built on cbor4ii
//!
//! CTAP2 requests are maps with small integer keys that must be encoded in
//! canonical order (major type, then length, then bytewise). [`MapBuilder`]
//! encodes each value through serde and writes the keys itself so the order
//! does not depend on insertion. [`MapParser`] decodes a response map and
//! extracts typed values on demand.
//!
//! Byte strings must go through [`MapBuilder::insert_bytes`] or
//! `serde_bytes`; a plain `Vec<u8>` serializes as an array of integers.

use crate::error::{Error, Result};

use std::collections::BTreeMap;

use serde::{Serialize, de::DeserializeOwned};

pub type Value = cbor4ii::core::Value;

/// Encode a value with cbor4ii
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    cbor4ii::serde::to_writer(&mut buffer, value).map_err(|e| Error::Encode(format!("{e:?}")))?;
    Ok(buffer)
}

/// Decode a complete CBOR item
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    cbor4ii::serde::from_slice(data).map_err(|e| Error::Malformed(format!("{e:?}")))
}

/// Convert a decoded [`Value`] into a typed value
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    decode(&encode(value)?)
}

/// Canonical sort key of an encoded map key
fn canonical_order(encoded_key: &[u8]) -> (u8, usize, &[u8]) {
    let major = encoded_key.first().map_or(0, |b| b >> 5);
    (major, encoded_key.len(), encoded_key)
}

/// Builder for a CBOR map with integer keys
#[derive(Debug, Default)]
pub struct MapBuilder {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(self, key: i32, value: T) -> Result<Self> {
        let encoded = encode(&value)?;
        self.insert_raw(key, encoded)
    }

    /// Insert only when `value` is `Some`
    pub fn insert_opt<T: Serialize>(self, key: i32, value: Option<T>) -> Result<Self> {
        match value {
            Some(v) => self.insert(key, v),
            None => Ok(self),
        }
    }

    /// Insert a CBOR byte string
    pub fn insert_bytes(self, key: i32, bytes: &[u8]) -> Result<Self> {
        self.insert(key, serde_bytes::Bytes::new(bytes))
    }

    /// Insert a value that is already CBOR, such as a nested built map
    pub fn insert_raw(mut self, key: i32, encoded: Vec<u8>) -> Result<Self> {
        let key = encode(&key)?;
        if self.entries.iter().any(|(k, _)| *k == key) {
            return Err(Error::Encode("duplicate map key".to_string()));
        }
        self.entries.push((key, encoded));
        Ok(self)
    }

    pub fn build(mut self) -> Result<Vec<u8>> {
        let len = self.entries.len();
        let mut out = Vec::with_capacity(
            2 + self
                .entries
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>(),
        );
        match len {
            0..=23 => out.push(0xa0 | len as u8),
            24..=255 => out.extend_from_slice(&[0xb8, len as u8]),
            _ => return Err(Error::Encode("map too large".to_string())),
        }

        self.entries
            .sort_by(|(a, _), (b, _)| canonical_order(a).cmp(&canonical_order(b)));
        for (key, value) in self.entries {
            out.extend_from_slice(&key);
            out.extend_from_slice(&value);
        }
        Ok(out)
    }
}

/// Integer-keyed map decoded from a response
#[derive(Debug)]
pub struct MapParser {
    map: BTreeMap<i32, Value>,
}

impl MapParser {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let map: BTreeMap<i32, Value> = decode(data)?;
        Ok(Self { map })
    }

    pub fn get<T: DeserializeOwned>(&self, key: i32) -> Result<T> {
        let value = self
            .map
            .get(&key)
            .ok_or_else(|| Error::Malformed(format!("missing key {key}")))?;
        from_value(value)
    }

    pub fn get_opt<T: DeserializeOwned>(&self, key: i32) -> Result<Option<T>> {
        self.map.get(&key).map(from_value).transpose()
    }

    /// Required byte string
    pub fn get_bytes(&self, key: i32) -> Result<Vec<u8>> {
        let bytes: serde_bytes::ByteBuf = self.get(key)?;
        Ok(bytes.into_vec())
    }

    pub fn get_bytes_opt(&self, key: i32) -> Result<Option<Vec<u8>>> {
        let bytes: Option<serde_bytes::ByteBuf> = self.get_opt(key)?;
        Ok(bytes.map(serde_bytes::ByteBuf::into_vec))
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.map.contains_key(&key)
    }

    /// Undecoded value, for nested structures read field by field
    pub fn value(&self, key: i32) -> Option<&Value> {
        self.map.get(&key)
    }
}
