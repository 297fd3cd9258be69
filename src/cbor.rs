//! # CBOR
//!
//! Serialization helpers shared by the issuance and consumption paths, plus
//! the [`Tag24`] wrapper for "embedded encoded data" (tag 24): a payload that
//! is itself a nested CBOR structure, carried as a tagged byte string.
//!
//! Both halves of the pipeline digest and compare the *tagged* encoding, so
//! encoding here must stay canonical: struct fields serialize in declaration
//! order and integers take their shortest form.

use std::io::Cursor;

use anyhow::anyhow;
use ciborium::Value;
use serde::de::{self, DeserializeOwned};
use serde::{ser, Deserialize, Serialize};

/// Serialize a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be represented in CBOR.
pub fn to_vec<T>(value: &T) -> anyhow::Result<Vec<u8>>
where
    T: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)?;
    Ok(buf)
}

/// Deserialize a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes do not decode into the requested type.
pub fn from_slice<T>(slice: &[u8]) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    ciborium::from_reader(Cursor::new(&slice)).map_err(|e| anyhow!("cbor decoding failed: {e}"))
}

/// Wraps types that serialize as `#6.24(bstr .cbor T)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag24<T> {
    /// The wrapped data item.
    pub inner: T,
}

impl<T: Serialize> Tag24<T> {
    /// Wrap a data item for tagged encoding.
    pub const fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The tagged encoding: tag 24 wrapping the inner item's bytes. These are
    /// the exact bytes digests are computed over.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner item cannot be serialized.
    pub fn to_vec(&self) -> anyhow::Result<Vec<u8>> {
        to_vec(self)
    }

    /// The tagged encoding as a CBOR data item, for embedding in a larger
    /// structure without re-parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner item cannot be serialized.
    pub fn to_value(&self) -> anyhow::Result<Value> {
        Ok(Value::Tag(24, Box::new(Value::Bytes(to_vec(&self.inner)?))))
    }
}

impl<T: DeserializeOwned> TryFrom<Value> for Tag24<T> {
    type Error = anyhow::Error;

    fn try_from(v: Value) -> anyhow::Result<Self> {
        match v {
            Value::Tag(24, inner_value) => match inner_value.as_ref() {
                Value::Bytes(inner_bytes) => {
                    let inner: T = from_slice(inner_bytes)?;
                    Ok(Self { inner })
                }
                _ => Err(anyhow!("invalid tag 24 content: {inner_value:?}")),
            },
            _ => Err(anyhow!("not a tag 24 data item: {v:?}")),
        }
    }
}

impl<T: Serialize> Serialize for Tag24<T> {
    fn serialize<S: ser::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let bytes = to_vec(&self.inner).map_err(ser::Error::custom)?;
        Value::Tag(24, Box::new(Value::Bytes(bytes))).serialize(s)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Tag24<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        value.try_into().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tagged_roundtrip() {
        let original = Tag24::new(String::from("some data"));
        let bytes = original.to_vec().expect("should serialize");

        // leading bytes: tag 24 (0xd8 0x18), then a byte string
        assert_eq!(bytes[..2], [0xd8, 0x18]);

        let roundtripped: Tag24<String> = from_slice(&bytes).expect("should deserialize");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn to_value_matches_to_vec() {
        let item = Tag24::new(vec![1u8, 2, 3]);
        let via_value = to_vec(&item.to_value().unwrap()).unwrap();
        assert_eq!(via_value, item.to_vec().unwrap());
    }

    #[test]
    fn rejects_untagged() {
        let bytes = to_vec(&Value::Bytes(vec![1, 2, 3])).unwrap();
        let result: anyhow::Result<Tag24<Vec<u8>>> = from_slice(&bytes);
        assert!(result.is_err());
    }
}
