//! # Mdoc data model
//!
//! The issuer-signed half of the mdoc wire format: namespaced data elements,
//! the salted items digested into the security object, and the credential
//! payload that carries both to the holder.
//!
//! See 8.3.2.1.2.2 Device retrieval mdoc response.

use std::collections::BTreeMap;

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::cbor::{self, Tag24};
use crate::error::{Error, Result};
use crate::mso::DigestId;

/// Namespace grouping related data elements, e.g. `"org.iso.18013.5.1"`.
pub type NameSpace = String;

/// Salted items for each namespace, in issuance order. Each item is hashed
/// into the security object under its digest ID.
pub type IssuerNameSpaces = BTreeMap<NameSpace, Vec<IssuerSignedItemBytes>>;

/// `IssuerSignedItemBytes` represents the tagged `IssuerSignedItem` after
/// CBOR serialization: `#6.24(bstr .cbor IssuerSignedItem)`.
pub type IssuerSignedItemBytes = Tag24<IssuerSignedItem>;

/// Issuer-signed data element. The salt decorrelates the element's digest
/// from its value, so disclosing one element reveals nothing about the others.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSignedItem {
    /// Id of the digest as added to the security object's `valueDigests`.
    #[serde(rename = "digestID")]
    pub digest_id: DigestId,

    /// Random salt for issuer data authentication (min. 16 bytes). Drawn
    /// fresh per item per issuance; reuse breaks unlinkability.
    pub random: ByteBuf,

    /// Data element identifier. For example, "`family_name`".
    pub element_identifier: String,

    /// Data element value. For example, "`Smith`".
    pub element_value: ciborium::Value,
}

/// A set of data elements grouped by namespace, the self-asserted or derived
/// attribute set fed to issuance. Element values are already-encoded CBOR
/// data items; insertion order is preserved on both levels.
#[derive(Clone, Debug, Default)]
pub struct NameSpacedData {
    name_spaces: IndexMap<NameSpace, IndexMap<String, ciborium::Value>>,
}

impl NameSpacedData {
    /// Create a builder for a new data set.
    pub fn builder() -> NameSpacedDataBuilder {
        NameSpacedDataBuilder { data: Self::default() }
    }

    /// Iterate namespaces and their `(identifier, value)` entries.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&NameSpace, &IndexMap<String, ciborium::Value>)> {
        self.name_spaces.iter()
    }

    /// Number of data elements across all namespaces.
    pub fn len(&self) -> usize {
        self.name_spaces.values().map(IndexMap::len).sum()
    }

    /// True when no namespace holds any element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for [`NameSpacedData`].
#[derive(Clone, Debug, Default)]
pub struct NameSpacedDataBuilder {
    data: NameSpacedData,
}

impl NameSpacedDataBuilder {
    /// Add one data element. A repeated `(name_space, identifier)` pair
    /// replaces the earlier value.
    #[must_use]
    pub fn put_entry(
        mut self, name_space: impl Into<NameSpace>, identifier: impl Into<String>,
        value: ciborium::Value,
    ) -> Self {
        self.data
            .name_spaces
            .entry(name_space.into())
            .or_default()
            .insert(identifier.into(), value);
        self
    }

    /// Finish building.
    pub fn build(self) -> NameSpacedData {
        self.data
    }
}

/// The credential payload: per-namespace salted item bytes plus the encoded
/// issuer signature. This is the unit that is persisted and transmitted;
/// once issued it is immutable for its validity window.
///
/// Items are carried as raw CBOR data items so that one corrupt item degrades
/// only its own rendering instead of failing the whole parse.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaticAuthData {
    /// Encoded salted items for each namespace, in issuance order.
    pub digest_id_mapping: BTreeMap<NameSpace, Vec<ciborium::Value>>,

    /// The CBOR-encoded `COSE_Sign1` issuer signature over the security
    /// object.
    pub issuer_auth: ByteBuf,
}

impl StaticAuthData {
    /// Package per-namespace salted items and the issuer signature into a
    /// payload. No transformation of the inputs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Construction` if an item cannot be re-encoded.
    pub fn new(name_spaces: &IssuerNameSpaces, issuer_auth: Vec<u8>) -> Result<Self> {
        let mut digest_id_mapping = BTreeMap::new();
        for (name_space, items) in name_spaces {
            let values = items
                .iter()
                .map(Tag24::to_value)
                .collect::<anyhow::Result<Vec<_>>>()
                .map_err(|e| Error::Construction(e.to_string()))?;
            digest_id_mapping.insert(name_space.clone(), values);
        }
        Ok(Self { digest_id_mapping, issuer_auth: ByteBuf::from(issuer_auth) })
    }

    /// Encode the payload as an opaque base64url (unpadded) blob.
    ///
    /// # Errors
    ///
    /// Returns `Error::Construction` if CBOR encoding fails.
    pub fn to_base64url(&self) -> Result<String> {
        let bytes = cbor::to_vec(self).map_err(|e| Error::Construction(e.to_string()))?;
        Ok(Base64::encode_string(&bytes))
    }

    /// Strict inverse of [`Self::to_base64url`]: split a payload into its
    /// per-namespace item lists and the issuer-signature blob.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPayload` if the blob is not base64url, or if
    /// the top-level structure does not have exactly the expected two fields.
    /// Individual items are not validated here; an item that later fails
    /// tagged decoding degrades only its own rendering.
    pub fn from_base64url(payload: &str) -> Result<Self> {
        let bytes = Base64::decode_vec(payload)
            .map_err(|e| Error::MalformedPayload(format!("invalid base64url: {e}")))?;
        cbor::from_slice(&bytes).map_err(|e| Error::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_item() -> IssuerSignedItemBytes {
        Tag24::new(IssuerSignedItem {
            digest_id: 7,
            random: ByteBuf::from(vec![0u8; 16]),
            element_identifier: "registration_number".to_string(),
            element_value: ciborium::Value::Text("FG67 TUV".to_string()),
        })
    }

    #[test]
    fn payload_roundtrip() {
        let mut name_spaces = IssuerNameSpaces::new();
        name_spaces.insert("org.iso.7367.1".to_string(), vec![sample_item()]);

        let auth_data =
            StaticAuthData::new(&name_spaces, vec![0xa0]).expect("should assemble");
        let encoded = auth_data.to_base64url().expect("should encode");
        let decoded = StaticAuthData::from_base64url(&encoded).expect("should decode");
        assert_eq!(auth_data, decoded);

        let items = &decoded.digest_id_mapping["org.iso.7367.1"];
        let item = Tag24::<IssuerSignedItem>::try_from(items[0].clone())
            .expect("should convert back to a tagged item");
        assert_eq!(item.inner.element_identifier, "registration_number");
    }

    #[test]
    fn rejects_extra_top_level_field() {
        let value = ciborium::Value::Map(vec![
            (
                ciborium::Value::Text("digestIdMapping".to_string()),
                ciborium::Value::Map(vec![]),
            ),
            (
                ciborium::Value::Text("issuerAuth".to_string()),
                ciborium::Value::Bytes(vec![0xa0]),
            ),
            (
                ciborium::Value::Text("extra".to_string()),
                ciborium::Value::Bool(true),
            ),
        ]);
        let bytes = cbor::to_vec(&value).unwrap();
        let encoded = Base64::encode_string(&bytes);

        let err = StaticAuthData::from_base64url(&encoded).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn rejects_missing_issuer_auth() {
        let value = ciborium::Value::Map(vec![(
            ciborium::Value::Text("digestIdMapping".to_string()),
            ciborium::Value::Map(vec![]),
        )]);
        let bytes = cbor::to_vec(&value).unwrap();
        let encoded = Base64::encode_string(&bytes);

        let err = StaticAuthData::from_base64url(&encoded).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn rejects_non_base64() {
        let err = StaticAuthData::from_base64url("not base64!").unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn builder_preserves_insertion_order() {
        let data = NameSpacedData::builder()
            .put_entry("ns", "zulu", ciborium::Value::Integer(1.into()))
            .put_entry("ns", "alpha", ciborium::Value::Integer(2.into()))
            .build();

        let (_, elements) = data.iter().next().expect("one namespace");
        let identifiers: Vec<_> = elements.keys().collect();
        assert_eq!(identifiers, ["zulu", "alpha"]);
    }
}
