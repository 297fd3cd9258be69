//! # Mobile Security Object (MSO)
//!
//! The MSO provides issuer data authentication for the associated mdoc. It
//! binds a digest of every salted data element to the document type, the
//! holder's authentication key and a validity window, and is itself signed by
//! the issuer.
//!
//! See 9.1.2.4 Signing method and structure for MSO.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::cose_key::CoseKey;
use crate::doctype::DocumentTypeRepository;
use crate::error::{Error, Result};
use crate::mdoc::NameSpace;

/// An ordered set of value digests for each data element in each namespace.
pub type ValueDigests = BTreeMap<NameSpace, DigestIds>;

/// Digests keyed by digest ID within one namespace.
pub type DigestIds = BTreeMap<DigestId, Digest>;

/// `DigestId` is an unsigned integer used to match the hashes in the MSO to
/// the data elements in the mdoc response.
///
/// The digest ID must be unique within a namespace with no correlation
/// between IDs for the same namespace/element in different MSOs. The value
/// must be smaller than 2^31.
pub type DigestId = i32;

/// A value digest over the tagged encoding of one salted item.
pub type Digest = ByteBuf;

/// An mdoc digital signature is generated over the mobile security object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MobileSecurityObject {
    /// Version of the `MobileSecurityObject`. Must be 1.0.
    pub version: Version,

    /// Message digest algorithm used.
    pub digest_algorithm: DigestAlgorithm,

    /// An ordered set of value digests for each data element in each
    /// namespace.
    pub value_digests: ValueDigests,

    /// Device key information.
    pub device_key_info: DeviceKeyInfo,

    /// The document type of the document being signed.
    pub doc_type: String,

    /// Validity information for the MSO.
    pub validity_info: ValidityInfo,
}

/// MSO version.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Version {
    /// Version 1.0
    #[default]
    #[serde(rename = "1.0")]
    V1_0,
}

/// Digest algorithm used by the MSO.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,

    /// SHA-384
    #[serde(rename = "SHA-384")]
    Sha384,

    /// SHA-512
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Compute the digest of `data` with this algorithm.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        use sha2::Digest as _;
        match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Holds the mdoc authentication public key and information related to this
/// key. Encoded as an untagged `COSE_Key` element as specified in [RFC 9052]
/// and [RFC 9053].
///
/// [RFC 9052]: https://www.rfc-editor.org/rfc/rfc9052
/// [RFC 9053]: https://www.rfc-editor.org/rfc/rfc9053
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceKeyInfo {
    /// Device key.
    pub device_key: CoseKey,

    /// Key authorizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_authorizations: Option<KeyAuthorization>,

    /// Key info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_info: Option<BTreeMap<i64, ciborium::Value>>,
}

/// Elements the device key is authorized to sign over.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyAuthorization {
    /// Namespaces authorized in their entirety.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_spaces: Option<Vec<NameSpace>>,

    /// Individually authorized data elements, by namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_elements: Option<BTreeMap<NameSpace, Vec<String>>>,
}

/// Contains information related to the validity of the MSO and its signature.
///
/// All timestamps are whole seconds; the wire format does not permit
/// fractional seconds (clauses 7.1 and 9.1.2.4).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidityInfo {
    /// Time the MSO was signed.
    #[serde(with = "tdate")]
    pub signed: DateTime<Utc>,

    /// The timestamp before which the MSO is not yet valid. Equal to or later
    /// than `signed`.
    #[serde(with = "tdate")]
    pub valid_from: DateTime<Utc>,

    /// The timestamp after which the MSO is no longer valid. Equal to or
    /// later than `valid_from`.
    #[serde(with = "tdate")]
    pub valid_until: DateTime<Utc>,

    /// The time at which the issuing authority expects to re-sign the MSO
    /// (and potentially update data elements).
    #[serde(default, with = "tdate_opt", skip_serializing_if = "Option::is_none")]
    pub expected_update: Option<DateTime<Utc>>,
}

/// CBOR tdate: tag 0 wrapping an RFC 3339 text string without fractional
/// seconds.
mod tdate {
    use chrono::{DateTime, Utc};
    use ciborium::Value;
    use serde::de::{self, Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    pub fn to_value(dt: &DateTime<Utc>) -> Value {
        Value::Tag(0, Box::new(Value::Text(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())))
    }

    pub fn from_value(value: &Value) -> Result<DateTime<Utc>, String> {
        let text = match value {
            Value::Tag(0, inner) => inner.as_text(),
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
        .ok_or_else(|| format!("not a tdate: {value:?}"))?;

        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid tdate '{text}': {e}"))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        to_value(dt).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(d)?;
        from_value(&value).map_err(de::Error::custom)
    }
}

/// Optional tdate, for fields omitted entirely when absent.
mod tdate_opt {
    use chrono::{DateTime, Utc};
    use ciborium::Value;
    use serde::de::{self, Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use super::tdate;

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>, s: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => tdate::to_value(dt).serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        value.map(|v| tdate::from_value(&v).map_err(de::Error::custom)).transpose()
    }
}

/// Truncate a timestamp to whole seconds.
fn truncate_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}

const MAX_ID_ATTEMPTS: usize = 32;

/// Allocates digest IDs for one namespace. IDs are drawn at random below
/// 2^31 and never repeat for the lifetime of one credential payload.
#[derive(Debug, Default)]
pub struct DigestIdGenerator {
    used: HashSet<DigestId>,
}

impl DigestIdGenerator {
    /// Create a generator with no IDs allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh digest ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::Construction` if a collision-free ID cannot be found
    /// after a bounded number of attempts.
    pub fn generate(&mut self, rng: &mut (impl CryptoRng + RngCore)) -> Result<DigestId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            #[allow(clippy::cast_possible_wrap)]
            let id = (rng.next_u32() & 0x7fff_ffff) as DigestId;
            if self.used.insert(id) {
                return Ok(id);
            }
        }
        Err(Error::Construction("digest ID space exhausted".to_string()))
    }
}

/// Assembles the signed metadata object: document type, digest algorithm,
/// per-namespace digest tables, holder authentication key and validity
/// window.
#[derive(Debug)]
pub struct MobileSecurityObjectBuilder {
    digest_algorithm: DigestAlgorithm,
    doc_type: String,
    device_key: CoseKey,
    value_digests: ValueDigests,
    validity_info: Option<ValidityInfo>,
}

impl MobileSecurityObjectBuilder {
    /// Start building an MSO for the given document type and holder key.
    pub fn new(
        digest_algorithm: DigestAlgorithm, doc_type: impl Into<String>, device_key: CoseKey,
    ) -> Self {
        Self {
            digest_algorithm,
            doc_type: doc_type.into(),
            device_key,
            value_digests: ValueDigests::new(),
            validity_info: None,
        }
    }

    /// Set the validity window. Timestamps are truncated to whole seconds
    /// when the MSO is generated.
    #[must_use]
    pub fn validity_info(
        mut self, signed: DateTime<Utc>, valid_from: DateTime<Utc>, valid_until: DateTime<Utc>,
        expected_update: Option<DateTime<Utc>>,
    ) -> Self {
        self.validity_info = Some(ValidityInfo { signed, valid_from, valid_until, expected_update });
        self
    }

    /// Add the digest table for one namespace.
    #[must_use]
    pub fn add_digest_ids(mut self, name_space: impl Into<NameSpace>, digests: DigestIds) -> Self {
        self.value_digests.insert(name_space.into(), digests);
        self
    }

    /// Produce the security object.
    ///
    /// # Errors
    ///
    /// Returns `Error::Construction` if no validity window was set, if the
    /// window is inverted (`signed > valid_from` or `valid_from >
    /// valid_until`; equal bounds are accepted), if the document type is not
    /// known to `repository`, or if a digested namespace does not appear in
    /// the document type's schema.
    pub fn generate(self, repository: &DocumentTypeRepository) -> Result<MobileSecurityObject> {
        let Some(validity_info) = self.validity_info else {
            return Err(Error::Construction("validity window not set".to_string()));
        };

        let validity_info = ValidityInfo {
            signed: truncate_seconds(validity_info.signed),
            valid_from: truncate_seconds(validity_info.valid_from),
            valid_until: truncate_seconds(validity_info.valid_until),
            expected_update: validity_info.expected_update.map(truncate_seconds),
        };
        if validity_info.valid_from > validity_info.valid_until {
            return Err(Error::Construction("validFrom is later than validUntil".to_string()));
        }
        if validity_info.signed > validity_info.valid_from {
            return Err(Error::Construction("signed is later than validFrom".to_string()));
        }

        let Some(document_type) = repository.get_document_type_for_mdoc(&self.doc_type) else {
            return Err(Error::Construction(format!("unknown doc type: {}", self.doc_type)));
        };
        let mdoc_type = document_type
            .mdoc
            .as_ref()
            .ok_or_else(|| Error::Construction(format!("no mdoc schema for {}", self.doc_type)))?;
        for name_space in self.value_digests.keys() {
            if !mdoc_type.name_spaces.contains_key(name_space) {
                return Err(Error::Construction(format!(
                    "namespace {name_space} not in schema for {}",
                    self.doc_type
                )));
            }
        }

        Ok(MobileSecurityObject {
            version: Version::V1_0,
            digest_algorithm: self.digest_algorithm,
            value_digests: self.value_digests,
            device_key_info: DeviceKeyInfo {
                device_key: self.device_key,
                key_authorizations: None,
                key_info: None,
            },
            doc_type: self.doc_type,
            validity_info,
        })
    }
}
