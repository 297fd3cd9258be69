//! An implementation of `RFC-8152` `COSE_Key` restricted to the requirements
//! of `ISO/IEC 18013-5:2021`.
//!
//! The holder's authentication key is embedded untagged in the security
//! object's `deviceKeyInfo`, so it round-trips through the same CBOR codec as
//! the rest of the wire format.

use std::collections::BTreeMap;

use coset::iana::Algorithm;
use serde::{Deserialize, Serialize};

/// An RFC-8152 [COSE_Key](https://datatracker.ietf.org/doc/html/rfc8152#section-13)
/// restricted to the two key types ISO/IEC 18013-5 permits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ciborium::Value", into = "ciborium::Value")]
pub enum CoseKey {
    /// Elliptic curve key with x/y coordinates.
    Ec2 {
        /// Curve identifier.
        crv: Ec2Curve,
        /// The x-coordinate.
        x: Vec<u8>,
        /// The y-coordinate, or its sign bit under point compression.
        y: Ec2y,
    },
    /// Octet key pair.
    Okp {
        /// Curve identifier.
        crv: OkpCurve,
        /// The public key bytes.
        x: Vec<u8>,
    },
}

/// The sign bit or value of the y-coordinate for an EC point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ec2y {
    /// Full y-coordinate.
    Value(Vec<u8>),
    /// Sign bit only (point compression).
    SignBit(bool),
}

/// The RFC-8152 identifier of the curve, for the Ec2 key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ec2Curve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
    /// NIST P-521.
    P521,
}

/// The RFC-8152 identifier of the curve, for the Okp key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OkpCurve {
    /// X25519.
    X25519,
    /// X448.
    X448,
    /// Ed25519.
    Ed25519,
    /// Ed448.
    Ed448,
}

/// Errors that can occur when deserializing a `COSE_Key`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Ec2 key without a y-coordinate.
    #[error("COSE_Key of kty 'Ec2' missing y coordinate")]
    Ec2MissingY,
    /// The y-coordinate is neither a byte string nor a bool.
    #[error("expected a CBOR bool or bstr for y-coordinate, received: '{0:?}'")]
    InvalidTypeY(ciborium::Value),
    /// The data item is not a map.
    #[error("expected a CBOR map, received: '{0:?}'")]
    NotAMap(ciborium::Value),
    /// Unrecognized curve identifier.
    #[error("unsupported elliptic curve")]
    UnsupportedCurve,
    /// Key type other than Ec2 or Okp.
    #[error("only Ec2 and Okp keys are supported")]
    UnsupportedKeyType,
    /// A map key was not an integer label.
    #[error("COSE_Key labels must be integers")]
    InvalidLabel,
}

impl CoseKey {
    /// The signature algorithm associated with the key.
    pub const fn signature_algorithm(&self) -> Option<Algorithm> {
        match self {
            Self::Ec2 { crv: Ec2Curve::P256, .. } => Some(Algorithm::ES256),
            Self::Ec2 { crv: Ec2Curve::P384, .. } => Some(Algorithm::ES384),
            Self::Ec2 { crv: Ec2Curve::P521, .. } => Some(Algorithm::ES512),
            Self::Okp { .. } => Some(Algorithm::EdDSA),
        }
    }
}

impl From<CoseKey> for ciborium::Value {
    fn from(key: CoseKey) -> Self {
        let mut map = vec![];
        match key {
            CoseKey::Ec2 { crv, x, y } => {
                // kty: 1, Ec2: 2
                map.push((Self::Integer(1.into()), Self::Integer(2.into())));
                // crv: -1
                map.push((Self::Integer((-1).into()), crv.into()));
                // x: -2
                map.push((Self::Integer((-2).into()), Self::Bytes(x)));
                // y: -3
                map.push((Self::Integer((-3).into()), y.into()));
            }
            CoseKey::Okp { crv, x } => {
                // kty: 1, Okp: 1
                map.push((Self::Integer(1.into()), Self::Integer(1.into())));
                // crv: -1
                map.push((Self::Integer((-1).into()), crv.into()));
                // x: -2
                map.push((Self::Integer((-2).into()), Self::Bytes(x)));
            }
        }
        Self::Map(map)
    }
}

impl TryFrom<ciborium::Value> for CoseKey {
    type Error = Error;

    fn try_from(v: ciborium::Value) -> Result<Self, Error> {
        let map = match v {
            ciborium::Value::Map(map) => map,
            other => return Err(Error::NotAMap(other)),
        };
        let mut map: BTreeMap<i128, ciborium::Value> = map
            .into_iter()
            .map(|(k, v)| {
                let k = k.into_integer().map_err(|_| Error::InvalidLabel)?.into();
                Ok((k, v))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        match (map.remove(&1), map.remove(&-1), map.remove(&-2)) {
            (
                Some(ciborium::Value::Integer(kty)),
                Some(ciborium::Value::Integer(crv_id)),
                Some(ciborium::Value::Bytes(x)),
            ) if <ciborium::value::Integer as Into<i128>>::into(kty) == 2 => {
                let crv_id: i128 = crv_id.into();
                let crv = crv_id.try_into()?;
                let y = map.remove(&-3).ok_or(Error::Ec2MissingY)?.try_into()?;
                Ok(Self::Ec2 { crv, x, y })
            }
            (
                Some(ciborium::Value::Integer(kty)),
                Some(ciborium::Value::Integer(crv_id)),
                Some(ciborium::Value::Bytes(x)),
            ) if <ciborium::value::Integer as Into<i128>>::into(kty) == 1 => {
                let crv_id: i128 = crv_id.into();
                let crv = crv_id.try_into()?;
                Ok(Self::Okp { crv, x })
            }
            _ => Err(Error::UnsupportedKeyType),
        }
    }
}

impl From<Ec2y> for ciborium::Value {
    fn from(y: Ec2y) -> Self {
        match y {
            Ec2y::Value(s) => Self::Bytes(s),
            Ec2y::SignBit(b) => Self::Bool(b),
        }
    }
}

impl TryFrom<ciborium::Value> for Ec2y {
    type Error = Error;

    fn try_from(v: ciborium::Value) -> Result<Self, Error> {
        match v {
            ciborium::Value::Bytes(s) => Ok(Self::Value(s)),
            ciborium::Value::Bool(b) => Ok(Self::SignBit(b)),
            _ => Err(Error::InvalidTypeY(v)),
        }
    }
}

impl From<Ec2Curve> for ciborium::Value {
    fn from(crv: Ec2Curve) -> Self {
        match crv {
            Ec2Curve::P256 => Self::Integer(1.into()),
            Ec2Curve::P384 => Self::Integer(2.into()),
            Ec2Curve::P521 => Self::Integer(3.into()),
        }
    }
}

impl TryFrom<i128> for Ec2Curve {
    type Error = Error;

    fn try_from(crv_id: i128) -> Result<Self, Error> {
        match crv_id {
            1 => Ok(Self::P256),
            2 => Ok(Self::P384),
            3 => Ok(Self::P521),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl From<OkpCurve> for ciborium::Value {
    fn from(crv: OkpCurve) -> Self {
        match crv {
            OkpCurve::X25519 => Self::Integer(4.into()),
            OkpCurve::X448 => Self::Integer(5.into()),
            OkpCurve::Ed25519 => Self::Integer(6.into()),
            OkpCurve::Ed448 => Self::Integer(7.into()),
        }
    }
}

impl TryFrom<i128> for OkpCurve {
    type Error = Error;

    fn try_from(crv_id: i128) -> Result<Self, Error> {
        match crv_id {
            4 => Ok(Self::X25519),
            5 => Ok(Self::X448),
            6 => Ok(Self::Ed25519),
            7 => Ok(Self::Ed448),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;

    #[test]
    fn ec_p256_roundtrip() {
        let key = CoseKey::Ec2 {
            crv: Ec2Curve::P256,
            x: vec![1u8; 32],
            y: Ec2y::Value(vec![2u8; 32]),
        };
        let bytes = cbor::to_vec(&key).expect("should serialize");
        let decoded: CoseKey = cbor::from_slice(&bytes).expect("should deserialize");
        assert_eq!(key, decoded);
        assert_eq!(key.signature_algorithm(), Some(Algorithm::ES256));
    }

    #[test]
    fn okp_ed25519_roundtrip() {
        let key = CoseKey::Okp { crv: OkpCurve::Ed25519, x: vec![3u8; 32] };
        let bytes = cbor::to_vec(&key).expect("should serialize");
        let decoded: CoseKey = cbor::from_slice(&bytes).expect("should deserialize");
        assert_eq!(key, decoded);
        assert_eq!(key.signature_algorithm(), Some(Algorithm::EdDSA));
    }

    #[test]
    fn rejects_unknown_key_type() {
        // kty 3 (RSA) is outside the 18013-5 profile
        let value = ciborium::Value::Map(vec![
            (ciborium::Value::Integer(1.into()), ciborium::Value::Integer(3.into())),
            (ciborium::Value::Integer((-1).into()), ciborium::Value::Integer(1.into())),
            (ciborium::Value::Integer((-2).into()), ciborium::Value::Bytes(vec![0u8; 32])),
        ]);
        assert!(CoseKey::try_from(value).is_err());
    }
}
