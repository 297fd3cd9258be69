//! # Issuance
//!
//! The issuance pipeline: salt and digest each attribute independently,
//! assemble the security object binding those digests to the holder's
//! authentication key, sign it, and package the result into the
//! transmissible payload.
//!
//! Each request is an independent unit of work. Nothing is shared between
//! two issuances beyond the read-only schema repository and the caller's
//! random source, and partial state from an abandoned request must never be
//! reused: salts are always drawn fresh.

use chrono::{DateTime, Utc};
use ciborium::Value;
use coset::{iana, CborSerializable, CoseSign1Builder, HeaderBuilder};
use rand::{CryptoRng, RngCore};
use serde_bytes::ByteBuf;

use crate::cbor::Tag24;
use crate::cose_key::CoseKey;
use crate::doctype::DocumentTypeRepository;
use crate::error::{Error, Result};
use crate::mdoc::{
    IssuerNameSpaces, IssuerSignedItem, IssuerSignedItemBytes, NameSpacedData, StaticAuthData,
};
use crate::mso::{DigestAlgorithm, DigestIdGenerator, DigestIds, MobileSecurityObjectBuilder};
use crate::provider::{Algorithm, Signer};

/// COSE header label for the issuer certificate chain (RFC 9360 x5chain).
const X5CHAIN: i64 = 33;

/// Salt length in bytes. The wire format requires at least 16.
const SALT_LEN: usize = 16;

/// Turn the attribute set into salted, digest-addressable items, one list
/// per namespace. Digest IDs are allocated per namespace and salts are drawn
/// fresh from `rng` for every item: encoding the same data twice yields
/// identical identifiers and values but different salts.
///
/// # Errors
///
/// Returns `Error::Construction` if a digest ID cannot be allocated.
pub fn generate_issuer_name_spaces(
    data: &NameSpacedData, rng: &mut (impl CryptoRng + RngCore),
) -> Result<IssuerNameSpaces> {
    let mut name_spaces = IssuerNameSpaces::new();

    for (name_space, elements) in data.iter() {
        let mut id_generator = DigestIdGenerator::new();
        let mut items = Vec::with_capacity(elements.len());

        for (identifier, value) in elements {
            let mut random = vec![0u8; SALT_LEN];
            rng.fill_bytes(&mut random);

            items.push(Tag24::new(IssuerSignedItem {
                digest_id: id_generator.generate(rng)?,
                random: ByteBuf::from(random),
                element_identifier: identifier.clone(),
                element_value: value.clone(),
            }));
        }
        name_spaces.insert(name_space.clone(), items);
    }

    Ok(name_spaces)
}

/// Compute the digest table for one namespace: each item is re-encoded in
/// its tagged wire form and digested over those exact bytes. Pure function
/// of its inputs.
///
/// # Errors
///
/// Returns `Error::Construction` if an item cannot be re-encoded or if two
/// items share a digest ID.
pub fn calculate_digests_for_name_space(
    items: &[IssuerSignedItemBytes], algorithm: DigestAlgorithm,
) -> Result<DigestIds> {
    let mut digests = DigestIds::new();

    for item in items {
        let bytes = item.to_vec().map_err(|e| Error::Construction(e.to_string()))?;
        let digest = ByteBuf::from(algorithm.digest(&bytes));
        if digests.insert(item.inner.digest_id, digest).is_some() {
            return Err(Error::Construction(format!(
                "digest ID collision: {}",
                item.inner.digest_id
            )));
        }
    }

    Ok(digests)
}

/// Sign the tagged, encoded security object. Produces an encoded
/// `COSE_Sign1` with the algorithm in the protected header and the issuer
/// certificate chain (leaf first) in the unprotected header.
///
/// # Errors
///
/// Returns `Error::Signing` if the signer declares an algorithm outside the
/// wire format's profile, presents no certificate chain, or fails to sign.
/// There is no fallback; a signing failure aborts issuance.
pub async fn sign_issuer_auth(mso_bytes: &[u8], signer: &impl Signer) -> Result<Vec<u8>> {
    let algorithm = match signer.algorithm() {
        Algorithm::Es256 => iana::Algorithm::ES256,
        Algorithm::EdDsa => iana::Algorithm::EdDSA,
        other => return Err(Error::Signing(format!("unsupported algorithm: {other}"))),
    };

    let chain = signer.certificate_chain();
    if chain.is_empty() {
        return Err(Error::Signing("empty certificate chain".to_string()));
    }
    // single certificate encodes as a bare bstr, several as an array
    let x5chain = if chain.len() == 1 {
        Value::Bytes(chain.into_iter().next().unwrap_or_default())
    } else {
        Value::Array(chain.into_iter().map(Value::Bytes).collect())
    };

    let signature =
        signer.try_sign(mso_bytes).await.map_err(|e| Error::Signing(e.to_string()))?;

    let protected = HeaderBuilder::new().algorithm(algorithm).build();
    let unprotected = HeaderBuilder::new().value(X5CHAIN, x5chain).build();
    let cose_sign1 = CoseSign1Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .payload(mso_bytes.to_vec())
        .signature(signature)
        .build();

    cose_sign1.to_vec().map_err(|e| Error::Signing(e.to_string()))
}

/// Issue a credential: encode and digest the attribute set, build and sign
/// the security object, and return the payload as an opaque base64url blob.
///
/// A failed issuance returns no credential; callers must not retain partial
/// artifacts, and a retry starts over with fresh salts.
///
/// # Errors
///
/// Returns `Error::Construction` for an invalid validity window, a digest ID
/// collision, or a namespace unknown to the document type's schema, and
/// `Error::Signing` if the issuer signature cannot be produced.
#[tracing::instrument(skip_all, fields(doc_type = %doc_type))]
#[allow(clippy::too_many_arguments)]
pub async fn issue(
    data: &NameSpacedData, doc_type: &str, device_key: CoseKey,
    digest_algorithm: DigestAlgorithm, signed: DateTime<Utc>, valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>, repository: &DocumentTypeRepository, signer: &impl Signer,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<String> {
    let name_spaces = generate_issuer_name_spaces(data, rng)?;

    let mut builder = MobileSecurityObjectBuilder::new(digest_algorithm, doc_type, device_key)
        .validity_info(signed, valid_from, valid_until, None);
    for (name_space, items) in &name_spaces {
        let digests = calculate_digests_for_name_space(items, digest_algorithm)?;
        builder = builder.add_digest_ids(name_space, digests);
    }
    let mso = builder.generate(repository)?;

    let mso_bytes =
        Tag24::new(mso).to_vec().map_err(|e| Error::Construction(e.to_string()))?;
    let issuer_auth = sign_issuer_auth(&mso_bytes, signer).await?;
    tracing::debug!(items = data.len(), "issuer auth signed");

    StaticAuthData::new(&name_spaces, issuer_auth)?.to_base64url()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn two_element_data() -> NameSpacedData {
        NameSpacedData::builder()
            .put_entry(
                "org.iso.7367.1",
                "registration_number",
                Value::Text("FG67 TUV".to_string()),
            )
            .put_entry(
                "org.iso.7367.1",
                "vehicle_identification_number",
                Value::Text("WBA3A5C53EF123456".to_string()),
            )
            .build()
    }

    #[test]
    fn salts_are_fresh_per_encoding() {
        let data = two_element_data();
        let mut rng = rand::thread_rng();

        let first = generate_issuer_name_spaces(&data, &mut rng).unwrap();
        let second = generate_issuer_name_spaces(&data, &mut rng).unwrap();

        let salts = |spaces: &IssuerNameSpaces| {
            spaces["org.iso.7367.1"].iter().map(|i| i.inner.random.clone()).collect::<Vec<_>>()
        };
        for (a, b) in salts(&first).iter().zip(salts(&second)) {
            assert_ne!(*a, b, "identical input must still draw fresh salts");
        }
    }

    #[test]
    fn salts_unique_across_ten_thousand_items() {
        let mut builder = NameSpacedData::builder();
        for i in 0..10_000 {
            builder = builder.put_entry("ns", format!("element_{i}"), Value::Integer(i.into()));
        }
        let data = builder.build();

        let mut rng = rand::thread_rng();
        let name_spaces = generate_issuer_name_spaces(&data, &mut rng).unwrap();

        let mut seen = HashSet::new();
        for item in &name_spaces["ns"] {
            assert_eq!(item.inner.random.len(), SALT_LEN);
            assert!(seen.insert(item.inner.random.clone()), "salt repeated within a run");
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let data = two_element_data();

        let first = generate_issuer_name_spaces(&data, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = generate_issuer_name_spaces(&data, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn digests_match_tagged_encoding() {
        let data = two_element_data();
        let mut rng = StdRng::seed_from_u64(7);

        let name_spaces = generate_issuer_name_spaces(&data, &mut rng).unwrap();
        let items = &name_spaces["org.iso.7367.1"];
        let digests =
            calculate_digests_for_name_space(items, DigestAlgorithm::Sha256).unwrap();

        assert_eq!(digests.len(), 2);
        for item in items {
            let expected = DigestAlgorithm::Sha256.digest(&item.to_vec().unwrap());
            assert_eq!(digests[&item.inner.digest_id].as_slice(), expected.as_slice());
        }
    }

    #[test]
    fn duplicate_digest_id_is_rejected() {
        let item = |id| {
            Tag24::new(IssuerSignedItem {
                digest_id: id,
                random: ByteBuf::from(vec![0u8; SALT_LEN]),
                element_identifier: "family_name".to_string(),
                element_value: Value::Text("Smith".to_string()),
            })
        };
        let err = calculate_digests_for_name_space(
            &[item(1), item(1)],
            DigestAlgorithm::Sha256,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }
}
