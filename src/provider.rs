//! # Providers
//!
//! Traits implementers use to supply the capabilities the issuance pipeline
//! depends on but does not own: the issuer's signing key and certificate
//! chain, and named resources such as PEM-encoded key material. Keys are
//! opaque external resources; the core never loads, parses, or persists them.

use std::fmt::Display;
use std::future::Future;

/// Result type for external provider errors.
pub type Result<T> = anyhow::Result<T>;

/// Signer is used by implementers to produce the issuer signature over the
/// security object. Signing may be delegated to a hardware-backed key, hence
/// the async seam.
pub trait Signer: Send + Sync {
    /// The algorithm the signer's key supports. Declaring an algorithm the
    /// core cannot map to a COSE identifier aborts issuance.
    fn algorithm(&self) -> Algorithm;

    /// The issuer certificate chain, leaf first, each certificate DER-encoded.
    /// Attached to the signature's unprotected header.
    fn certificate_chain(&self) -> Vec<Vec<u8>>;

    /// Sign the message with the issuer's private key.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Resources yields named, text-encoded resources (typically PEM-encoded
/// signing certificates and keys) to `Signer` implementations. The core
/// consumes key material only through [`Signer`].
pub trait Resources: Send + Sync {
    /// Look up a string resource by name. `None` if the resource does not
    /// exist.
    fn get_string(&self, name: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Signature algorithm declared by a [`Signer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// ECDSA with SHA-256 on the P-256 curve.
    Es256,

    /// EdDSA on the Ed25519 curve.
    EdDsa,

    /// ECDSA on the secp256k1 curve. Declared by some keyrings but outside
    /// this wire format's profile.
    Es256K,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Es256 => write!(f, "ES256"),
            Self::EdDsa => write!(f, "EdDSA"),
            Self::Es256K => write!(f, "ES256K"),
        }
    }
}
