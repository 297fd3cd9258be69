//! # Mdoc Credentials
//!
//! Issue and display mobile document (mdoc) style verifiable credentials:
//! namespaced attribute data that is selectively disclosable, digest-bound,
//! and cryptographically signed by an issuer (ISO/IEC 18013-5 family).
//!
//! The library covers the two halves of the pipeline that share the wire
//! format:
//!
//! - **issuance** ([`issue`]): salt and digest each attribute independently,
//!   assemble a Mobile Security Object binding those digests to the holder's
//!   authentication key, sign it, and package everything into a base64url
//!   payload;
//! - **display** ([`Credential::render_details`]): parse that payload,
//!   resolve each element against a document-type schema, and project it
//!   into typed display attributes, degrading gracefully for unknown or
//!   corrupt elements.
//!
//! Signing keys, certificate chains and schemas are supplied by the caller
//! through the [`provider`] and [`doctype`] seams; the library never loads
//! or persists them itself.

pub mod cbor;
pub mod cose_key;
pub mod display;
pub mod doctype;
mod error;
pub mod issue;
pub mod mdoc;
pub mod mso;
pub mod provider;

pub use self::cbor::Tag24;
pub use self::cose_key::CoseKey;
pub use self::display::{
    Credential, DisclosureCredential, DisplayAttribute, DocumentDetails, MdocCredential,
    RenderOptions,
};
pub use self::doctype::{DocumentType, DocumentTypeRepository};
pub use self::error::{Error, Result};
pub use self::issue::issue;
pub use self::mdoc::{IssuerSignedItem, NameSpacedData, StaticAuthData};
pub use self::mso::{DigestAlgorithm, MobileSecurityObject};
pub use self::provider::{Algorithm, Resources, Signer};
