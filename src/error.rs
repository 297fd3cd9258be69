//! # Errors
//!
//! Failures are split along the propagation boundary they cross: structural
//! failures during issuance or payload parsing abort the whole operation,
//! while a single element that cannot be decoded is absorbed by the renderer
//! and surfaced only as a degraded display value.

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while issuing or consuming a credential.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential could not be assembled. Covers digest ID collisions,
    /// an invalid validity window, and namespaces unknown to the document
    /// type schema. Aborts issuance.
    #[error("construction failed: {0}")]
    Construction(String),

    /// The issuer signature could not be produced, either because the
    /// declared algorithm is unsupported or the signing resource failed.
    /// Aborts issuance.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The top-level payload structure is not a well-formed credential.
    /// Fatal for the whole parse.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// One item inside an otherwise well-formed namespace could not be
    /// decoded. Degrades that element to a diagnostic rendering; never
    /// surfaced from the rendering entry points.
    #[error("element could not be decoded: {0}")]
    ElementDecode(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = Error::Construction("digest ID collision".to_string());
        assert_eq!(err.to_string(), "construction failed: digest ID collision");
    }
}
