//! # Display
//!
//! The consumption half of the pipeline: parse a credential payload back
//! into per-namespace items, match each element against the document-type
//! schema, and project it into a typed display representation.
//!
//! Rendering is read-only and side-effect-free. Structural failures at the
//! payload level are fatal; a single element that cannot be decoded or that
//! is absent from the schema degrades to a best-effort textual rendering and
//! never blocks the rest of the document.

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use ciborium::Value;
use coset::{CborSerializable, CoseSign1};
use indexmap::IndexMap;

use crate::cbor::Tag24;
use crate::doctype::{
    DocumentAttribute, DocumentAttributeType, DocumentTypeRepository, MdocDocumentType,
};
use crate::error::{Error, Result};
use crate::mdoc::{IssuerSignedItem, StaticAuthData};
use crate::mso::MobileSecurityObject;

/// A credential held by the wallet, dispatched once at the top of the
/// consumption path.
#[derive(Clone, Debug)]
pub enum Credential {
    /// An mdoc credential: a base64url-encoded payload of salted items plus
    /// the issuer signature.
    Mdoc(MdocCredential),

    /// A disclosure-based verifiable credential in compact serialization:
    /// `<issuer-signed JWT>~<disclosure>~...`.
    Disclosure(DisclosureCredential),
}

/// The issuer-provided data of an mdoc credential.
#[derive(Clone, Debug)]
pub struct MdocCredential {
    /// The payload as issued, base64url-encoded.
    pub issuer_provided_data: String,
}

/// The issuer-provided data of a disclosure-based credential.
#[derive(Clone, Debug)]
pub struct DisclosureCredential {
    /// The verifiable credential type, used for schema lookup.
    pub vct: String,

    /// The compact serialization: issuer-signed JWT and `~`-separated
    /// disclosures.
    pub issued: String,
}

/// Human-readable information about a document, keyed by element identifier
/// in encounter order. Produced per rendering request, never persisted.
#[derive(Clone, Debug, Default)]
pub struct DocumentDetails {
    /// One display attribute per data element.
    pub attributes: IndexMap<String, DisplayAttribute>,
}

/// Typed display projection of one data element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayAttribute {
    /// Plain text.
    PlainText {
        /// Display name.
        name: String,
        /// Rendered text.
        text: String,
    },

    /// Structured markup for composite values.
    Html {
        /// Display name.
        name: String,
        /// Rendered markup.
        html: String,
    },

    /// Bitmap image, e.g. a portrait. Decoding the bytes into pixels is the
    /// presentation layer's concern.
    Image {
        /// Display name.
        name: String,
        /// The raw image bytes.
        image: Vec<u8>,
    },
}

impl DisplayAttribute {
    /// The attribute's display name.
    pub fn name(&self) -> &str {
        match self {
            Self::PlainText { name, .. } | Self::Html { name, .. } | Self::Image { name, .. } => {
                name
            }
        }
    }
}

/// Strings substituted for boolean values when rendering.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Display string for `true`.
    pub true_text: String,

    /// Display string for `false`.
    pub false_text: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { true_text: "Yes".to_string(), false_text: "No".to_string() }
    }
}

impl Credential {
    /// Project the credential's data elements into display attributes,
    /// resolving display names and semantic types against `repository`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPayload` if the payload's top-level
    /// structure or its security object cannot be decoded. Per-element
    /// failures degrade to diagnostic text and are never surfaced.
    #[tracing::instrument(skip_all)]
    pub fn render_details(
        &self, repository: &DocumentTypeRepository, options: &RenderOptions,
    ) -> Result<DocumentDetails> {
        match self {
            Self::Mdoc(credential) => render_mdoc(credential, repository, options),
            Self::Disclosure(credential) => render_disclosure(credential, repository),
        }
    }
}

fn render_mdoc(
    credential: &MdocCredential, repository: &DocumentTypeRepository, options: &RenderOptions,
) -> Result<DocumentDetails> {
    let auth_data = StaticAuthData::from_base64url(&credential.issuer_provided_data)?;

    let cose_sign1 = CoseSign1::from_slice(&auth_data.issuer_auth)
        .map_err(|e| Error::MalformedPayload(format!("issuer auth: {e}")))?;
    let payload = cose_sign1
        .payload
        .ok_or_else(|| Error::MalformedPayload("issuer auth has no payload".to_string()))?;
    let mso: Tag24<MobileSecurityObject> = crate::cbor::from_slice(&payload)
        .map_err(|e| Error::MalformedPayload(format!("security object: {e}")))?;
    let mso = mso.inner;

    let mdoc_type =
        repository.get_document_type_for_mdoc(&mso.doc_type).and_then(|dt| dt.mdoc.as_ref());

    let mut attributes = IndexMap::new();
    for name_space in mso.value_digests.keys() {
        let items = auth_data
            .digest_id_mapping
            .get(name_space)
            .map_or(&[] as &[Value], Vec::as_slice);
        visit_name_space(&mut attributes, mdoc_type, name_space, items, options);
    }

    Ok(DocumentDetails { attributes })
}

fn visit_name_space(
    attributes: &mut IndexMap<String, DisplayAttribute>, mdoc_type: Option<&MdocDocumentType>,
    name_space: &str, items: &[Value], options: &RenderOptions,
) {
    for (index, value) in items.iter().enumerate() {
        let item = match Tag24::<IssuerSignedItem>::try_from(value.clone()) {
            Ok(item) => item.inner,
            Err(e) => {
                // one corrupt item degrades only itself
                let err = Error::ElementDecode(e.to_string());
                tracing::warn!(name_space, index, "{err}");
                let key = format!("{name_space}[{index}]");
                attributes.insert(
                    key.clone(),
                    DisplayAttribute::PlainText { name: key, text: diagnostic(value) },
                );
                continue;
            }
        };

        let attribute =
            mdoc_type.and_then(|mt| mt.data_element(name_space, &item.element_identifier));
        let display = match attribute {
            Some(attribute) => render_element(attribute, &item.element_value, options),
            None => {
                // unknown elements degrade to a diagnostic dump, never dropped
                DisplayAttribute::PlainText {
                    name: item.element_identifier.clone(),
                    text: diagnostic(&item.element_value),
                }
            }
        };
        attributes.insert(item.element_identifier, display);
    }
}

fn render_element(
    attribute: &DocumentAttribute, value: &Value, options: &RenderOptions,
) -> DisplayAttribute {
    let name = attribute.display_name.clone();
    match attribute.attribute_type {
        DocumentAttributeType::Picture => match value.as_bytes() {
            Some(bytes) => DisplayAttribute::Image { name, image: bytes.clone() },
            // not a byte string: fall through to the plain-text formatter
            None => DisplayAttribute::PlainText { name, text: render_plain(value, options) },
        },
        DocumentAttributeType::ComplexType => {
            DisplayAttribute::Html { name, html: render_structured(value) }
        }
        _ => DisplayAttribute::PlainText { name, text: render_plain(value, options) },
    }
}

/// Type-directed plain-text formatter for scalar values.
fn render_plain(value: &Value, options: &RenderOptions) -> String {
    match value {
        Value::Bool(true) => options.true_text.clone(),
        Value::Bool(false) => options.false_text.clone(),
        Value::Text(text) => text.clone(),
        Value::Integer(i) => i128::from(*i).to_string(),
        Value::Float(f) => f.to_string(),
        Value::Tag(0 | 1004, _) => date_string(value).unwrap_or_else(|| diagnostic(value)),
        _ => diagnostic(value),
    }
}

/// Structured markup for composite values: one `<div>` per entry, labels
/// title-cased from their snake_case identifiers, entries in encoded order.
fn render_structured(value: &Value) -> String {
    let mut html = String::new();
    match value {
        Value::Map(entries) => {
            for (key, entry) in entries {
                let label = key.as_text().map_or_else(|| diagnostic(key), title_case);
                html.push_str(&format!("<div>{label}: {}</div>", render_sub_value(entry)));
            }
        }
        Value::Array(entries) => {
            // a category list: each entry rendered in turn
            for entry in entries {
                if entry.is_map() {
                    html.push_str(&render_structured(entry));
                } else {
                    html.push_str(&format!("<div>{}</div>", render_sub_value(entry)));
                }
            }
        }
        _ => html.push_str(&format!("<div>{}</div>", diagnostic(value))),
    }
    html
}

fn render_sub_value(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Integer(i) => i128::from(*i).to_string(),
        Value::Float(f) => f.to_string(),
        Value::Tag(0 | 1004, _) => date_string(value).unwrap_or_else(|| diagnostic(value)),
        Value::Array(entries) => {
            entries.iter().map(render_sub_value).collect::<Vec<_>>().join(", ")
        }
        _ => diagnostic(value),
    }
}

/// Locale-free calendar-date string for tdate (tag 0) and full-date
/// (tag 1004) values.
fn date_string(value: &Value) -> Option<String> {
    match value {
        Value::Tag(1004, inner) => inner.as_text().map(ToString::to_string),
        Value::Tag(0, inner) => {
            let text = inner.as_text()?;
            Some(text.split('T').next().unwrap_or(text).to_string())
        }
        _ => None,
    }
}

/// Best-effort textual dump of an arbitrary data item. Byte strings print a
/// length marker rather than their content.
fn diagnostic(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i128::from(*i).to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(text) => format!("\"{text}\""),
        Value::Bytes(bytes) => format!("[{} bytes]", bytes.len()),
        Value::Array(entries) => {
            format!("[{}]", entries.iter().map(diagnostic).collect::<Vec<_>>().join(", "))
        }
        Value::Map(entries) => {
            let body = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", diagnostic(k), diagnostic(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
        Value::Tag(tag, inner) => format!("{tag}({})", diagnostic(inner)),
        _ => "?".to_string(),
    }
}

/// `vehicle_category_code` -> `Vehicle Category Code`.
fn title_case(input: &str) -> String {
    input
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_disclosure(
    credential: &DisclosureCredential, repository: &DocumentTypeRepository,
) -> Result<DocumentDetails> {
    let vc_type =
        repository.get_document_type_for_vc(&credential.vct).and_then(|dt| dt.vc.as_ref());

    let mut attributes = IndexMap::new();
    let mut parts = credential.issued.split('~');
    // first segment is the issuer-signed JWT
    parts.next();

    for (index, part) in parts.enumerate() {
        if part.is_empty() || part.contains('.') {
            // list terminator or key-binding JWT, not a disclosure
            continue;
        }
        match decode_disclosure(part) {
            Ok((claim_name, content)) => {
                let display_name = vc_type
                    .and_then(|vc| vc.claims.get(&claim_name))
                    .map_or(claim_name.clone(), |claim| claim.display_name.clone());
                attributes.insert(
                    claim_name,
                    DisplayAttribute::PlainText { name: display_name, text: content },
                );
            }
            Err(e) => {
                tracing::warn!(index, "undecodable disclosure: {e}");
                let key = format!("disclosure[{index}]");
                attributes.insert(
                    key.clone(),
                    DisplayAttribute::PlainText { name: key, text: part.to_string() },
                );
            }
        }
    }

    Ok(DocumentDetails { attributes })
}

/// Decode one `[salt, claim name, value]` disclosure.
fn decode_disclosure(part: &str) -> Result<(String, String)> {
    let decode_err = |detail: String| Error::ElementDecode(format!("disclosure: {detail}"));

    let bytes =
        Base64::decode_vec(part).map_err(|e| decode_err(format!("invalid base64url: {e}")))?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|e| decode_err(e.to_string()))?;
    let [_salt, name, value] = entries.as_slice() else {
        return Err(decode_err("expected a three-element array".to_string()));
    };
    let name = name
        .as_str()
        .ok_or_else(|| decode_err("claim name is not a string".to_string()))?
        .to_string();
    let content = match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Ok((name, content))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::doctype::known::{driving_license, vehicle_registration};
    use crate::doctype::DocumentTypeRepository;

    fn repository() -> DocumentTypeRepository {
        let mut repository = DocumentTypeRepository::new();
        repository.add_document_type(vehicle_registration::document_type());
        repository.add_document_type(driving_license::document_type());
        repository
    }

    fn vrc_schema(repo: &DocumentTypeRepository) -> &MdocDocumentType {
        repo.get_document_type_for_mdoc(vehicle_registration::VRC_DOCTYPE)
            .unwrap()
            .mdoc
            .as_ref()
            .unwrap()
    }

    #[test]
    fn composite_renders_labels_and_joined_numbers() {
        let value = Value::Map(vec![
            (Value::Text("vehicle_category_code".to_string()), Value::Text("M1".to_string())),
            (
                Value::Text("colours".to_string()),
                Value::Array(vec![Value::Integer(4.into()), Value::Integer(9.into())]),
            ),
        ]);
        let html = render_structured(&value);
        assert!(html.contains("Vehicle Category Code: M1"));
        assert!(html.contains("Colours: 4, 9"));
    }

    #[test]
    fn category_list_renders_each_entry() {
        let value = Value::Array(vec![Value::Map(vec![
            (Value::Text("vehicle_category_code".to_string()), Value::Text("B".to_string())),
            (
                Value::Text("issue_date".to_string()),
                Value::Tag(1004, Box::new(Value::Text("2018-08-09".to_string()))),
            ),
        ])]);
        let html = render_structured(&value);
        assert!(html.contains("Vehicle Category Code: B"));
        assert!(html.contains("Issue Date: 2018-08-09"));
    }

    #[test]
    fn plain_formats_by_type() {
        let options = RenderOptions::default();
        assert_eq!(render_plain(&Value::Bool(true), &options), "Yes");
        assert_eq!(render_plain(&Value::Bool(false), &options), "No");
        assert_eq!(render_plain(&Value::Integer(42.into()), &options), "42");
        assert_eq!(
            render_plain(&Value::Text("FG67 TUV".to_string()), &options),
            "FG67 TUV"
        );
        assert_eq!(
            render_plain(
                &Value::Tag(0, Box::new(Value::Text("2023-01-15T10:00:00Z".to_string()))),
                &options
            ),
            "2023-01-15"
        );
        assert_eq!(
            render_plain(
                &Value::Tag(1004, Box::new(Value::Text("2020-08-01".to_string()))),
                &options
            ),
            "2020-08-01"
        );
    }

    #[test]
    fn diagnostic_marks_binary_length() {
        assert_eq!(diagnostic(&Value::Bytes(vec![0u8; 1234])), "[1234 bytes]");
        assert_eq!(
            diagnostic(&Value::Map(vec![(
                Value::Text("k".to_string()),
                Value::Integer(1.into())
            )])),
            "{\"k\": 1}"
        );
    }

    #[test]
    fn title_cases_snake_identifiers() {
        assert_eq!(title_case("vehicle_category_code"), "Vehicle Category Code");
        assert_eq!(title_case("make"), "Make");
    }

    #[test]
    fn unknown_element_degrades_to_plain_text() {
        let repo = repository();
        let item = Tag24::new(IssuerSignedItem {
            digest_id: 1,
            random: serde_bytes::ByteBuf::from(vec![0u8; 16]),
            element_identifier: "not_in_schema".to_string(),
            element_value: Value::Text("mystery".to_string()),
        });

        let mut attributes = IndexMap::new();
        visit_name_space(
            &mut attributes,
            Some(vrc_schema(&repo)),
            vehicle_registration::VRC_NAMESPACE,
            &[item.to_value().unwrap()],
            &RenderOptions::default(),
        );

        let display = &attributes["not_in_schema"];
        assert_eq!(
            *display,
            DisplayAttribute::PlainText {
                name: "not_in_schema".to_string(),
                text: "\"mystery\"".to_string()
            }
        );
    }

    #[test]
    fn corrupt_item_degrades_without_aborting() {
        let repo = repository();
        let good = Tag24::new(IssuerSignedItem {
            digest_id: 1,
            random: serde_bytes::ByteBuf::from(vec![0u8; 16]),
            element_identifier: "registration_number".to_string(),
            element_value: Value::Text("FG67 TUV".to_string()),
        });

        let mut attributes = IndexMap::new();
        visit_name_space(
            &mut attributes,
            Some(vrc_schema(&repo)),
            vehicle_registration::VRC_NAMESPACE,
            &[Value::Text("not an item".to_string()), good.to_value().unwrap()],
            &RenderOptions::default(),
        );

        assert_eq!(attributes.len(), 2);
        assert!(attributes.contains_key("org.iso.7367.1[0]"));
        assert_eq!(
            attributes["registration_number"],
            DisplayAttribute::PlainText {
                name: "Vehicle Registration Number".to_string(),
                text: "FG67 TUV".to_string()
            }
        );
    }

    #[test]
    fn picture_attribute_yields_image() {
        let repo = repository();
        let schema = repo
            .get_document_type_for_mdoc(driving_license::MDL_DOCTYPE)
            .unwrap()
            .mdoc
            .as_ref()
            .unwrap();
        let attribute = schema.data_element(driving_license::MDL_NAMESPACE, "portrait").unwrap();

        let display = render_element(
            attribute,
            &Value::Bytes(vec![0xff, 0xd8, 0xff]),
            &RenderOptions::default(),
        );
        assert_eq!(
            display,
            DisplayAttribute::Image {
                name: "Photo of Holder".to_string(),
                image: vec![0xff, 0xd8, 0xff]
            }
        );

        // a non-bstr portrait falls through to plain text
        let fallback =
            render_element(attribute, &Value::Text("oops".to_string()), &RenderOptions::default());
        assert!(matches!(fallback, DisplayAttribute::PlainText { .. }));
    }

    #[test]
    fn disclosure_credential_renders_display_names() {
        let disclosure = |name: &str, value: &str| {
            Base64::encode_string(
                serde_json::to_string(&serde_json::json!(["salt-123", name, value]))
                    .unwrap()
                    .as_bytes(),
            )
        };
        let issued = format!(
            "eyJhbGciOiJFUzI1NiJ9.e30.sig~{}~{}~",
            disclosure("registration_number", "FG67 TUV"),
            disclosure("unlisted_claim", "value")
        );

        let credential = Credential::Disclosure(DisclosureCredential {
            vct: vehicle_registration::VRC_VCT.to_string(),
            issued,
        });
        let details =
            credential.render_details(&repository(), &RenderOptions::default()).unwrap();

        assert_eq!(
            details.attributes["registration_number"],
            DisplayAttribute::PlainText {
                name: "Vehicle Registration Number".to_string(),
                text: "FG67 TUV".to_string()
            }
        );
        // schema miss keeps the claim name
        assert_eq!(details.attributes["unlisted_claim"].name(), "unlisted_claim");
    }
}
