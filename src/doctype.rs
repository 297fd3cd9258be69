//! # Document types
//!
//! A document-type schema maps a document or credential type to namespaces,
//! each namespace to data elements, and each element to a display name,
//! semantic type and mandatory flag. Schemas are declarative data: built
//! once, shared read-only, never mutated after load.

pub mod known;

use indexmap::IndexMap;

use crate::mdoc::NameSpace;

/// A repository of document types the consumption path can resolve
/// credentials against. Process-wide, loaded once.
#[derive(Debug, Default)]
pub struct DocumentTypeRepository {
    document_types: Vec<DocumentType>,
}

impl DocumentTypeRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document type.
    pub fn add_document_type(&mut self, document_type: DocumentType) {
        self.document_types.push(document_type);
    }

    /// Resolve a document type by its mdoc doc type, e.g.
    /// `"org.iso.7367.1.mVRC"`.
    pub fn get_document_type_for_mdoc(&self, doc_type: &str) -> Option<&DocumentType> {
        self.document_types
            .iter()
            .find(|dt| dt.mdoc.as_ref().is_some_and(|m| m.doc_type == doc_type))
    }

    /// Resolve a document type by its verifiable credential type.
    pub fn get_document_type_for_vc(&self, vct: &str) -> Option<&DocumentType> {
        self.document_types.iter().find(|dt| dt.vc.as_ref().is_some_and(|v| v.vct == vct))
    }
}

/// One document type: a human-readable name plus its mdoc and/or VC schema.
#[derive(Clone, Debug)]
pub struct DocumentType {
    /// Human-readable type name, e.g. `"DVLA Vehicle Registration"`.
    pub display_name: String,

    /// The mdoc rendition of this document type, if any.
    pub mdoc: Option<MdocDocumentType>,

    /// The VC rendition of this document type, if any.
    pub vc: Option<VcDocumentType>,
}

impl DocumentType {
    /// Start building a document type.
    pub fn builder(display_name: impl Into<String>) -> DocumentTypeBuilder {
        DocumentTypeBuilder {
            display_name: display_name.into(),
            mdoc_doc_type: None,
            vc_vct: None,
            name_spaces: IndexMap::new(),
            claims: IndexMap::new(),
        }
    }
}

/// The mdoc schema of a document type: namespaces mapping element
/// identifiers to attributes, in declaration order.
#[derive(Clone, Debug)]
pub struct MdocDocumentType {
    /// The mdoc doc type identifier.
    pub doc_type: String,

    /// Data elements by namespace and identifier.
    pub name_spaces: IndexMap<NameSpace, IndexMap<String, DocumentAttribute>>,
}

impl MdocDocumentType {
    /// Look up the attribute for `(name_space, identifier)`.
    pub fn data_element(&self, name_space: &str, identifier: &str) -> Option<&DocumentAttribute> {
        self.name_spaces.get(name_space)?.get(identifier)
    }
}

/// The VC schema of a document type: claims by name.
#[derive(Clone, Debug)]
pub struct VcDocumentType {
    /// The verifiable credential type identifier.
    pub vct: String,

    /// Claims by name.
    pub claims: IndexMap<String, DocumentAttribute>,
}

/// Metadata about one data element.
#[derive(Clone, Debug)]
pub struct DocumentAttribute {
    /// The semantic type of the element's value.
    pub attribute_type: DocumentAttributeType,

    /// The element identifier, e.g. `"registration_number"`.
    pub identifier: String,

    /// Name suitable for display, e.g. `"Vehicle Registration Number"`.
    pub display_name: String,

    /// Description of the element.
    pub description: String,

    /// Whether an issuer must include this element.
    pub mandatory: bool,

    /// A representative value, for samples and previews.
    pub sample_value: Option<ciborium::Value>,
}

/// Semantic type of a data element. `Picture` and `ComplexType` drive the
/// image and structured-markup rendering paths; everything else renders as
/// plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentAttributeType {
    /// Free text.
    String,
    /// Integer or decimal number.
    Number,
    /// Calendar date.
    Date,
    /// True/false flag.
    Boolean,
    /// Bitmap image, e.g. a portrait.
    Picture,
    /// Composite value requiring structured rendering: a labeled group of
    /// sub-fields or a category list.
    ComplexType,
}

/// Builder for [`DocumentType`].
#[derive(Debug)]
pub struct DocumentTypeBuilder {
    display_name: String,
    mdoc_doc_type: Option<String>,
    vc_vct: Option<String>,
    name_spaces: IndexMap<NameSpace, IndexMap<String, DocumentAttribute>>,
    claims: IndexMap<String, DocumentAttribute>,
}

impl DocumentTypeBuilder {
    /// Declare the mdoc doc type identifier.
    #[must_use]
    pub fn add_mdoc_document_type(mut self, doc_type: impl Into<String>) -> Self {
        self.mdoc_doc_type = Some(doc_type.into());
        self
    }

    /// Declare the verifiable credential type identifier.
    #[must_use]
    pub fn add_vc_document_type(mut self, vct: impl Into<String>) -> Self {
        self.vc_vct = Some(vct.into());
        self
    }

    /// Add an attribute to both the mdoc namespace and the VC claim set.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn add_attribute(
        mut self, attribute_type: DocumentAttributeType, identifier: &str, display_name: &str,
        description: &str, mandatory: bool, name_space: &str, sample_value: Option<ciborium::Value>,
    ) -> Self {
        let attribute = DocumentAttribute {
            attribute_type,
            identifier: identifier.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            mandatory,
            sample_value,
        };
        self.claims.insert(identifier.to_string(), attribute.clone());
        self.name_spaces
            .entry(name_space.to_string())
            .or_default()
            .insert(identifier.to_string(), attribute);
        self
    }

    /// Finish building.
    pub fn build(self) -> DocumentType {
        DocumentType {
            display_name: self.display_name,
            mdoc: self.mdoc_doc_type.map(|doc_type| MdocDocumentType {
                doc_type,
                name_spaces: self.name_spaces,
            }),
            vc: self.vc_vct.map(|vct| VcDocumentType { vct, claims: self.claims }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::known::{driving_license, vehicle_registration};
    use super::*;

    #[test]
    fn resolves_mdoc_doc_type() {
        let mut repository = DocumentTypeRepository::new();
        repository.add_document_type(vehicle_registration::document_type());
        repository.add_document_type(driving_license::document_type());

        let vrc = repository
            .get_document_type_for_mdoc(vehicle_registration::VRC_DOCTYPE)
            .expect("VRC should resolve");
        let mdoc = vrc.mdoc.as_ref().unwrap();
        let attribute = mdoc
            .data_element(vehicle_registration::VRC_NAMESPACE, "registration_number")
            .expect("registration_number should be in the schema");
        assert_eq!(attribute.display_name, "Vehicle Registration Number");
        assert!(attribute.mandatory);

        assert!(repository.get_document_type_for_mdoc("org.example.nothing").is_none());
    }

    #[test]
    fn resolves_vc_type() {
        let mut repository = DocumentTypeRepository::new();
        repository.add_document_type(vehicle_registration::document_type());

        let vrc = repository
            .get_document_type_for_vc(vehicle_registration::VRC_VCT)
            .expect("VC type should resolve");
        let claims = &vrc.vc.as_ref().unwrap().claims;
        assert!(claims.contains_key("registration_number"));
    }

    #[test]
    fn attributes_keep_declaration_order() {
        let document_type = vehicle_registration::document_type();
        let mdoc = document_type.mdoc.as_ref().unwrap();
        let first = mdoc.name_spaces[vehicle_registration::VRC_NAMESPACE]
            .keys()
            .next()
            .unwrap();
        assert_eq!(first, "registration_number");
    }
}
