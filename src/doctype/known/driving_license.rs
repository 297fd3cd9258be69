//! Mobile driving license document type. A reduced element set: enough to
//! exercise the image and category-list rendering paths.

use ciborium::Value;

use crate::doctype::{DocumentAttributeType, DocumentType};

/// Namespace for mDL data elements.
pub const MDL_NAMESPACE: &str = "org.iso.18013.5.1";

/// Doc type of the mdoc rendition.
pub const MDL_DOCTYPE: &str = "org.iso.18013.5.1.mDL";

fn full_date(date: &str) -> Value {
    Value::Tag(1004, Box::new(Value::Text(date.to_string())))
}

/// Build the Driving License document type.
pub fn document_type() -> DocumentType {
    DocumentType::builder("Driving License")
        .add_mdoc_document_type(MDL_DOCTYPE)
        .add_attribute(
            DocumentAttributeType::String,
            "family_name",
            "Family Name",
            "Last name, surname, or primary identifier, of the license holder",
            true,
            MDL_NAMESPACE,
            Some(Value::Text("Mustermann".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "given_name",
            "Given Names",
            "First name(s), other name(s), or secondary identifier, of the license holder",
            true,
            MDL_NAMESPACE,
            Some(Value::Text("Erika".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::Date,
            "birth_date",
            "Date of Birth",
            "Day, month and year on which the license holder was born",
            true,
            MDL_NAMESPACE,
            Some(full_date("1971-09-01")),
        )
        .add_attribute(
            DocumentAttributeType::Picture,
            "portrait",
            "Photo of Holder",
            "A reproduction of the license holder's portrait",
            true,
            MDL_NAMESPACE,
            None,
        )
        .add_attribute(
            DocumentAttributeType::Picture,
            "signature_usual_mark",
            "Signature / Usual Mark",
            "Image of the signature or usual mark of the license holder",
            false,
            MDL_NAMESPACE,
            None,
        )
        .add_attribute(
            DocumentAttributeType::ComplexType,
            "driving_privileges",
            "Driving Privileges",
            "Driving privileges of the license holder",
            true,
            MDL_NAMESPACE,
            Some(Value::Array(vec![Value::Map(vec![
                (Value::Text("vehicle_category_code".to_string()), Value::Text("B".to_string())),
                (Value::Text("issue_date".to_string()), full_date("2018-08-09")),
                (Value::Text("expiry_date".to_string()), full_date("2028-09-01")),
            ])])),
        )
        .add_attribute(
            DocumentAttributeType::Boolean,
            "age_over_18",
            "Older Than 18 Years",
            "Indication whether the license holder is as old or older than 18",
            false,
            MDL_NAMESPACE,
            Some(Value::Bool(true)),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "un_distinguishing_sign",
            "UN Distinguishing Sign",
            "Distinguishing sign of the issuing country",
            true,
            MDL_NAMESPACE,
            Some(Value::Text("D".to_string())),
        )
        .build()
}
