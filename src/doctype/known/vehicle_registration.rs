//! Vehicle Registration Certificate document type.

use ciborium::Value;

use crate::doctype::{DocumentAttributeType, DocumentType};

/// Namespace for the common vehicle registration elements.
pub const VRC_NAMESPACE: &str = "org.iso.7367.1";

/// Namespace for the issuing-authority elements.
pub const VRC_NAMESPACE2: &str = "org.iso.23220.1";

/// Doc type of the mdoc rendition.
pub const VRC_DOCTYPE: &str = "org.iso.7367.1.mVRC";

/// Type of the verifiable credential rendition.
pub const VRC_VCT: &str = "urn:eu.europa.ec.eudi:vehicle_registration:1";

fn full_date(date: &str) -> Value {
    Value::Tag(1004, Box::new(Value::Text(date.to_string())))
}

/// Build the Vehicle Registration document type.
pub fn document_type() -> DocumentType {
    DocumentType::builder("Vehicle Registration")
        .add_mdoc_document_type(VRC_DOCTYPE)
        .add_vc_document_type(VRC_VCT)
        .add_attribute(
            DocumentAttributeType::String,
            "registration_number",
            "Vehicle Registration Number",
            "The common vehicle registration information, including UN/EU elements, A and H",
            true,
            VRC_NAMESPACE,
            Some(Value::Text("FG67 TUV".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::Date,
            "date_of_registration",
            "Date of Registration",
            "Date when the document was registered",
            true,
            VRC_NAMESPACE,
            Some(full_date("2024-05-01")),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "vehicle_identification_number",
            "Vehicle Identification Number",
            "Vehicle identification number defined by the vehicle manufacturer",
            true,
            VRC_NAMESPACE,
            Some(Value::Text("1234432112344321".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::ComplexType,
            "vehicle_holder",
            "Vehicle Holder",
            "The vehicle holder information",
            true,
            VRC_NAMESPACE,
            Some(Value::Map(vec![
                (Value::Text("given_name_unicode".to_string()), Value::Text("John".to_string())),
                (Value::Text("family_name_unicode".to_string()), Value::Text("Smith".to_string())),
                (Value::Text("resident_address".to_string()), Value::Text("Sample Street".to_string())),
                (Value::Text("resident_city".to_string()), Value::Text("Sample City".to_string())),
                (Value::Text("resident_country".to_string()), Value::Text("ZZ".to_string())),
                (Value::Text("resident_postal_code".to_string()), Value::Text("12345".to_string())),
            ])),
        )
        .add_attribute(
            DocumentAttributeType::ComplexType,
            "basic_vehicle_info",
            "Basic Vehicle Info",
            "Basic vehicle information of the vehicle",
            true,
            VRC_NAMESPACE,
            Some(Value::Map(vec![
                (Value::Text("vehicle_category_code".to_string()), Value::Text("M1".to_string())),
                (Value::Text("type_approval_number".to_string()), Value::Text("e1-test".to_string())),
                (Value::Text("make".to_string()), Value::Text("OPEL".to_string())),
                (Value::Text("commercial_name".to_string()), Value::Text("MITSU".to_string())),
                (
                    Value::Text("colours".to_string()),
                    Value::Array(vec![Value::Integer(4.into()), Value::Integer(9.into())]),
                ),
            ])),
        )
        .add_attribute(
            DocumentAttributeType::ComplexType,
            "mass_info",
            "Mass Info",
            "The mass information of the vehicle",
            true,
            VRC_NAMESPACE,
            Some(Value::Map(vec![
                (Value::Text("unit".to_string()), Value::Text("kg".to_string())),
                (Value::Text("techn_perm_max_laden_mass".to_string()), Value::Integer(1290.into())),
                (Value::Text("vehicle_max_mass".to_string()), Value::Integer(1150.into())),
                (Value::Text("whole_vehicle_max_mass".to_string()), Value::Integer(2500.into())),
                (Value::Text("mass_in_running_order".to_string()), Value::Integer(920.into())),
            ])),
        )
        .add_attribute(
            DocumentAttributeType::ComplexType,
            "engine_info",
            "Engine Info",
            "The engine information of the vehicle",
            true,
            VRC_NAMESPACE,
            Some(Value::Map(vec![
                (Value::Text("engine_capacity".to_string()), Value::Integer(999.into())),
                (Value::Text("engine_power".to_string()), Value::Integer(52.into())),
                (
                    Value::Text("energy_source".to_string()),
                    Value::Array(vec![Value::Integer(15.into())]),
                ),
            ])),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "un_distinguishing_sign",
            "UN Distinguishing Sign",
            "The UN distinguishing sign of the vehicle",
            true,
            VRC_NAMESPACE,
            Some(Value::Text("NLD".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "issuing_authority_unicode",
            "Issuing Authority",
            "The issuing authority of the document",
            true,
            VRC_NAMESPACE2,
            Some(Value::Text("GJVLA".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "issuing_country",
            "Issuing Country",
            "The issuing country of the document",
            true,
            VRC_NAMESPACE2,
            Some(Value::Text("GB".to_string())),
        )
        .add_attribute(
            DocumentAttributeType::Date,
            "issue_date",
            "Issue Date",
            "The date the document was issued",
            true,
            VRC_NAMESPACE2,
            Some(full_date("2023-01-15")),
        )
        .add_attribute(
            DocumentAttributeType::Date,
            "expiry_date",
            "Expiry Date",
            "The date the document expires",
            true,
            VRC_NAMESPACE2,
            Some(full_date("2027-07-07")),
        )
        .add_attribute(
            DocumentAttributeType::String,
            "document_number",
            "Document Number",
            "The document number",
            true,
            VRC_NAMESPACE2,
            Some(Value::Text("54242680014".to_string())),
        )
        .build()
}
