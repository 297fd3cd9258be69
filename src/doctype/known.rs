//! Well-known document types, as declarative schema data.

pub mod driving_license;
pub mod vehicle_registration;
