//! Structured record returned by the LLM (or loaded from a JSON fixture).
//!
//! Language models answer with loosely-typed JSON: IDs arrive as numbers,
//! addresses as either a line or an object, keys are optional. The record is
//! deserialised once into typed fields here so the rest of the pipeline never
//! inspects raw JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// Government ID families with their own number formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Aadhaar,
    Pan,
    VoterId,
    Ration,
    BirthCertificate,
}

impl DocumentKind {
    /// Classify a free-form `DocumentType` label (e.g. "Aadhaar Card",
    /// "PAN", "Voter ID"). Checked in a fixed order; first hit wins.
    pub fn classify(label: &str) -> Option<Self> {
        let upper = label.to_uppercase();
        if upper.contains("AADHAAR") || upper.contains("ADHAR") {
            Some(DocumentKind::Aadhaar)
        } else if upper.contains("PAN") {
            Some(DocumentKind::Pan)
        } else if upper.contains("VOTER") {
            Some(DocumentKind::VoterId)
        } else if upper.contains("RATION") {
            Some(DocumentKind::Ration)
        } else if upper.contains("BIRTH") {
            Some(DocumentKind::BirthCertificate)
        } else {
            None
        }
    }
}

/// Address as either a single line or labelled parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Line(String),
    Parts(AddressParts),
}

impl Address {
    /// Render as a single comma-separated line, skipping empty parts.
    pub fn to_line(&self) -> String {
        match self {
            Address::Line(s) => s.trim().to_string(),
            Address::Parts(p) => p.to_line(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    #[serde(rename = "HouseNo", default, deserialize_with = "lenient_string")]
    pub house_no: Option<String>,
    #[serde(rename = "Street", default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(rename = "Locality", default, deserialize_with = "lenient_string")]
    pub locality: Option<String>,
    #[serde(rename = "City", default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(rename = "State", default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(
        rename = "Pincode",
        alias = "PinCode",
        default,
        deserialize_with = "lenient_string"
    )]
    pub pincode: Option<String>,
}

impl AddressParts {
    pub fn to_line(&self) -> String {
        [
            &self.house_no,
            &self.street,
            &self.locality,
            &self.city,
            &self.state,
            &self.pincode,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// One document as described by the LLM, keyed the way the prompt asks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrRecord {
    #[serde(rename = "DocumentType", default, deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "FatherName", default, deserialize_with = "lenient_string")]
    pub father_name: Option<String>,
    #[serde(rename = "DOB", default, deserialize_with = "lenient_string")]
    pub dob: Option<String>,
    #[serde(rename = "Gender", default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(rename = "AadhaarNo", default, deserialize_with = "lenient_string")]
    pub aadhaar_no: Option<String>,
    #[serde(rename = "VID", default, deserialize_with = "lenient_string")]
    pub vid: Option<String>,
    #[serde(rename = "PAN_Number", default, deserialize_with = "lenient_string")]
    pub pan_number: Option<String>,
    #[serde(rename = "EPIC_Number", default, deserialize_with = "lenient_string")]
    pub epic_number: Option<String>,
    #[serde(rename = "RationCardNo", default, deserialize_with = "lenient_string")]
    pub ration_card_no: Option<String>,
    #[serde(rename = "RegistrationNo", default, deserialize_with = "lenient_string")]
    pub registration_no: Option<String>,
    #[serde(
        rename = "ID_Number",
        alias = "IDNumber",
        default,
        deserialize_with = "lenient_string"
    )]
    pub id_number: Option<String>,
    #[serde(rename = "Address", default)]
    pub address: Option<Address>,
    #[serde(rename = "Age", default, deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(rename = "Mobile", default, deserialize_with = "lenient_string")]
    pub mobile: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(rename = "State", default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(rename = "District", default, deserialize_with = "lenient_string")]
    pub district: Option<String>,
    #[serde(rename = "City", default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(rename = "PIN", default, deserialize_with = "lenient_string")]
    pub pin: Option<String>,
    #[serde(rename = "POI", default, deserialize_with = "lenient_string")]
    pub poi: Option<String>,
    #[serde(rename = "POA", default, deserialize_with = "lenient_string")]
    pub poa: Option<String>,
    #[serde(rename = "PDB", default, deserialize_with = "lenient_string")]
    pub pdb: Option<String>,
}

impl OcrRecord {
    pub fn kind(&self) -> Option<DocumentKind> {
        self.document_type.as_deref().and_then(DocumentKind::classify)
    }
}

/// Accept strings, numbers and booleans; map null and empty strings to `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
