//! Document records → internal field set.
//!
//! Two paths converge here:
//!
//! ```text
//! LLM answer ──▶ extract_json_object ──▶ OcrRecord ──▶ normalize_record ──▶ map_record_to_fields ─┐
//! ExtractedFields (regex) ──────────────────────────────────────────────▶ fields_from_extraction ─┴▶ FieldSet
//! ```
//!
//! Both finish with the same derived keys (gender checkboxes, address parts)
//! and the form's configured defaults.

use crate::document::{Address, DocumentKind, OcrRecord};
use crate::error::StructuringError;
use crate::fields::{ExtractedFields, FieldSet, FieldValue};
use crate::form_config::FormConfig;
use crate::pipeline::map::gender_checkboxes;
use tracing::{debug, info};

/// Relation markers that never belong in an address line.
const RELATION_MARKERS: [&str; 4] = ["S/O", "D/O", "W/O", "C/O"];

/// Slice from the first `{` to the last `}` of an LLM answer.
pub fn extract_json_object(response: &str) -> Result<&str, StructuringError> {
    let start = response.find('{').ok_or(StructuringError::NoJsonObject)?;
    let end = response.rfind('}').ok_or(StructuringError::NoJsonObject)?;
    if end < start {
        return Err(StructuringError::NoJsonObject);
    }
    Ok(&response[start..=end])
}

/// Parse an LLM answer into a record.
pub fn parse_record(response: &str) -> Result<OcrRecord, StructuringError> {
    let json = extract_json_object(response)?;
    Ok(serde_json::from_str(json)?)
}

// ── Per-kind normalization ───────────────────────────────────────────────

impl DocumentKind {
    /// Canonicalise the ID numbers this document kind carries.
    pub fn normalize(self, record: &mut OcrRecord) {
        let fallback = record.id_number.clone();
        match self {
            DocumentKind::Aadhaar => {
                let raw = record.aadhaar_no.clone().or(fallback).map(|v| clean_id(&v));
                let digits: String = raw
                    .unwrap_or_default()
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect();
                // A 28-digit read is an Aadhaar number and a VID run together.
                if digits.len() >= 28 {
                    record.aadhaar_no = Some(digits[..12].to_string());
                    record.vid = Some(digits[12..28].to_string());
                } else {
                    record.aadhaar_no = non_empty(digits.chars().take(12).collect());
                }
            }
            DocumentKind::Pan => {
                let raw = record.pan_number.clone().or(fallback);
                record.pan_number = raw.and_then(|v| non_empty(alnum(&clean_id(&v), 10)));
            }
            DocumentKind::VoterId => {
                let raw = record.epic_number.clone().or(fallback);
                record.epic_number = raw.and_then(|v| non_empty(alnum(&clean_id(&v), 10)));
            }
            DocumentKind::Ration => {
                let raw = record.ration_card_no.clone().or(fallback);
                record.ration_card_no =
                    raw.and_then(|v| non_empty(alnum(&clean_id(&v), usize::MAX)));
            }
            DocumentKind::BirthCertificate => {
                let raw = record.registration_no.clone().or(fallback);
                record.registration_no = raw.and_then(|v| {
                    non_empty(
                        v.to_uppercase()
                            .chars()
                            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '/')
                            .collect(),
                    )
                });
            }
        }
    }
}

/// Uppercase, drop spaces, read letter O as zero.
fn clean_id(value: &str) -> String {
    value.to_uppercase().replace(' ', "").replace('O', "0")
}

fn alnum(value: &str, limit: usize) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(limit)
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Classify the record, fix its ID numbers and clear address parts that
/// picked up a person's name.
pub fn normalize_record(mut record: OcrRecord) -> OcrRecord {
    match record.kind() {
        Some(kind) => {
            debug!("Normalising record as {:?}", kind);
            kind.normalize(&mut record);
        }
        None => debug!(
            "Unclassified document type {:?}; IDs left as-is",
            record.document_type
        ),
    }
    record.gender = record.gender.map(|g| canonical_gender(&g));
    wipe_misplaced_names(&mut record);
    record
}

/// Fold case for the three accepted spellings; anything else is kept.
fn canonical_gender(gender: &str) -> String {
    let trimmed = gender.trim();
    match trimmed.to_lowercase().as_str() {
        "male" => "Male".to_string(),
        "female" => "Female".to_string(),
        "other" => "Other".to_string(),
        _ => trimmed.to_string(),
    }
}

fn wipe_misplaced_names(record: &mut OcrRecord) {
    let Some(Address::Parts(parts)) = record.address.as_mut() else {
        return;
    };
    let mut terms: Vec<String> = RELATION_MARKERS.iter().map(|m| m.to_string()).collect();
    terms.extend(record.name.iter().map(|n| n.to_uppercase()));
    terms.extend(record.father_name.iter().map(|n| n.to_uppercase()));
    terms.retain(|t| t.chars().count() > 2);

    for slot in [&mut parts.street, &mut parts.city, &mut parts.locality] {
        let polluted = slot.as_deref().is_some_and(|v| {
            let upper = v.to_uppercase();
            terms.iter().any(|t| upper.contains(t.as_str()))
        });
        if polluted {
            debug!("Clearing address part {:?}", slot);
            *slot = None;
        }
    }
}

// ── Internal keys ────────────────────────────────────────────────────────

/// Record keys → internal keys, then derived keys and form defaults.
pub fn map_record_to_fields(record: &OcrRecord, config: &FormConfig) -> FieldSet {
    let mut fields = FieldSet::new();
    let simple = [
        ("name", &record.name),
        ("dob", &record.dob),
        ("aadhaar_number", &record.aadhaar_no),
        ("gender", &record.gender),
        ("age", &record.age),
        ("phone", &record.mobile),
        ("applicant_email", &record.email),
        ("state", &record.state),
        ("district", &record.district),
        ("city", &record.city),
        ("pin_code", &record.pin),
        ("poi", &record.poi),
        ("poa", &record.poa),
        ("pdb", &record.pdb),
    ];
    for (key, value) in simple {
        fields.insert_text(key, value.clone());
    }
    fields.insert_text(
        "address",
        record.address.as_ref().map(Address::to_line).filter(|a| !a.is_empty()),
    );

    expand_derived(&mut fields);
    apply_defaults(&mut fields, config);
    info!("Record mapped to {} internal fields", fields.len());
    fields
}

/// Heuristic extraction → internal keys, then derived keys and form defaults.
pub fn fields_from_extraction(extracted: ExtractedFields, config: &FormConfig) -> FieldSet {
    let mut fields = extracted.into_field_set();
    expand_derived(&mut fields);
    apply_defaults(&mut fields, config);
    fields
}

/// Gender checkboxes and address parts.
pub fn expand_derived(fields: &mut FieldSet) {
    let gender = fields.text("gender").map(|g| g.into_owned()).unwrap_or_default();
    for (key, on) in gender_checkboxes(&gender) {
        fields.insert(key, on);
    }

    if let Some(address) = fields.text("address").map(|a| a.into_owned()) {
        split_address(fields, &address);
    }
}

/// An address with at least four comma parts gives street, area, landmark
/// and (unless already known) city.
fn split_address(fields: &mut FieldSet, address: &str) {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return;
    }
    fields.insert("street", parts[0]);
    fields.insert("area", parts[1]);
    fields.insert("landmark", parts[2]);
    fields.set_default("city", FieldValue::from(parts[3]));
}

/// Fill configured baseline values for keys extraction said nothing about.
pub fn apply_defaults(fields: &mut FieldSet, config: &FormConfig) {
    for (key, value) in &config.defaults {
        fields.set_default(key, value.clone());
    }
}
