//! Normalizer / Validator over internal-keyed fields.
//!
//! Validation only classifies; it never rewrites the input. All rules run
//! and every violation is reported, in rule order.

use crate::error::ValidationFailure;
use crate::fields::FieldSet;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());

pub const ALLOWED_GENDERS: [&str; 3] = ["Male", "Female", "Other"];

/// Check the field rules. `Err` carries every violated rule.
pub fn validate(fields: &FieldSet) -> Result<(), ValidationFailure> {
    let mut errors = Vec::new();

    if non_empty(fields, "name").is_none() {
        errors.push("Name is missing".to_string());
    }

    match non_empty(fields, "dob") {
        None => errors.push("DOB is missing".to_string()),
        Some(dob) if !is_calendar_date(&dob) => errors.push("DOB format invalid".to_string()),
        Some(_) => {}
    }

    if let Some(gender) = non_empty(fields, "gender") {
        if !ALLOWED_GENDERS.contains(&gender.as_str()) {
            errors.push("Invalid gender".to_string());
        }
    }

    if let Some(id) = non_empty(fields, "aadhaar_number") {
        let digits: String = id.chars().filter(|c| *c != ' ').collect();
        if digits.len() != 12 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            errors.push("Invalid Aadhaar number (expect 12 digits)".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { errors })
    }
}

/// `DD/MM/YYYY` that names a real day.
pub fn is_calendar_date(s: &str) -> bool {
    RE_DOB.is_match(s) && NaiveDate::parse_from_str(s, "%d/%m/%Y").is_ok()
}

/// The value as given, or `None` when absent or blank. Not trimmed: padded
/// DOB or gender values fail their format checks.
fn non_empty(fields: &FieldSet, key: &str) -> Option<String> {
    fields
        .text(key)
        .map(|v| v.into_owned())
        .filter(|v| !v.trim().is_empty())
}
