//! Field Extractor: regex/heuristic engine over raw OCR text.
//!
//! Never fails. Every field has a layered fallback so a noisy scan still
//! yields partial output instead of blocking the fill; a pattern that does
//! not match simply leaves the field `None`.
//!
//! | field     | first choice                  | fallback(s)                                 |
//! |-----------|-------------------------------|---------------------------------------------|
//! | id_number | 12 digits, optionally 4-4-4   | -                                           |
//! | dob       | first `DD/MM/YYYY`            | -                                           |
//! | gender    | whole word "female"           | whole word "male"                           |
//! | name      | clean 2–4 word line           | first two capitalised tokens                |
//! | address   | text after `Address:`/`-`     | location-keyword lines → first 250 chars    |
//! | phone     | 10 digits starting 6–9        | -                                           |

use crate::fields::{ExtractedFields, RawText};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4} ?\d{4} ?\d{4})(?:\D|$)").unwrap());
static RE_DOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());
static RE_FEMALE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfemale\b").unwrap());
static RE_MALE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmale\b").unwrap());
static RE_NAME_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z ]{5,40}$").unwrap());
static RE_CAPITALISED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z]+").unwrap());
static RE_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)Address\s*[:\-](.*)").unwrap());
static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)([6-9]\d{9})(?:\D|$)").unwrap());
static RE_LINE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\n,]").unwrap());

/// Lowercase phrases that mark issuing-authority boilerplate, not a name.
const NAME_BOILERPLATE: &[&str] = &[
    "government",
    "unique identification",
    "authority",
    "address",
    "aadhaar",
    "enrolment",
    "signature",
    "year of birth",
];

const ADDRESS_KEYWORDS: &[&str] = &["village", "district", "post", "state", "pin", "road"];

const ADDRESS_FALLBACK_CHARS: usize = 250;

/// Turn raw OCR text into semantic fields.
pub fn extract_fields(raw: &RawText) -> ExtractedFields {
    let text = raw.as_str();
    let lines: Vec<&str> = RE_LINE_SPLIT.split(text).collect();

    let fields = ExtractedFields {
        name: extract_name(text, &lines),
        dob: RE_DOB.find(text).map(|m| m.as_str().to_string()),
        gender: extract_gender(text),
        id_number: extract_id(text),
        address: extract_address(text, &lines),
        phone: RE_PHONE.captures(text).map(|c| c[1].to_string()),
    };
    debug!(
        name = fields.name.is_some(),
        dob = fields.dob.is_some(),
        gender = fields.gender.is_some(),
        id = fields.id_number.is_some(),
        address = fields.address.is_some(),
        phone = fields.phone.is_some(),
        "Heuristic extraction done"
    );
    fields
}

fn extract_id(text: &str) -> Option<String> {
    RE_ID
        .captures(text)
        .map(|c| c[1].chars().filter(|ch| !ch.is_whitespace()).collect())
}

/// "female" is tried first: "male" is a substring of it.
fn extract_gender(text: &str) -> Option<String> {
    if RE_FEMALE.is_match(text) {
        Some("Female".to_string())
    } else if RE_MALE.is_match(text) {
        Some("Male".to_string())
    } else {
        None
    }
}

fn extract_name(text: &str, lines: &[&str]) -> Option<String> {
    let from_line = lines.iter().map(|l| l.trim()).find(|line| {
        if line.len() < 4 {
            return false;
        }
        let lower = line.to_lowercase();
        if NAME_BOILERPLATE.iter().any(|b| lower.contains(b)) {
            return false;
        }
        let words = line.split_whitespace().count();
        RE_NAME_LINE.is_match(line) && (2..=4).contains(&words)
    });
    if let Some(line) = from_line {
        return Some(line.to_string());
    }

    let caps: Vec<&str> = RE_CAPITALISED
        .find_iter(text)
        .take(2)
        .map(|m| m.as_str())
        .collect();
    if caps.is_empty() {
        None
    } else {
        debug!("Name fell back to capitalised tokens");
        Some(caps.join(" "))
    }
}

fn extract_address(text: &str, lines: &[&str]) -> Option<String> {
    if let Some(caps) = RE_ADDRESS.captures(text) {
        let addr = caps[1].trim();
        if !addr.is_empty() {
            return Some(addr.to_string());
        }
    }

    let keyword_lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| {
            let lower = l.to_lowercase();
            ADDRESS_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .take(3)
        .collect();
    if !keyword_lines.is_empty() {
        return Some(keyword_lines.join(", "));
    }

    if text.is_empty() {
        return None;
    }
    debug!("Address fell back to leading text");
    let head: String = text.chars().take(ADDRESS_FALLBACK_CHARS).collect();
    match head.trim() {
        "" => Some(head),
        trimmed => Some(trimmed.to_string()),
    }
}
