//! Value types that flow through the pipeline.
//!
//! ```text
//! RawText ──▶ ExtractedFields ──▶ FieldSet ──▶ MappedData
//! (OCR)       (semantic keys)     (internal)   (widget names)
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// OCR output for one document. No structure is assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawText(String);

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Join OCR lines with `\n` so line-oriented heuristics still see them.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for RawText {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RawText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Semantic fields found by the heuristic extractor. Nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl ExtractedFields {
    /// Rename to the internal keys the validator and form configs use.
    pub fn into_field_set(self) -> FieldSet {
        let mut set = FieldSet::new();
        set.insert_text("name", self.name);
        set.insert_text("dob", self.dob);
        set.insert_text("gender", self.gender);
        set.insert_text("aadhaar_number", self.id_number);
        set.insert_text("address", self.address);
        set.insert_text("phone", self.phone);
        set
    }
}

/// A value destined for a widget.
///
/// Untagged so form data can come straight from JSON (`"Asha"`, `true`, `1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Textual view used by the validator. Booleans and null have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(s) => Some(Cow::Borrowed(s)),
            FieldValue::Int(i) => Some(Cow::Owned(i.to_string())),
            FieldValue::Float(f) => Some(Cow::Owned(f.to_string())),
            FieldValue::Bool(_) | FieldValue::Null => None,
        }
    }

    /// Checkbox coercion. Precedence: bool as-is, integer truthiness, string
    /// in {true,1,yes,on,checked} (any case), empty/null false, otherwise
    /// truthiness.
    pub fn as_checked(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Text(s) => {
                matches!(
                    s.to_lowercase().as_str(),
                    "true" | "1" | "yes" | "on" | "checked"
                )
            }
            FieldValue::Null => false,
            FieldValue::Float(f) => *f != 0.0,
        }
    }

    /// Text widget payload. Falsy values (null, false, 0, "") become "".
    pub fn to_widget_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(0) | FieldValue::Bool(false) | FieldValue::Null => String::new(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) if *f == 0.0 => String::new(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(true) => "true".to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Internal-keyed data (`name`, `dob`, `aadhaar_number`, `male`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeMap<String, FieldValue>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Text of `key`, or `None` when absent, null or boolean.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.0.get(key).and_then(FieldValue::as_text)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only when `value` is `Some`.
    pub fn insert_text(&mut self, key: &str, value: Option<String>) {
        if let Some(v) = value {
            self.0.insert(key.to_string(), FieldValue::Text(v));
        }
    }

    /// Insert unless the key already holds a value.
    pub fn set_default(&mut self, key: &str, value: FieldValue) {
        self.0.entry(key.to_string()).or_insert(value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, FieldValue)> for FieldSet {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Widget name → value to write.
pub type MappedData = BTreeMap<String, FieldValue>;
