//! Field Mapper: internal keys → widget names.

use crate::fields::{FieldSet, FieldValue, MappedData};
use crate::form_config::{FormConfig, WidgetKind};
use tracing::debug;

/// Checkbox keys a gender value fans out into.
pub const GENDER_KEYS: [&str; 3] = ["male", "female", "third_gender"];

/// Build the widget-keyed map for `config`.
///
/// Only configured fields with a non-null value are emitted; nothing is
/// invented for absent fields. Checkbox entries are coerced to booleans.
pub fn map_fields(config: &FormConfig, fields: &FieldSet) -> MappedData {
    let mut mapped = MappedData::new();
    for (field, spec) in &config.fields {
        let Some(value) = fields.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let value = match spec.kind {
            WidgetKind::Checkbox => FieldValue::Bool(value.as_checked()),
            WidgetKind::Text => value.clone(),
        };
        mapped.insert(spec.pdf_field.clone(), value);
    }
    debug!(
        "Mapped {} of {} configured fields",
        mapped.len(),
        config.fields.len()
    );
    mapped
}

/// Fan a gender value out into three mutually exclusive checkboxes.
///
/// "other", "third gender" and "transgender" select `third_gender`;
/// anything unrecognised (including "") leaves all three unchecked.
pub fn gender_checkboxes(gender: &str) -> [(&'static str, bool); 3] {
    let g = gender.trim().to_lowercase();
    let male = g == "male";
    let female = g == "female";
    let third = !male && !female && (g == "other" || g.contains("third") || g.contains("transgender"));
    [
        (GENDER_KEYS[0], male),
        (GENDER_KEYS[1], female),
        (GENDER_KEYS[2], third),
    ]
}
