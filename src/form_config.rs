//! Declarative field → widget mapping for one form template.
//!
//! Loaded from `<config_dir>/<form_type>_mapping.json`. Read-only after load,
//! so a loaded config can be shared behind an `Arc` across requests.

use crate::error::AutofillError;
use crate::fields::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Widget flavour a semantic field is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    #[default]
    Text,
    Checkbox,
}

/// One entry of the `fields` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub pdf_field: String,
    #[serde(default)]
    pub kind: WidgetKind,
}

/// Mapping from internal field names to widget names, plus the baseline
/// values applied when extraction gives no signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub defaults: BTreeMap<String, FieldValue>,
}

impl FormConfig {
    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, AutofillError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => AutofillError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => AutofillError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        let config = Self::from_json(&text).map_err(|e| AutofillError::InvalidFormConfig {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        debug!(
            "Loaded form config {}: {} fields, {} defaults",
            path.display(),
            config.fields.len(),
            config.defaults.len()
        );
        Ok(config)
    }

    /// Load the config for `form_type` from `config_dir`.
    pub fn load_for(config_dir: &Path, form_type: &str) -> Result<Self, AutofillError> {
        let path = mapping_path(config_dir, form_type);
        if !path.exists() {
            return Err(AutofillError::FormConfigNotFound {
                form_type: form_type.to_string(),
                path,
            });
        }
        Self::load(&path)
    }

    /// Widget name for an internal field, if mapped.
    pub fn widget_for(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.pdf_field.as_str())
    }
}

/// `<config_dir>/<form_type>_mapping.json`
pub fn mapping_path(config_dir: &Path, form_type: &str) -> PathBuf {
    config_dir.join(format!("{form_type}_mapping.json"))
}
