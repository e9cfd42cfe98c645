//! Result types handed back to callers.

use crate::fields::MappedData;
use crate::form_config::WidgetKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-facing pipeline result.
///
/// Serialises to `{"status":"success","mapped_data":{...}}` or
/// `{"status":"error","errors":[...]}` so a web layer can forward it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Success { mapped_data: MappedData },
    Error { errors: Vec<String> },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn errors(&self) -> &[String] {
        match self {
            PipelineOutcome::Error { errors } => errors,
            PipelineOutcome::Success { .. } => &[],
        }
    }
}

/// Counters from one fill pass over a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStats {
    /// Widget annotations seen across all pages.
    pub widgets_seen: usize,
    /// Text widgets written.
    pub text_written: usize,
    /// Checkbox widgets written.
    pub checkboxes_written: usize,
    /// Mapped keys that matched no widget.
    pub unmatched_keys: usize,
}

/// A completed request: outcome plus, on success, where the PDF went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<FillStats>,
}

impl FillReport {
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            outcome: PipelineOutcome::Error { errors },
            output_path: None,
            stats: None,
        }
    }
}

/// One widget as found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetInfo {
    /// 1-indexed page number.
    pub page: u32,
    pub name: String,
    pub kind: WidgetKind,
    /// Current `/V`, if any.
    pub value: Option<String>,
}
