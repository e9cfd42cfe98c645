//! Error types for the idfill library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`AutofillError`] (**fatal**): the request cannot proceed at all
//!   (missing template, corrupt PDF, provider not configured, output could
//!   not be written). Returned as `Err(AutofillError)` from every entry point.
//!
//! * [`ValidationFailure`] (**rejected input**): extraction produced values
//!   that fail the field rules. It carries *every* violated rule, not just the
//!   first, and is folded into [`crate::output::PipelineOutcome::Error`] so a
//!   caller can show all problems at once.
//!
//! * [`StructuringError`] (**recoverable**): the LLM answer could not be
//!   turned into a record. The pipeline logs it and falls back to the
//!   heuristic extractor.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the idfill library.
#[derive(Debug, Error)]
pub enum AutofillError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is neither a PDF nor a supported image.
    #[error("Unsupported document '{path}': expected PDF, PNG or JPEG, first bytes {magic:?}")]
    UnsupportedDocument { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Form errors ───────────────────────────────────────────────────────
    /// No `<form_type>_mapping.json` in the config directory.
    #[error("Config file not found for {form_type}: '{path}'")]
    FormConfigNotFound { form_type: String, path: PathBuf },

    /// The mapping file exists but is not a valid form config.
    #[error("Invalid form config '{path}': {detail}")]
    InvalidFormConfig { path: PathBuf, detail: String },

    /// No `<form_type>.pdf` template in the forms directory.
    #[error("Input PDF not found for {form_type}: '{path}'")]
    TemplateNotFound { form_type: String, path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium could not be bound or failed to render a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The text source returned nothing usable.
    #[error("No text could be read from '{path}'")]
    EmptyTranscript { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the filled PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutofillError {
    /// Short caller-facing message used in `{status: "error"}` outcomes.
    pub fn summary(&self) -> String {
        match self {
            AutofillError::FormConfigNotFound { form_type, .. } => {
                format!("Config file not found for {form_type}")
            }
            AutofillError::TemplateNotFound { form_type, .. } => {
                format!("Input PDF not found for {form_type}")
            }
            other => other.to_string(),
        }
    }
}

/// Extracted values broke one or more field rules.
///
/// `errors` is never empty and keeps rule order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s): {}", errors.len(), errors.join("; "))]
pub struct ValidationFailure {
    pub errors: Vec<String>,
}

/// The LLM answer could not be turned into a document record.
#[derive(Debug, Error)]
pub enum StructuringError {
    #[error("LLM response contains no JSON object")]
    NoJsonObject,

    #[error("LLM JSON does not describe a document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("LLM call failed: {0}")]
    Llm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_lists_every_error() {
        let e = ValidationFailure {
            errors: vec!["DOB format invalid".into(), "Invalid gender".into()],
        };
        let msg = e.to_string();
        assert!(msg.starts_with("2 validation error(s)"), "got: {msg}");
        assert!(msg.contains("DOB format invalid; Invalid gender"));
    }

    #[test]
    fn summary_matches_caller_wording() {
        let e = AutofillError::FormConfigNotFound {
            form_type: "aadhaar_form".into(),
            path: PathBuf::from("data/config/aadhaar_form_mapping.json"),
        };
        assert_eq!(e.summary(), "Config file not found for aadhaar_form");

        let e = AutofillError::TemplateNotFound {
            form_type: "aadhaar_form".into(),
            path: PathBuf::from("static/forms/aadhaar_form.pdf"),
        };
        assert_eq!(e.summary(), "Input PDF not found for aadhaar_form");
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = AutofillError::OutputWriteFailed {
            path: PathBuf::from("/nope/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        assert!(e.to_string().contains("/nope/out.pdf"));
        assert!(e.source().is_some());
    }

    #[test]
    fn structuring_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: StructuringError = err.into();
        assert!(e.to_string().starts_with("LLM JSON does not describe a document"));
    }
}
