//! # idfill
//!
//! Read identity fields off scanned ID documents (Aadhaar, PAN, Voter ID,
//! ration cards, birth certificates) and write them into fillable PDF forms.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / PNG / JPEG / OCR transcript)
//!  │
//!  ├─ 1. Source     vision LLM transcription, or a plain-text transcript
//!  ├─ 2. Structure  LLM → JSON record, regex extractor as fallback
//!  ├─ 3. Normalise  gender fan-out, address split, per-document cleanup
//!  ├─ 4. Validate   name / DOB / gender / Aadhaar rules, all errors kept
//!  ├─ 5. Map        internal keys → template widget names
//!  └─ 6. Fill       AcroForm /V + checkbox /AS, atomic save
//! ```
//!
//! Steps 4-6 are synchronous and available on their own as [`run_pipeline`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idfill::{Autofill, AutofillConfig, TextSourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AutofillConfig::builder()
//!         .text_source(TextSourceKind::PlainText)
//!         .structure_with_llm(false)
//!         .build()?;
//!     let service = Autofill::new(config).await?;
//!
//!     let report = service.process_document("scan.txt", "aadhaar_form").await?;
//!     match report.output_path {
//!         Some(path) => println!("filled: {}", path.display()),
//!         None => eprintln!("rejected: {:?}", report.outcome.errors()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `idfill` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Library-only use:
//! ```toml
//! idfill = { version = "0.1", default-features = false }
//! ```
//!
//! ## Directory Layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `data/config/<form>_mapping.json` | field → widget map and defaults |
//! | `static/forms/<form>.pdf` | blank AcroForm template |
//! | `data/output/` | filled forms, one uniquely named file per request |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod autofill;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod form_config;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use autofill::{run_pipeline, Autofill};
pub use config::{AutofillConfig, AutofillConfigBuilder, TextSourceKind};
pub use document::{Address, AddressParts, DocumentKind, OcrRecord};
pub use error::{AutofillError, StructuringError, ValidationFailure};
pub use fields::{ExtractedFields, FieldSet, FieldValue, MappedData, RawText};
pub use form_config::{FieldSpec, FormConfig, WidgetKind};
pub use output::{FillReport, FillStats, PipelineOutcome, WidgetInfo};
pub use pipeline::extract::extract_fields;
pub use pipeline::fill::{fill_pdf, fill_pdf_bytes, inspect_widgets, unique_output_path};
pub use pipeline::map::{gender_checkboxes, map_fields};
pub use pipeline::normalize::validate;
pub use pipeline::source::TextSource;
