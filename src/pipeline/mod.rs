//! Pipeline stages for ID-document autofill.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌── vision ──▶ render ──▶ encode ──▶ llm ──▶ postprocess ──┐
//! input ─────┤                                                         ├──▶ RawText
//! (path/URL) └── plain text ───────────────────────────────────────────┘
//!
//! RawText ──▶ structure (LLM JSON) ─┬─▶ FieldSet ──▶ normalize ──▶ map ──▶ fill
//!         └─▶ extract (regex) ──────┘   (internal)   (validate)   (widgets) (lopdf)
//! ```
//!
//! 1. [`input`]: canonicalise the path or URL to a local file and sniff its format
//! 2. [`source`]: text source boundary (vision transcription or a transcript on disk)
//! 3. [`render`]: rasterise PDF pages inside `spawn_blocking`
//! 4. [`encode`]: PNG-encode and base64-wrap each page for the multimodal request
//! 5. [`llm`]: VLM transcription and JSON structuring calls with retry/backoff
//! 6. [`postprocess`]: deterministic cleanup of transcripts
//! 7. [`extract`]: regex field extractor with layered fallbacks
//! 8. [`structure`]: LLM JSON → [`crate::OcrRecord`] → internal field set
//! 9. [`normalize`]: field rules; the only stage that can reject a request
//! 10. [`map`]: internal keys → widget names
//! 11. [`fill`]: write widget values into the template and save atomically

pub mod encode;
pub mod extract;
pub mod fill;
pub mod input;
pub mod llm;
pub mod map;
pub mod normalize;
pub mod postprocess;
pub mod render;
pub mod source;
pub mod structure;
