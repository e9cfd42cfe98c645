//! Configuration for the autofill pipeline.
//!
//! Every knob lives in [`AutofillConfig`], built via its
//! [`AutofillConfigBuilder`]. The config is read-only once built and is
//! shared by every request an [`crate::Autofill`] service handles.

use crate::error::AutofillError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an [`crate::Autofill`] service.
///
/// # Example
/// ```rust
/// use idfill::{AutofillConfig, TextSourceKind};
///
/// let config = AutofillConfig::builder()
///     .config_dir("data/config")
///     .forms_dir("static/forms")
///     .output_dir("data/output")
///     .text_source(TextSourceKind::PlainText)
///     .structure_with_llm(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AutofillConfig {
    /// Directory holding `<form_type>_mapping.json` files. Default: `data/config`.
    pub config_dir: PathBuf,

    /// Directory holding `<form_type>.pdf` templates. Default: `static/forms`.
    pub forms_dir: PathBuf,

    /// Where filled PDFs are written. Default: `data/output`.
    pub output_dir: PathBuf,

    /// How raw text is obtained from an uploaded document. Default: [`TextSourceKind::Vision`].
    pub text_source: TextSourceKind,

    /// Ask the LLM to structure the OCR text into a record before falling
    /// back to the regex extractor. Default: true.
    pub structure_with_llm: bool,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0 (transcription, not prose).
    pub temperature: f32,

    /// Maximum tokens per LLM answer. Default: 2048.
    pub max_tokens: usize,

    /// Retries on a failed LLM call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Longest edge of a rasterised page, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Pages transcribed at once. Default: 4.
    pub concurrency: usize,

    /// User password for encrypted PDF uploads.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Override for the page transcription prompt.
    pub transcription_prompt: Option<String>,

    /// Override for the record structuring prompt.
    pub structuring_prompt: Option<String>,
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("data/config"),
            forms_dir: PathBuf::from("static/forms"),
            output_dir: PathBuf::from("data/output"),
            text_source: TextSourceKind::default(),
            structure_with_llm: true,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_rendered_pixels: 2000,
            concurrency: 4,
            password: None,
            download_timeout_secs: 120,
            transcription_prompt: None,
            structuring_prompt: None,
        }
    }
}

impl fmt::Debug for AutofillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutofillConfig")
            .field("config_dir", &self.config_dir)
            .field("forms_dir", &self.forms_dir)
            .field("output_dir", &self.output_dir)
            .field("text_source", &self.text_source)
            .field("structure_with_llm", &self.structure_with_llm)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl AutofillConfig {
    /// Create a new builder for `AutofillConfig`.
    pub fn builder() -> AutofillConfigBuilder {
        AutofillConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when some stage of the configured pipeline calls an LLM.
    pub fn needs_llm(&self) -> bool {
        self.structure_with_llm || self.text_source == TextSourceKind::Vision
    }

    /// `<forms_dir>/<form_type>.pdf`
    pub fn template_path(&self, form_type: &str) -> PathBuf {
        self.forms_dir.join(format!("{form_type}.pdf"))
    }
}

/// Builder for [`AutofillConfig`].
#[derive(Debug)]
pub struct AutofillConfigBuilder {
    config: AutofillConfig,
}

impl AutofillConfigBuilder {
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.config_dir = dir.into();
        self
    }

    pub fn forms_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.forms_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn text_source(mut self, kind: TextSourceKind) -> Self {
        self.config.text_source = kind;
        self
    }

    pub fn structure_with_llm(mut self, v: bool) -> Self {
        self.config.structure_with_llm = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn transcription_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.transcription_prompt = Some(prompt.into());
        self
    }

    pub fn structuring_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.structuring_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AutofillConfig, AutofillError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(AutofillError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(AutofillError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the raw text for an uploaded document comes from.
///
/// Chosen once at startup; there is no silent fallback between sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextSourceKind {
    /// Rasterise PDFs / read images and transcribe them with a vision LLM. (default)
    #[default]
    Vision,
    /// The input already is an OCR transcript (UTF-8 text file).
    PlainText,
}
