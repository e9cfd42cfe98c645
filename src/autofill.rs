//! The autofill service and its entry points.
//!
//! [`Autofill`] is built once at startup: the LLM provider and text source
//! are resolved there and reused by every request. Requests share nothing
//! mutable; each reserves its own output file.
//!
//! [`run_pipeline`] is the synchronous core (validate → map → fill) that the
//! async entry points hand off to `spawn_blocking`.

use crate::config::AutofillConfig;
use crate::document::OcrRecord;
use crate::error::{AutofillError, StructuringError};
use crate::fields::{FieldSet, RawText};
use crate::form_config::FormConfig;
use crate::output::{FillReport, FillStats, PipelineOutcome};
use crate::pipeline::source::TextSource;
use crate::pipeline::{extract, fill, llm, map, normalize, structure};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Validate, map and fill one form.
///
/// Validation failure is not an `Err`: it comes back as
/// [`PipelineOutcome::Error`] with every violated rule, and no file is
/// written. `Err` is reserved for a missing/corrupt template or a failed save.
pub fn run_pipeline(
    form: &FormConfig,
    fields: &FieldSet,
    input_pdf: &Path,
    output_pdf: &Path,
) -> Result<PipelineOutcome, AutofillError> {
    run_with_stats(form, fields, input_pdf, output_pdf).map(|(outcome, _)| outcome)
}

fn run_with_stats(
    form: &FormConfig,
    fields: &FieldSet,
    input_pdf: &Path,
    output_pdf: &Path,
) -> Result<(PipelineOutcome, Option<FillStats>), AutofillError> {
    if !input_pdf.exists() {
        return Err(AutofillError::FileNotFound {
            path: input_pdf.to_path_buf(),
        });
    }

    if let Err(failure) = normalize::validate(fields) {
        warn!("Validation failed: {}", failure);
        return Ok((
            PipelineOutcome::Error {
                errors: failure.errors,
            },
            None,
        ));
    }

    let mapped_data = map::map_fields(form, fields);
    let stats = fill::fill_pdf(input_pdf, output_pdf, &mapped_data)?;
    Ok((PipelineOutcome::Success { mapped_data }, Some(stats)))
}

/// Long-lived autofill service.
pub struct Autofill {
    config: AutofillConfig,
    source: TextSource,
    /// Present when any stage needs an LLM.
    provider: Option<Arc<dyn LLMProvider>>,
}

impl std::fmt::Debug for Autofill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autofill")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl Autofill {
    /// Resolve the provider (if one is needed) and the text source.
    pub async fn new(config: AutofillConfig) -> Result<Self, AutofillError> {
        let provider = if config.needs_llm() {
            Some(resolve_provider(&config).await?)
        } else {
            None
        };
        let source = TextSource::new(config.text_source, provider.clone())?;
        info!(
            "Autofill ready: source={:?}, llm_structuring={}",
            source,
            config.structure_with_llm && provider.is_some()
        );
        Ok(Self {
            config,
            source,
            provider,
        })
    }

    pub fn config(&self) -> &AutofillConfig {
        &self.config
    }

    /// Raw text of an uploaded document via the configured text source.
    pub async fn extract_text(&self, input: &str) -> Result<RawText, AutofillError> {
        self.source.extract_text(input, &self.config).await
    }

    /// Internal-keyed fields for `text`: LLM structuring when enabled, with
    /// the regex extractor as fallback.
    pub async fn fields_from_text(&self, text: &RawText, form: &FormConfig) -> FieldSet {
        if let Some(provider) = self.provider.as_ref().filter(|_| self.config.structure_with_llm) {
            match self.structure(provider, text).await {
                Ok(record) => return structure::map_record_to_fields(&record, form),
                Err(e) => warn!("LLM structuring failed ({}); using heuristic extractor", e),
            }
        }
        let extracted = extract::extract_fields(text);
        structure::fields_from_extraction(extracted, form)
    }

    async fn structure(
        &self,
        provider: &Arc<dyn LLMProvider>,
        text: &RawText,
    ) -> Result<OcrRecord, StructuringError> {
        let answer = llm::structure_text(provider, text.as_str(), &self.config).await?;
        let record = structure::parse_record(&answer)?;
        debug!("LLM classified document as {:?}", record.document_type);
        Ok(structure::normalize_record(record))
    }

    /// Upload in, filled form out.
    pub async fn process_document(&self, input: &str, form_type: &str) -> Result<FillReport, AutofillError> {
        let start = Instant::now();
        info!("Processing {} for form {}", input, form_type);

        let (form, template) = match self.locate_form(form_type) {
            Ok(found) => found,
            Err(e) => return rejected_or_fatal(e),
        };
        let text = self.extract_text(input).await?;
        let fields = self.fields_from_text(&text, &form).await;

        let report = self.fill(form_type, form, template, fields).await?;
        info!("Processed {} in {:?}", input, start.elapsed());
        Ok(report)
    }

    /// Fill from an already structured record (e.g. a JSON fixture).
    pub async fn fill_from_record(&self, record: OcrRecord, form_type: &str) -> Result<FillReport, AutofillError> {
        let (form, template) = match self.locate_form(form_type) {
            Ok(found) => found,
            Err(e) => return rejected_or_fatal(e),
        };
        let record = structure::normalize_record(record);
        let fields = structure::map_record_to_fields(&record, &form);
        self.fill(form_type, form, template, fields).await
    }

    /// Read a record JSON file and fill from it.
    pub async fn fill_from_record_file(&self, path: &Path, form_type: &str) -> Result<FillReport, AutofillError> {
        let (form, template) = match self.locate_form(form_type) {
            Ok(found) => found,
            Err(e) => return rejected_or_fatal(e),
        };
        if !path.exists() {
            return Ok(FillReport::rejected(vec![format!(
                "OCR data file not found for {form_type}"
            )]));
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AutofillError::Internal(format!("read {}: {}", path.display(), e)))?;
        let record = match serde_json::from_str::<OcrRecord>(&json) {
            Ok(r) => r,
            Err(e) => {
                return Ok(FillReport::rejected(vec![format!(
                    "OCR data file for {form_type} is not valid JSON: {e}"
                )]))
            }
        };
        let record = structure::normalize_record(record);
        let fields = structure::map_record_to_fields(&record, &form);
        self.fill(form_type, form, template, fields).await
    }

    /// Fill with internal-keyed data as given (e.g. user-edited values).
    /// Only the form's defaults are added.
    pub async fn fill_form_with_data(&self, mut fields: FieldSet, form_type: &str) -> Result<FillReport, AutofillError> {
        let (form, template) = match self.locate_form(form_type) {
            Ok(found) => found,
            Err(e) => return rejected_or_fatal(e),
        };
        structure::apply_defaults(&mut fields, &form);
        self.fill(form_type, form, template, fields).await
    }

    fn locate_form(&self, form_type: &str) -> Result<(Arc<FormConfig>, PathBuf), AutofillError> {
        let form = FormConfig::load_for(&self.config.config_dir, form_type)?;
        let template = self.config.template_path(form_type);
        if !template.exists() {
            return Err(AutofillError::TemplateNotFound {
                form_type: form_type.to_string(),
                path: template,
            });
        }
        Ok((Arc::new(form), template))
    }

    /// Reserve an output path and run the blocking core off the runtime.
    async fn fill(
        &self,
        form_type: &str,
        form: Arc<FormConfig>,
        template: PathBuf,
        fields: FieldSet,
    ) -> Result<FillReport, AutofillError> {
        let output = fill::unique_output_path(&self.config.output_dir, form_type)?;
        let out = output.clone();

        let result = tokio::task::spawn_blocking(move || run_with_stats(&form, &fields, &template, &out))
            .await
            .map_err(|e| AutofillError::Internal(format!("Fill task panicked: {}", e)))
            .and_then(|r| r);

        match result {
            Ok((outcome @ PipelineOutcome::Success { .. }, stats)) => Ok(FillReport {
                outcome,
                output_path: Some(output),
                stats,
            }),
            Ok((outcome, _)) => {
                discard(&output);
                Ok(FillReport {
                    outcome,
                    output_path: None,
                    stats: None,
                })
            }
            Err(e) => {
                discard(&output);
                Err(e)
            }
        }
    }
}

/// Missing config/template is reported to the caller, not raised.
fn rejected_or_fatal(e: AutofillError) -> Result<FillReport, AutofillError> {
    match e {
        AutofillError::FormConfigNotFound { .. } | AutofillError::TemplateNotFound { .. } => {
            warn!("{}", e);
            Ok(FillReport::rejected(vec![e.summary()]))
        }
        other => Err(other),
    }
}

/// Remove a reserved output that never received a complete document.
fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AutofillError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AutofillError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` (+ `config.model`) via [`ProviderFactory`]
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. [`ProviderFactory::from_env`] auto-detection
async fn resolve_provider(config: &AutofillConfig) -> Result<Arc<dyn LLMProvider>, AutofillError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AutofillError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or use --text-source text --no-llm-structuring.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
