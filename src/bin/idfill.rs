//! CLI binary for idfill.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AutofillConfig` and prints the fill report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use idfill::{inspect_widgets, Autofill, AutofillConfig, FieldSet, FillReport, PipelineOutcome, TextSourceKind};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

/// Spinner shown while a request runs. Hidden in quiet/JSON mode.
fn spinner(enabled: bool, message: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("idfill");
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scanned Aadhaar card (PDF or photo) → filled enrolment form
  idfill --form aadhaar_form scan.pdf

  # Existing OCR transcript, no LLM at all
  idfill --form aadhaar_form --text-source text --no-llm-structuring card.txt

  # Fill from a structured OCR record (JSON)
  idfill --form aadhaar_form --record data/ocr/aadhaar_form.json

  # Fill from already-normalised internal fields (JSON object)
  idfill --form aadhaar_form --data fields.json

  # List the widgets of a template
  idfill --inspect-only static/forms/aadhaar_form.pdf

  # Machine-readable report
  idfill --form aadhaar_form --json scan.png > report.json

LAYOUT:
  <config-dir>/<form>_mapping.json   field → widget map and defaults
  <forms-dir>/<form>.pdf             blank AcroForm template
  <output-dir>/                      <form>_filled_<timestamp>.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium used to rasterise PDF scans

EXIT STATUS:
  0  form filled
  1  fatal error (bad template, provider not configured, I/O failure)
  2  request rejected (validation errors, unknown form)
"#;

/// Fill PDF forms from scanned identity documents.
#[derive(Parser, Debug)]
#[command(
    name = "idfill",
    version,
    about = "Fill PDF forms from scanned identity documents",
    long_about = "Read identity fields (name, DOB, gender, Aadhaar/PAN/EPIC numbers, address) \
from a scanned ID document or OCR transcript, validate them and write them into a fillable \
PDF form template.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Scanned document (PDF/PNG/JPEG), OCR transcript, or HTTP/HTTPS URL.
    /// With --inspect-only: the PDF template to list.
    #[arg(required_unless_present_any = ["record", "data"])]
    input: Option<String>,

    /// Form type; selects `<form>_mapping.json` and `<form>.pdf`.
    #[arg(short, long, env = "IDFILL_FORM", required_unless_present = "inspect_only")]
    form: Option<String>,

    /// Directory holding `<form>_mapping.json` files.
    #[arg(long, env = "IDFILL_CONFIG_DIR", default_value = "data/config")]
    config_dir: PathBuf,

    /// Directory holding `<form>.pdf` templates.
    #[arg(long, env = "IDFILL_FORMS_DIR", default_value = "static/forms")]
    forms_dir: PathBuf,

    /// Directory filled forms are written to.
    #[arg(short, long, env = "IDFILL_OUTPUT_DIR", default_value = "data/output")]
    output_dir: PathBuf,

    /// Where raw text comes from: vision (LLM transcription) or text (input is a transcript).
    #[arg(long, env = "IDFILL_TEXT_SOURCE", value_enum, default_value = "vision")]
    text_source: TextSourceArg,

    /// Fill from a structured OCR record (JSON) instead of a scan.
    #[arg(long, conflicts_with_all = ["input", "data"])]
    record: Option<PathBuf>,

    /// Fill from internal-keyed field values (JSON object) instead of a scan.
    #[arg(long, conflicts_with_all = ["input", "record"])]
    data: Option<PathBuf>,

    /// Use the regex extractor instead of LLM structuring.
    #[arg(long, env = "IDFILL_NO_LLM_STRUCTURING")]
    no_llm_structuring: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of concurrent transcription calls for multi-page scans.
    #[arg(short, long, env = "IDFILL_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per LLM call.
    #[arg(long, env = "IDFILL_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// PDF user password for encrypted scans.
    #[arg(long, env = "IDFILL_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IDFILL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// List template widgets and exit; nothing is filled.
    #[arg(long)]
    inspect_only: bool,

    /// Print the report as JSON on stdout.
    #[arg(long, env = "IDFILL_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IDFILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IDFILL_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TextSourceArg {
    Vision,
    Text,
}

impl From<TextSourceArg> for TextSourceKind {
    fn from(v: TextSourceArg) -> Self {
        match v {
            TextSourceArg::Vision => TextSourceKind::Vision,
            TextSourceArg::Text => TextSourceKind::PlainText,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_spinner = !cli.quiet && !cli.json && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_spinner {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let Some(ref input) = cli.input else {
            bail!("--inspect-only needs a PDF template path");
        };
        inspect(Path::new(input), cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(ref form) = cli.form else {
        bail!("--form is required");
    };

    let config = build_config(&cli)?;
    let service = Autofill::new(config)
        .await
        .context("Failed to start autofill service")?;

    let start = Instant::now();
    let bar = spinner(show_spinner, "Reading document…");
    let report = if let Some(ref record) = cli.record {
        service.fill_from_record_file(record, form).await
    } else if let Some(ref data) = cli.data {
        let fields = read_fields(data).await?;
        service.fill_form_with_data(fields, form).await
    } else {
        let input = cli.input.as_deref().unwrap_or_default();
        service.process_document(input, form).await
    };
    bar.finish_and_clear();
    let report = report.context("Autofill failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_report(&report, start.elapsed());
    }

    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// Map CLI args to `AutofillConfig`.
fn build_config(cli: &Cli) -> Result<AutofillConfig> {
    let mut builder = AutofillConfig::builder()
        .config_dir(&cli.config_dir)
        .forms_dir(&cli.forms_dir)
        .output_dir(&cli.output_dir)
        .text_source(cli.text_source.into())
        .structure_with_llm(!cli.no_llm_structuring)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }

    builder.build().context("Invalid configuration")
}

async fn read_fields(path: &Path) -> Result<FieldSet> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read field data from {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("{:?} is not a JSON object of field values", path))
}

fn inspect(template: &Path, json: bool) -> Result<()> {
    let widgets = inspect_widgets(template).context("Failed to inspect template")?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&widgets).context("Failed to serialise widgets")?
        );
        return Ok(());
    }

    println!("File:     {}", template.display());
    println!("Widgets:  {}", widgets.len());
    for w in &widgets {
        println!(
            "  p{:<3} {:<9} {:<32} {}",
            w.page,
            format!("{:?}", w.kind).to_lowercase(),
            w.name,
            dim(w.value.as_deref().unwrap_or("")),
        );
    }
    Ok(())
}

fn print_report(report: &FillReport, elapsed: Duration) {
    match &report.outcome {
        PipelineOutcome::Success { mapped_data } => {
            let target = report
                .output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            eprintln!(
                "{}  {} widgets  {}ms  →  {}",
                green("✔"),
                mapped_data.len(),
                elapsed.as_millis(),
                bold(&target),
            );
            if let Some(stats) = report.stats {
                eprintln!(
                    "   {} text  /  {} checkbox  /  {} unmatched",
                    dim(&stats.text_written.to_string()),
                    dim(&stats.checkboxes_written.to_string()),
                    dim(&stats.unmatched_keys.to_string()),
                );
            }
        }
        PipelineOutcome::Error { errors } => {
            eprintln!("{}  {}", red("✘"), bold("Form not filled"));
            for e in errors {
                eprintln!("   {} {}", red("•"), e);
            }
        }
    }
}
