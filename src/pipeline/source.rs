//! Text source: one uploaded document in, raw OCR text out.
//!
//! Resolved once from [`TextSourceKind`] when the service is built. The
//! vision variant owns its provider handle; the plain-text variant needs
//! nothing but the filesystem.

use crate::config::{AutofillConfig, TextSourceKind};
use crate::error::AutofillError;
use crate::fields::RawText;
use crate::pipeline::input::{self, DocumentFormat};
use crate::pipeline::{encode, llm, postprocess, render};
use edgequake_llm::{ImageData, LLMProvider};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// How raw text is obtained.
#[derive(Clone)]
pub enum TextSource {
    /// Rasterise/decode the upload and transcribe it with a vision model.
    Vision(Arc<dyn LLMProvider>),
    /// The upload is already a UTF-8 OCR transcript.
    PlainText,
}

impl std::fmt::Debug for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Vision(_) => f.write_str("TextSource::Vision"),
            TextSource::PlainText => f.write_str("TextSource::PlainText"),
        }
    }
}

impl TextSource {
    /// Build the source `kind` names. `provider` is required for vision.
    pub fn new(kind: TextSourceKind, provider: Option<Arc<dyn LLMProvider>>) -> Result<Self, AutofillError> {
        match (kind, provider) {
            (TextSourceKind::PlainText, _) => Ok(TextSource::PlainText),
            (TextSourceKind::Vision, Some(p)) => Ok(TextSource::Vision(p)),
            (TextSourceKind::Vision, None) => Err(AutofillError::ProviderNotConfigured {
                provider: "vision".to_string(),
                hint: "The vision text source needs an LLM provider.".to_string(),
            }),
        }
    }

    /// Read the text of `input` (local path or URL).
    pub async fn extract_text(&self, input: &str, config: &AutofillConfig) -> Result<RawText, AutofillError> {
        let start = Instant::now();
        let text = match self {
            TextSource::PlainText => read_transcript(input, config.download_timeout_secs).await?,
            TextSource::Vision(provider) => transcribe(provider, input, config).await?,
        };
        if text.is_blank() {
            return Err(AutofillError::EmptyTranscript { path: input.into() });
        }
        info!(
            "Read {} chars of text from {} in {:?}",
            text.as_str().len(),
            input,
            start.elapsed()
        );
        Ok(text)
    }
}

async fn read_transcript(input: &str, timeout_secs: u64) -> Result<RawText, AutofillError> {
    let bytes = if input::is_url(input) {
        input::fetch(input, timeout_secs).await?
    } else {
        let path = Path::new(input);
        input::open_checked(path)?;
        tokio::fs::read(path)
            .await
            .map_err(|e| AutofillError::Internal(format!("read {}: {}", path.display(), e)))?
    };
    Ok(RawText::new(String::from_utf8_lossy(&bytes).into_owned()))
}

async fn transcribe(
    provider: &Arc<dyn LLMProvider>,
    input: &str,
    config: &AutofillConfig,
) -> Result<RawText, AutofillError> {
    let resolved = input::resolve_input(input, config.download_timeout_secs).await?;
    let path = resolved.path();

    let images = match resolved.format() {
        DocumentFormat::Pdf => {
            render::render_pages(path, config.max_rendered_pixels, config.password.as_deref()).await?
        }
        DocumentFormat::Png | DocumentFormat::Jpeg => {
            vec![(0, render::load_image(path, config.max_rendered_pixels).await?)]
        }
    };

    let encoded: Vec<(usize, ImageData)> = images
        .iter()
        .map(|(idx, img)| encode::encode_page(*idx, img).map(|data| (*idx, data)))
        .collect::<Result<_, _>>()?;
    info!("Transcribing {} page(s)", encoded.len());

    // `buffered` keeps page order while running `concurrency` calls at once.
    let pages: Vec<String> = stream::iter(encoded.into_iter().map(|(idx, data)| {
        let provider = Arc::clone(provider);
        async move {
            let raw = llm::transcribe_page(&provider, idx + 1, data, config).await?;
            Ok::<_, AutofillError>(postprocess::clean_transcript(&raw))
        }
    }))
    .buffered(config.concurrency)
    .try_collect()
    .await?;

    Ok(RawText::new(postprocess::join_pages(pages)))
}
