//! LLM interaction: vision transcription and JSON structuring.
//!
//! Prompt text lives in [`crate::prompts`]; this module owns message layout,
//! completion options and the retry loop.
//!
//! ## Retry Strategy
//!
//! 429 / 503 answers are transient. Each call retries with exponential
//! backoff (`retry_backoff_ms * 2^attempt`): 500 ms → 1 s → 2 s.

use crate::config::AutofillConfig;
use crate::error::{AutofillError, StructuringError};
use crate::prompts::{structuring_request, STRUCTURING_PROMPT, TRANSCRIPTION_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Transcribe one page (or photo) into plain text lines.
pub async fn transcribe_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    config: &AutofillConfig,
) -> Result<String, AutofillError> {
    let system_prompt = config
        .transcription_prompt
        .as_deref()
        .unwrap_or(TRANSCRIPTION_PROMPT);

    // The image carries the content; the user turn only has to exist.
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image_data]),
    ];

    chat_with_retry(provider, &format!("Page {page_num}"), &messages, config)
        .await
        .map_err(|message| AutofillError::LlmApiError {
            message: format!("page {page_num}: {message}"),
        })
}

/// Ask the model to describe `ocr_text` as a JSON document record.
///
/// Returns the raw answer; JSON slicing and parsing happen in
/// [`crate::pipeline::structure`].
pub async fn structure_text(
    provider: &Arc<dyn LLMProvider>,
    ocr_text: &str,
    config: &AutofillConfig,
) -> Result<String, StructuringError> {
    let system_prompt = config
        .structuring_prompt
        .as_deref()
        .unwrap_or(STRUCTURING_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(structuring_request(ocr_text)),
    ];

    chat_with_retry(provider, "Structuring", &messages, config)
        .await
        .map_err(StructuringError::Llm)
}

async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    label: &str,
    messages: &[ChatMessage],
    config: &AutofillConfig,
) -> Result<String, String> {
    let start = Instant::now();
    let options = build_options(config);
    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    label,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(response.content);
            }
            Err(e) => {
                let err_msg = e.to_string();
                warn!("{}: attempt {} failed: {}", label, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "Unknown error".to_string()))
}

fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(config: &AutofillConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
