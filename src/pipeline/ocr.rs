//! Content extraction: turn a normalised image into plain text.
//!
//! The OCR engine sits behind [`TextRecognizer`]. The shipped engine,
//! [`VisionRecognizer`], sends the JPEG to a vision LLM through
//! `edgequake-llm` and retries transient failures with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`).
//!
//! [`extract_text`] is the pipeline stage. It never fails: any
//! [`ExtractionError`] is logged and the document is stored with an empty
//! transcription.

use crate::cache::OcrCache;
use crate::config::VaultConfig;
use crate::error::ExtractionError;
use crate::pipeline::normalize::NormalizedFile;
use crate::pipeline::postprocess;
use crate::prompts::{NO_TEXT_SENTINEL, OCR_SYSTEM_PROMPT};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// An OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Transcribe the text in a JPEG image.
    async fn recognize(&self, jpeg: &[u8]) -> Result<String, ExtractionError>;
}

/// Recognizer used when OCR is switched off. Always fails with
/// [`ExtractionError::Disabled`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRecognizer;

#[async_trait]
impl TextRecognizer for DisabledRecognizer {
    async fn recognize(&self, _jpeg: &[u8]) -> Result<String, ExtractionError> {
        Err(ExtractionError::Disabled)
    }
}

/// OCR through a vision-capable LLM.
///
/// The provider is resolved on first use and then reused for the life of
/// the recognizer. A failed resolution is not cached, so a provider that
/// becomes reachable later is picked up on the next upload.
pub struct VisionRecognizer {
    config: VaultConfig,
    provider: OnceCell<Arc<dyn LLMProvider>>,
}

impl VisionRecognizer {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    async fn provider(&self) -> Result<&Arc<dyn LLMProvider>, ExtractionError> {
        self.provider
            .get_or_try_init(|| async { resolve_provider(&self.config) })
            .await
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    async fn recognize(&self, jpeg: &[u8]) -> Result<String, ExtractionError> {
        let provider = self.provider().await?;
        let config = &self.config;
        let start = Instant::now();

        let image = ImageData::new(STANDARD.encode(jpeg), "image/jpeg").with_detail("high");
        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = build_options(config);
        let call_timeout = Duration::from_secs(config.api_timeout_secs);

        let mut last_err: Option<ExtractionError> = None;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                let backoff = retry_backoff_ms(config.retry_backoff_ms, attempt);
                warn!(
                    "OCR retry {}/{} after {}ms",
                    attempt, config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "OCR: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("OCR attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(ExtractionError::Failed {
                        retries: config.max_retries,
                        detail: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        "OCR attempt {} timed out after {}s",
                        attempt + 1,
                        config.api_timeout_secs
                    );
                    last_err = Some(ExtractionError::Timeout {
                        secs: config.api_timeout_secs,
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ExtractionError::Failed {
            retries: config.max_retries,
            detail: "Unknown error".to_string(),
        }))
    }
}

/// Build `CompletionOptions` from the vault config.
/// Delay before retry `attempt` (1-based): `base · 2^(attempt-1)`, saturating.
fn retry_backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(config: &VaultConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. `config.provider` — a pre-built provider, used as-is.
/// 2. `config.provider_name` (+ `config.model`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI when `OPENAI_API_KEY` is set.
/// 5. `ProviderFactory::from_env()` auto-detection.
fn resolve_provider(config: &VaultConfig) -> Result<Arc<dyn LLMProvider>, ExtractionError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let default_model = || config.model.as_deref().unwrap_or("gpt-4.1-nano").to_string();

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &default_model());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", &default_model());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractionError::ProviderUnavailable {
            provider: "auto".to_string(),
            hint: format!(
                "no vision provider could be auto-detected; set OPENAI_API_KEY or ANTHROPIC_API_KEY ({})",
                e
            ),
        })?;

    info!("OCR provider auto-detected from environment");
    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractionError> {
    info!("OCR provider: {} / {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractionError::ProviderUnavailable {
            provider: provider_name.to_string(),
            hint: e.to_string(),
        }
    })
}

/// Cache key for an OCR result: SHA-256 of the normalised image.
pub fn content_key(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Pipeline stage: best-effort transcription of a normalised file.
///
/// PDFs are skipped. Cached transcriptions are reused. Failures are logged
/// and yield an empty string; they are never cached.
pub async fn extract_text(
    recognizer: &dyn TextRecognizer,
    cache: &OcrCache,
    file: &NormalizedFile,
) -> String {
    if !file.is_image() {
        debug!("Skipping OCR for non-image upload");
        return String::new();
    }

    let key = content_key(&file.bytes);
    if let Some(text) = cache.get(&key).await {
        debug!("OCR cache hit ({} chars)", text.len());
        return text;
    }

    match recognizer.recognize(&file.bytes).await {
        Ok(raw) => {
            let text = finish_transcription(&raw);
            cache.insert(key, text.clone()).await;
            text
        }
        Err(e) => {
            warn!(error = %e, "OCR extraction degraded, continuing without text");
            String::new()
        }
    }
}

/// Clean the model's reply and map the no-text sentinel to an empty string.
fn finish_transcription(raw: &str) -> String {
    let cleaned = postprocess::clean_ocr_text(raw);
    if cleaned.trim() == NO_TEXT_SENTINEL {
        String::new()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRecognizer {
        calls: AtomicUsize,
        reply: Result<String, ExtractionError>,
    }

    #[async_trait]
    impl TextRecognizer for CountingRecognizer {
        async fn recognize(&self, _jpeg: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn image_file() -> NormalizedFile {
        NormalizedFile {
            bytes: Bytes::from_static(b"jpeg-bytes"),
            content_type: "image/jpeg",
            dimensions: Some((10, 10)),
            thumbnail: None,
        }
    }

    fn cache() -> OcrCache {
        OcrCache::new(16, Duration::from_secs(60))
    }

    #[test]
    fn build_options_defaults() {
        let config = VaultConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_text() {
        let text = extract_text(&DisabledRecognizer, &cache(), &image_file()).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn pdf_is_never_sent_to_ocr() {
        let recognizer = CountingRecognizer {
            calls: AtomicUsize::new(0),
            reply: Ok("text".into()),
        };
        let pdf = NormalizedFile {
            bytes: Bytes::from_static(b"%PDF-1.4"),
            content_type: "application/pdf",
            dimensions: None,
            thumbnail: None,
        };
        assert_eq!(extract_text(&recognizer, &cache(), &pdf).await, "");
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_text_is_cleaned_and_cached() {
        let recognizer = CountingRecognizer {
            calls: AtomicUsize::new(0),
            reply: Ok("```\r\nPASSPORT  \r\nJOHN DOE\r\n```".into()),
        };
        let cache = cache();
        let first = extract_text(&recognizer, &cache, &image_file()).await;
        let second = extract_text(&recognizer, &cache, &image_file()).await;
        assert_eq!(first, "PASSPORT\nJOHN DOE");
        assert_eq!(first, second);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let recognizer = CountingRecognizer {
            calls: AtomicUsize::new(0),
            reply: Err(ExtractionError::Timeout { secs: 1 }),
        };
        let cache = cache();
        extract_text(&recognizer, &cache, &image_file()).await;
        extract_text(&recognizer, &cache, &image_file()).await;
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(retry_backoff_ms(500, 1), 500);
        assert_eq!(retry_backoff_ms(500, 3), 2000);
        assert_eq!(retry_backoff_ms(500, 200), u64::MAX);
        assert_eq!(retry_backoff_ms(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn sentinel_maps_to_empty() {
        assert_eq!(finish_transcription("  [NO_TEXT]\n"), "");
    }
}
