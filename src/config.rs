//! Configuration for the document vault.
//!
//! All pipeline and service behaviour is controlled through [`VaultConfig`],
//! built via its [`VaultConfigBuilder`]. Server-only settings (bind address,
//! storage root, token secret) are owned by the binary.

use crate::error::VaultError;
use crate::pipeline::normalize::NormalizeLimits;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default upload cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for the upload pipeline and the vault service.
///
/// Built via [`VaultConfig::builder()`] or using [`VaultConfig::default()`].
///
/// # Example
/// ```rust
/// use docvault::VaultConfig;
///
/// let config = VaultConfig::builder()
///     .max_dimension(1600)
///     .jpeg_quality(80)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VaultConfig {
    /// Largest accepted upload in bytes. Default: 10 MiB.
    pub max_upload_bytes: u64,

    /// Longest edge, in pixels, of a normalised image. Default: 2048.
    ///
    /// Images are scaled down to fit a `max_dimension × max_dimension` box
    /// with their aspect ratio preserved. Smaller images are never upscaled.
    pub max_dimension: u32,

    /// JPEG quality factor for normalised images (1–100). Default: 85.
    pub jpeg_quality: u8,

    /// Longest edge of the generated thumbnail. Default: 300.
    pub thumbnail_dimension: u32,

    /// Run OCR on uploaded images. Default: true.
    ///
    /// When off, every image is stored with an empty transcription.
    pub ocr_enabled: bool,

    /// Vision model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for OCR calls. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per transcription. Default: 2048.
    pub max_tokens: usize,

    /// Retry attempts on a failed OCR call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call OCR timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Lifetime of cached OCR results in seconds. Default: 300.
    pub cache_ttl_secs: u64,

    /// Maximum number of cached OCR results. Default: 512.
    pub cache_capacity: u64,

    /// Recorded lifetime of a share. Default: 7 days.
    pub share_expiry_days: i64,

    /// Include the underlying error message in error responses. Default: false.
    ///
    /// Switch on for development only.
    pub expose_error_detail: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: 2048,
            jpeg_quality: 85,
            thumbnail_dimension: 300,
            ocr_enabled: true,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            cache_ttl_secs: 300,
            cache_capacity: 512,
            share_expiry_days: 7,
            expose_error_detail: false,
        }
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_dimension", &self.max_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("thumbnail_dimension", &self.thumbnail_dimension)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_capacity", &self.cache_capacity)
            .field("share_expiry_days", &self.share_expiry_days)
            .field("expose_error_detail", &self.expose_error_detail)
            .finish()
    }
}

impl VaultConfig {
    /// Create a new builder for `VaultConfig`.
    pub fn builder() -> VaultConfigBuilder {
        VaultConfigBuilder {
            config: Self::default(),
        }
    }

    /// Image bounds handed to the normaliser.
    pub fn normalize_limits(&self) -> NormalizeLimits {
        NormalizeLimits {
            max_dimension: self.max_dimension,
            thumbnail_dimension: self.thumbnail_dimension,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// Builder for [`VaultConfig`].
#[derive(Debug)]
pub struct VaultConfigBuilder {
    config: VaultConfig,
}

impl VaultConfigBuilder {
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn thumbnail_dimension(mut self, px: u32) -> Self {
        self.config.thumbnail_dimension = px;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
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

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn cache_capacity(mut self, n: u64) -> Self {
        self.config.cache_capacity = n;
        self
    }

    pub fn share_expiry_days(mut self, days: i64) -> Self {
        self.config.share_expiry_days = days;
        self
    }

    pub fn expose_error_detail(mut self, v: bool) -> Self {
        self.config.expose_error_detail = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VaultConfig, VaultError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(VaultError::ValidationFailed(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_dimension < 16 {
            return Err(VaultError::ValidationFailed(format!(
                "max_dimension must be ≥ 16, got {}",
                c.max_dimension
            )));
        }
        if c.thumbnail_dimension == 0 || c.thumbnail_dimension > c.max_dimension {
            return Err(VaultError::ValidationFailed(format!(
                "thumbnail_dimension must be 1–{}, got {}",
                c.max_dimension, c.thumbnail_dimension
            )));
        }
        if c.cache_capacity == 0 {
            return Err(VaultError::ValidationFailed(
                "cache_capacity must be ≥ 1".into(),
            ));
        }
        if c.share_expiry_days < 0 {
            return Err(VaultError::ValidationFailed(
                "share_expiry_days must not be negative".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_limits() {
        let c = VaultConfig::default();
        assert_eq!(c.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(c.max_dimension, 2048);
        assert_eq!(c.share_expiry_days, 7);
        assert_eq!(c.cache_ttl_secs, 300);
        assert!(!c.expose_error_detail);
    }

    #[test]
    fn builder_clamps_quality() {
        let c = VaultConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(c.jpeg_quality, 1);
        let c = VaultConfig::builder().jpeg_quality(250).build().unwrap();
        assert_eq!(c.jpeg_quality, 100);
    }

    #[test]
    fn builder_rejects_oversized_thumbnail() {
        let err = VaultConfig::builder()
            .max_dimension(256)
            .thumbnail_dimension(512)
            .build();
        assert!(err.is_err());
    }
}
