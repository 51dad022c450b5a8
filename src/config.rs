//! Configuration types for the image-to-flashcard pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The credential and both endpoints are
//! injected here once and then shared read-only by every stage, so they can
//! be rotated, sourced from a secret store, or pointed at a test double
//! without touching pipeline code.

use crate::error::Img2CardsError;
use crate::pipeline::transport::HttpTransport;
use crate::progress::ProgressCallback;
use crate::prompts::TEXT_PLACEHOLDER;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the bearer token for both endpoints.
pub const ENV_API_KEY: &str = "IMG2CARDS_API_KEY";
/// Environment variable holding the OCR endpoint URL.
pub const ENV_OCR_URL: &str = "IMG2CARDS_OCR_URL";
/// Environment variable holding the generation endpoint URL.
pub const ENV_GENERATION_URL: &str = "IMG2CARDS_GENERATION_URL";

/// Bearer credential shared by the OCR and synthesis stages.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Configuration for the image-to-flashcard pipeline.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::from_env()`].
///
/// # Example
/// ```rust
/// use img2cards::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_key("sk-test")
///     .ocr_endpoint("https://ocr.example.com/v1/ocr")
///     .generation_endpoint("https://llm.example.com/v1/complete")
///     .max_tokens(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 80);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Bearer token sent to both endpoints.
    pub api_key: ApiKey,

    /// OCR endpoint receiving `{"image_data": …}`.
    pub ocr_endpoint: Url,

    /// Generation endpoint receiving `{"prompt": …, "max_tokens": …}`.
    pub generation_endpoint: Url,

    /// JPEG quality, 1–100. Default: 80.
    ///
    /// 80 keeps printed text legible to the OCR service while a 12 MP phone
    /// photo stays around 1–2 MB before base64 inflation.
    pub jpeg_quality: u8,

    /// Upper bound on generated tokens per synthesis call. Default: 1000.
    pub max_tokens: usize,

    /// Custom synthesis instruction. Must contain `{text}`. If None, uses
    /// [`crate::prompts::DEFAULT_FLASHCARD_PROMPT`].
    pub prompt_template: Option<String>,

    /// Treat non-2xx responses as [`crate::error::RequestError::HttpStatus`].
    /// Default: true.
    ///
    /// When false, the body of any response is decoded as if it were a
    /// success, so an error page only surfaces as a decode failure.
    pub check_status: bool,

    /// Per-request timeout. None leaves reqwest's defaults in place.
    pub request_timeout: Option<Duration>,

    /// Number of images processed at once in batch mode. Default: 4.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed transport. Takes precedence over the built-in
    /// reqwest client.
    pub transport: Option<Arc<dyn HttpTransport>>,

    /// Receives stage transitions as each image moves through the pipeline.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &self.api_key)
            .field("ocr_endpoint", &self.ocr_endpoint.as_str())
            .field("generation_endpoint", &self.generation_endpoint.as_str())
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_tokens", &self.max_tokens)
            .field("prompt_template", &self.prompt_template.as_ref().map(|_| "<custom>"))
            .field("check_status", &self.check_status)
            .field("request_timeout", &self.request_timeout)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn HttpTransport>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Build a config from `IMG2CARDS_API_KEY`, `IMG2CARDS_OCR_URL` and
    /// `IMG2CARDS_GENERATION_URL`, leaving everything else at its default.
    pub fn from_env() -> Result<Self, Img2CardsError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Img2CardsError::InvalidConfig(format!("{name} is not set")))
        };

        Self::builder()
            .api_key(var(ENV_API_KEY)?)
            .ocr_endpoint(var(ENV_OCR_URL)?)
            .generation_endpoint(var(ENV_GENERATION_URL)?)
            .build()
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    api_key: Option<ApiKey>,
    ocr_endpoint: Option<String>,
    generation_endpoint: Option<String>,
    jpeg_quality: u8,
    max_tokens: usize,
    prompt_template: Option<String>,
    check_status: bool,
    request_timeout: Option<Duration>,
    concurrency: usize,
    download_timeout_secs: u64,
    transport: Option<Arc<dyn HttpTransport>>,
    progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            ocr_endpoint: None,
            generation_endpoint: None,
            jpeg_quality: 80,
            max_tokens: 1000,
            prompt_template: None,
            check_status: true,
            request_timeout: None,
            concurrency: 4,
            download_timeout_secs: 120,
            transport: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("api_key", &self.api_key)
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("generation_endpoint", &self.generation_endpoint)
            .finish_non_exhaustive()
    }
}

impl PipelineConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(key));
        self
    }

    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.ocr_endpoint = Some(url.into());
        self
    }

    pub fn generation_endpoint(mut self, url: impl Into<String>) -> Self {
        self.generation_endpoint = Some(url.into());
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn check_status(mut self, v: bool) -> Self {
        self.check_status = v;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Img2CardsError> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Img2CardsError::InvalidConfig("API key is required".into()))?;

        let ocr_endpoint = parse_endpoint("OCR endpoint", self.ocr_endpoint)?;
        let generation_endpoint = parse_endpoint("generation endpoint", self.generation_endpoint)?;

        if self.max_tokens == 0 {
            return Err(Img2CardsError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }

        if let Some(ref t) = self.prompt_template {
            if !t.contains(TEXT_PLACEHOLDER) {
                return Err(Img2CardsError::InvalidConfig(format!(
                    "prompt template must contain {TEXT_PLACEHOLDER}"
                )));
            }
        }

        Ok(PipelineConfig {
            api_key,
            ocr_endpoint,
            generation_endpoint,
            jpeg_quality: self.jpeg_quality,
            max_tokens: self.max_tokens,
            prompt_template: self.prompt_template,
            check_status: self.check_status,
            request_timeout: self.request_timeout,
            concurrency: self.concurrency,
            download_timeout_secs: self.download_timeout_secs,
            transport: self.transport,
            progress_callback: self.progress_callback,
        })
    }
}

fn parse_endpoint(what: &str, raw: Option<String>) -> Result<Url, Img2CardsError> {
    let raw = raw.ok_or_else(|| Img2CardsError::InvalidConfig(format!("{what} is required")))?;
    let url = Url::parse(raw.trim())
        .map_err(|e| Img2CardsError::InvalidConfig(format!("{what} '{raw}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Img2CardsError::InvalidConfig(format!(
            "{what} must be http or https, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineConfigBuilder {
        PipelineConfig::builder()
            .api_key("secret-key")
            .ocr_endpoint("https://ocr.example.com/ocr")
            .generation_endpoint("https://llm.example.com/llm")
    }

    #[test]
    fn defaults_follow_baseline() {
        let c = base().build().unwrap();
        assert_eq!(c.jpeg_quality, 80);
        assert_eq!(c.max_tokens, 1000);
        assert!(c.check_status);
        assert!(c.request_timeout.is_none());
        assert!(c.transport.is_none());
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = PipelineConfig::builder()
            .ocr_endpoint("https://a.example")
            .generation_endpoint("https://b.example")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("API key"));

        let err = base().api_key("   ").build().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn endpoints_must_be_http() {
        let err = base().ocr_endpoint("ftp://ocr.example.com").build().unwrap_err();
        assert!(err.to_string().contains("http or https"), "got: {err}");

        let err = base().generation_endpoint("not a url").build().unwrap_err();
        assert!(err.to_string().contains("not a URL"), "got: {err}");
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(base().jpeg_quality(0).build().unwrap().jpeg_quality, 1);
        assert_eq!(base().jpeg_quality(250).build().unwrap().jpeg_quality, 100);
    }

    #[test]
    fn template_needs_placeholder() {
        assert!(base().prompt_template("Make cards").build().is_err());
        assert!(base().prompt_template("Make cards from {text}").build().is_ok());
    }

    #[test]
    fn zero_max_tokens_rejected() {
        assert!(base().max_tokens(0).build().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let c = base().build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn debug_lists_download_timeout() {
        let c = base().download_timeout_secs(42).build().unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("download_timeout_secs: 42"), "got: {dbg}");
    }
}
