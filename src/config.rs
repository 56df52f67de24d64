//! Configuration types for plant-leaf diagnosis.
//!
//! All request behaviour is controlled through [`DiagnosisConfig`], built via
//! its [`DiagnosisConfigBuilder`]. The config is an immutable value handed to
//! the provider at construction; nothing is read from global state after
//! [`DiagnosisConfigBuilder::build`] returns, except the `GOOGLE_API_KEY`
//! fallback consulted when no key was set explicitly.
//!
//! The generation parameters and safety thresholds are constants of the
//! diagnosis prompt, not per-request knobs: [`GenerationConfig::default`] and
//! [`SafetySetting::defaults`] are what every call sends.

use crate::error::DiagnosisError;
use crate::pipeline::llm::GenerationProvider;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Base URL of the Gemini REST API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Configuration for a diagnosis request.
///
/// Built via [`DiagnosisConfig::builder()`] or using
/// [`DiagnosisConfig::default()`].
///
/// # Example
/// ```rust
/// use leafdoc::DiagnosisConfig;
///
/// let config = DiagnosisConfig::builder()
///     .model("gemini-1.5-flash")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct DiagnosisConfig {
    /// API key. If None, `GOOGLE_API_KEY` is read when the provider is built.
    pub api_key: Option<String>,

    /// Model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// REST base URL, without a trailing slash.
    pub endpoint: String,

    /// Sampling parameters sent with every call.
    pub generation: GenerationConfig,

    /// Content-safety thresholds sent with every call.
    pub safety_settings: Vec<SafetySetting>,

    /// Per-call timeout for the model request in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Directory receiving the PDF reports. None means the platform temp dir.
    pub output_dir: Option<PathBuf>,

    /// Pre-constructed provider. Takes precedence over the Gemini settings.
    pub provider: Option<Arc<dyn GenerationProvider>>,

    /// Optional stage events for the host application.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            generation: GenerationConfig::default(),
            safety_settings: SafetySetting::defaults(),
            api_timeout_secs: 60,
            output_dir: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DiagnosisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("generation", &self.generation)
            .field("safety_settings", &self.safety_settings)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn GenerationProvider>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DiagnosisProgressCallback>"),
            )
            .finish()
    }
}

impl DiagnosisConfig {
    /// Create a new builder for `DiagnosisConfig`.
    pub fn builder() -> DiagnosisConfigBuilder {
        DiagnosisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory the PDF report is written to.
    pub fn report_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`DiagnosisConfig`].
#[derive(Debug)]
pub struct DiagnosisConfigBuilder {
    config: DiagnosisConfig,
}

impl DiagnosisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DiagnosisConfig, DiagnosisError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DiagnosisError::InvalidConfig("Model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(DiagnosisError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if let Some(ref key) = c.api_key {
            if key.trim().is_empty() {
                return Err(DiagnosisError::InvalidConfig("API key must not be empty".into()));
            }
        }
        Ok(self.config)
    }
}

// ── Generation constants ─────────────────────────────────────────────────

/// Sampling parameters, serialised as Gemini's `generationConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 1.0,
            top_k: 32,
            max_output_tokens: 4096,
        }
    }
}

/// Harm categories the provider filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// Severity at and above which content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    #[default]
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

/// One entry of Gemini's `safetySettings` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    /// The four categories, each blocking at medium severity and above.
    pub fn defaults() -> Vec<SafetySetting> {
        [
            HarmCategory::Harassment,
            HarmCategory::HateSpeech,
            HarmCategory::SexuallyExplicit,
            HarmCategory::DangerousContent,
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category,
            threshold: HarmBlockThreshold::BlockMediumAndAbove,
        })
        .collect()
    }
}
