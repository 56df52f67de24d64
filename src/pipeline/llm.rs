//! Model interaction: send the prompt and the leaf image, return raw text.
//!
//! [`GenerationProvider`] is the seam between the pipeline and whichever
//! service answers. The shipped implementation, [`GeminiProvider`], calls
//! Gemini's `generateContent` REST endpoint directly with `reqwest`; tests
//! and hosts with their own gateway plug in another implementation through
//! [`crate::config::DiagnosisConfigBuilder::provider`].
//!
//! ## Failure policy
//!
//! One request, no retry. Transport errors, non-2xx statuses, a blocked
//! prompt, a candidate stopped for safety and an answer without text all
//! collapse into [`DiagnosisError::GenerationFailed`]; the pipeline aborts
//! before anything is parsed or written.

use crate::config::{DiagnosisConfig, GenerationConfig, SafetySetting, API_KEY_ENV};
use crate::error::DiagnosisError;
use crate::pipeline::encode::{encode_image, InlineData};
use crate::pipeline::input::ImagePayload;
use crate::prompts::DIAGNOSIS_PROMPT;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything that turns (instruction, image) into free text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Run one generation. Must not retry internally.
    async fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<String, DiagnosisError>;
}

/// Ask the provider for a diagnosis of `image` using the fixed prompt.
pub async fn request_diagnosis(
    provider: &Arc<dyn GenerationProvider>,
    image: &ImagePayload,
) -> Result<String, DiagnosisError> {
    let start = Instant::now();
    info!("Requesting diagnosis from {}", provider.name());

    match provider.generate(DIAGNOSIS_PROMPT, image).await {
        Ok(text) => {
            debug!(
                "{} answered {} chars in {:?}",
                provider.name(),
                text.len(),
                start.elapsed()
            );
            Ok(text)
        }
        Err(e) => {
            warn!("{} failed after {:?}: {}", provider.name(), start.elapsed(), e);
            Err(e)
        }
    }
}

// ── Gemini ───────────────────────────────────────────────────────────────

/// Everything [`GeminiProvider`] needs, fixed at construction.
#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub generation: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("generation", &self.generation)
            .field("safety_settings", &self.safety_settings)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiSettings {
    /// Take model, endpoint, constants and timeout from `config`.
    pub fn from_config(config: &DiagnosisConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            generation: config.generation.clone(),
            safety_settings: config.safety_settings.clone(),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Full `generateContent` URL for the configured model.
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Gemini `generateContent` client.
pub struct GeminiProvider {
    settings: GeminiSettings,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings) -> Result<Self, DiagnosisError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DiagnosisError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<String, DiagnosisError> {
        let body = build_request(prompt, image, &self.settings);

        let response = self
            .client
            .post(self.settings.url())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("request timed out after {}s", self.settings.timeout.as_secs())
                } else {
                    format!("request failed: {e}")
                };
                DiagnosisError::GenerationFailed { detail }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DiagnosisError::GenerationFailed {
                detail: format!("HTTP {}: {}", status, api_error_message(&text)),
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| DiagnosisError::GenerationFailed {
                    detail: format!("unreadable response: {e}"),
                })?;

        extract_text(parsed)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: &'a GenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Ordered (instruction, image) request with the fixed constants.
pub(crate) fn build_request<'a>(
    prompt: &'a str,
    image: &ImagePayload,
    settings: &'a GeminiSettings,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::Text { text: prompt },
                RequestPart::Image {
                    inline_data: encode_image(image),
                },
            ],
        }],
        generation_config: &settings.generation,
        safety_settings: &settings.safety_settings,
    }
}

/// Finish reasons that mean the answer was withheld.
const BLOCKED_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Pull the answer text out of a response, or explain why there is none.
pub(crate) fn extract_text(response: GenerateContentResponse) -> Result<String, DiagnosisError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(DiagnosisError::GenerationFailed {
            detail: format!("prompt blocked: {reason}"),
        });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| DiagnosisError::GenerationFailed {
            detail: "response contained no candidates".into(),
        })?;

    let finish = candidate.finish_reason.unwrap_or_default();
    if BLOCKED_FINISH_REASONS.contains(&finish.as_str()) {
        return Err(DiagnosisError::GenerationFailed {
            detail: format!("response blocked: {finish}"),
        });
    }

    // A present but empty text part is an empty answer, not a failure.
    let parts = candidate
        .content
        .and_then(|c| c.parts)
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| DiagnosisError::GenerationFailed {
            detail: format!("candidate has no content (finish reason: {finish})"),
        })?;

    Ok(parts.into_iter().filter_map(|p| p.text).collect())
}

/// Best-effort `error.message` from a Gemini error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Pick the API key: explicit value first, then the environment value.
pub(crate) fn resolve_api_key(explicit: Option<&str>, from_env: Option<String>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or(from_env)
        .filter(|k| !k.trim().is_empty())
}

/// Resolve the provider for a config.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Gemini** — with `config.api_key`, falling back to `GOOGLE_API_KEY`.
pub fn resolve_provider(config: &DiagnosisConfig) -> Result<Arc<dyn GenerationProvider>, DiagnosisError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let api_key = resolve_api_key(config.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
        .ok_or_else(|| DiagnosisError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: format!("Set {API_KEY_ENV} or pass --api-key."),
        })?;

    let settings = GeminiSettings::from_config(config, api_key);
    debug!("Using Gemini model {} at {}", settings.model, settings.endpoint);
    Ok(Arc::new(GeminiProvider::new(settings)?))
}
