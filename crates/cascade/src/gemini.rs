//! Google Gemini `generateContent` client.

use crate::{UpstreamClient, UpstreamResponse};
use async_trait::async_trait;
use cascade_error::{CascadeResult, UpstreamError, UpstreamErrorKind};
use cascade_rate_limit::{BackendTier, UpstreamConfig};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Upstream client for the Gemini REST API.
///
/// Each tier id is used as the model name:
/// `POST {base_url}/models/{tier_id}:generateContent`.
///
/// Failures are classified as follows:
/// - 429 or a `RESOURCE_EXHAUSTED` body: `RateLimited`
/// - 503 or a refused connection: `Unavailable`
/// - client-side timeout: `Timeout`
/// - any other status: `Rejected`
#[derive(Debug, Clone)]
pub struct GeminiUpstream {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiUpstream {
    /// Create a client for `base_url` authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> CascadeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cascade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Transport(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from configuration, reading the key from the
    /// configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn from_config(config: &UpstreamConfig) -> CascadeResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                UpstreamError::new(UpstreamErrorKind::MissingApiKey(config.api_key_env.clone()))
            })?;
        Self::new(&config.base_url, api_key)
    }

    /// Endpoint for `tier`.
    pub fn endpoint(&self, tier: &BackendTier) -> String {
        format!("{}/models/{}:generateContent", self.base_url, tier.id)
    }

    fn classify_send_error(error: reqwest::Error, started: Instant) -> UpstreamError {
        let kind = if error.is_timeout() {
            UpstreamErrorKind::Timeout(started.elapsed().as_millis() as u64)
        } else if error.is_connect() {
            UpstreamErrorKind::Unavailable(error.to_string())
        } else {
            UpstreamErrorKind::Transport(error.to_string())
        };
        UpstreamError::new(kind)
    }
}

#[async_trait]
impl UpstreamClient for GeminiUpstream {
    #[instrument(skip(self, tier, content), fields(tier = %tier.id, content_length = content.len()))]
    async fn call(
        &self,
        tier: &BackendTier,
        content: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: content }],
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint(tier))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::classify_send_error(e, started))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::classify_send_error(e, started))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Upstream returned an error status");
            return Err(UpstreamError::new(UpstreamErrorKind::from_status(
                status.as_u16(),
                text,
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::MalformedResponse(format!(
                "invalid JSON body: {}",
                e
            )))
        })?;

        let generated: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if generated.is_empty() {
            return Err(UpstreamError::new(UpstreamErrorKind::MalformedResponse(
                "response carried no text".to_string(),
            )));
        }

        debug!(
            response_length = generated.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Upstream call succeeded"
        );
        Ok(UpstreamResponse::new(generated))
    }
}
