//! OpenAI-compatible completion client.
//!
//! [`RemoteCompletionClient`] is the seam the pipeline talks to; the
//! production implementation posts a non-streaming chat completion to
//! `{base_url}/chat/completions` with bearer auth.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::errors::InferenceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, Credentials};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Base URL used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openpipe.ai/api/v1";

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total request timeout. A full structured document at 8000 output tokens
/// can take minutes on a hosted fine-tune.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ─── RemoteCompletionClient ──────────────────────────────────────────────────

/// A chat-completion capability: messages in, completion text out.
#[async_trait]
pub trait RemoteCompletionClient: Send + Sync {
    /// Send one completion request and return the assistant's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, InferenceError>;
}

/// Builds a client for a session's credentials.
///
/// The controller asks for a fresh client per call, so credentials never
/// outlive the session that carries them.
pub trait ClientFactory: Send + Sync {
    fn build(&self, credentials: &Credentials)
        -> Result<Arc<dyn RemoteCompletionClient>, InferenceError>;
}

/// Factory for [`OpenAiCompatClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCompatFactory;

impl ClientFactory for OpenAiCompatFactory {
    fn build(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn RemoteCompletionClient>, InferenceError> {
        Ok(Arc::new(OpenAiCompatClient::from_credentials(credentials)?))
    }
}

// ─── OpenAiCompatClient ──────────────────────────────────────────────────────

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatClient {
    /// Build a client from credentials. Does NOT check connectivity; that is
    /// what [`super::pipeline::probe`] is for.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, InferenceError> {
        let base_url = credentials
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url,
            api_key: credentials.api_key.clone(),
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(url: &str, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                duration_secs: REQUEST_TIMEOUT.as_secs(),
            }
        } else {
            InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl RemoteCompletionClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest::from(request);

        // Request metadata only: the messages carry clinical text.
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            max_tokens = body.max_tokens,
            temperature = body.temperature,
            "completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %request.model, "completion rejected");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::ResponseError {
                reason: format!("failed to read response body: {e}"),
            })?;

        parse_completion_response(&body_text)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Pull the first choice's content out of a non-streaming response body.
///
/// `null` content (e.g. the model stopped on `length` before emitting text)
/// is returned as an empty string.
pub fn parse_completion_response(body: &str) -> Result<String, InferenceError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseError {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::ResponseError {
            reason: "empty choices array".into(),
        })?;

    tracing::debug!(finish_reason = ?choice.finish_reason, "completion received");

    Ok(choice.message.content.unwrap_or_default())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
