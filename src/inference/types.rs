//! Shared types for the inference client.
//!
//! The wire types mirror the OpenAI Chat Completions API; the session and
//! result types are what the pipeline hands back to the controller.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Everything the remote client needs for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl<'a> From<&'a CompletionRequest> for ChatCompletionRequest<'a> {
    fn from(req: &'a CompletionRequest) -> Self {
        Self {
            model: &req.model,
            messages: &req.messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            stream: false,
        }
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Non-streaming response body. Only the fields we read are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Bearer token plus optional base-URL override, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Credentials + selected model, passed by reference to every call.
///
/// Switching endpoint builds a new session with [`Session::with_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    credentials: Credentials,
    model: String,
}

impl Session {
    pub fn new(credentials: Credentials, model: impl Into<String>) -> Self {
        Self {
            credentials,
            model: model.into(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            credentials: self.credentials.clone(),
            model: model.into(),
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Outcome of a connection probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionResult {
    pub success: bool,
    pub message: String,
}

/// Outcome of an inference call. `payload` is pretty JSON, the raw model
/// text, or an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub success: bool,
    pub payload: String,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
