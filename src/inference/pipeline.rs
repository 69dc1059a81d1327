//! Connection probe and inference pipeline.
//!
//! Both functions are boundary-crossing: every failure is folded into the
//! returned `success` flag and message, nothing is propagated.

use super::client::RemoteCompletionClient;
use super::config::ENV_API_KEY;
use super::extraction::extract_output_json;
use super::prompts::PromptTemplates;
use super::types::{ChatMessage, CompletionRequest, ConnectionResult, InferenceResult, Session};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Output-token ceiling for the probe request.
pub const PROBE_MAX_TOKENS: u32 = 10;

/// Output-token ceiling for inference; large enough for a full document.
pub const INFER_MAX_TOKENS: u32 = 8000;

/// Deterministic sampling for both calls.
pub const TEMPERATURE: f32 = 0.0;

/// Message shown when the user submits blank text.
pub const EMPTY_INPUT_MESSAGE: &str = "Error: Please enter some text";

// ─── Probe ───────────────────────────────────────────────────────────────────

/// Confirm the session's model is reachable with a minimal round-trip.
pub async fn probe(client: &dyn RemoteCompletionClient, session: &Session) -> ConnectionResult {
    let request = CompletionRequest {
        model: session.model().to_string(),
        messages: vec![ChatMessage::user("test")],
        max_tokens: PROBE_MAX_TOKENS,
        temperature: TEMPERATURE,
    };

    match client.complete(&request).await {
        Ok(_) => {
            tracing::info!(model = %session.model(), "connection probe succeeded");
            ConnectionResult {
                success: true,
                message: "Connected".to_string(),
            }
        }
        Err(e) => {
            tracing::warn!(
                model = %session.model(),
                error = %e,
                auth = e.is_auth_error(),
                "connection probe failed"
            );
            let message = if e.is_auth_error() {
                format!("Connection failed: {e} (check {ENV_API_KEY})")
            } else {
                format!("Connection failed: {e}")
            };
            ConnectionResult {
                success: false,
                message,
            }
        }
    }
}

// ─── Inference ───────────────────────────────────────────────────────────────

/// Run `user_text` through the model with the named system prompt and
/// extract the tagged JSON payload from the reply.
pub async fn infer(
    client: &dyn RemoteCompletionClient,
    prompts: &dyn PromptTemplates,
    template: &str,
    session: &Session,
    user_text: &str,
) -> InferenceResult {
    if user_text.trim().is_empty() {
        return InferenceResult {
            success: false,
            payload: EMPTY_INPUT_MESSAGE.to_string(),
        };
    }

    let system_prompt = match prompts.load(template) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(template, error = %e, "system prompt unavailable");
            return InferenceResult {
                success: false,
                payload: format!("API Error: {e}"),
            };
        }
    };

    let request = CompletionRequest {
        model: session.model().to_string(),
        messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_text)],
        max_tokens: INFER_MAX_TOKENS,
        temperature: TEMPERATURE,
    };

    match client.complete(&request).await {
        Ok(raw) => {
            let payload = extract_output_json(&raw);
            tracing::info!(
                model = %session.model(),
                response_chars = raw.len(),
                payload_chars = payload.len(),
                "inference complete"
            );
            InferenceResult {
                success: true,
                payload,
            }
        }
        Err(e) => {
            tracing::warn!(model = %session.model(), error = %e, "inference failed");
            InferenceResult {
                success: false,
                payload: format!("API Error: {e}"),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::inference::errors::InferenceError;
    use crate::inference::types::{Credentials, Role};

    /// Scripted transport that records every request it receives.
    pub(crate) struct MockClient {
        reply: Result<String, String>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockClient {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteCompletionClient for MockClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|reason| InferenceError::ConnectionFailed {
                endpoint: "mock".into(),
                reason,
            })
        }
    }

    /// In-memory template source.
    pub(crate) struct MapPrompts(pub HashMap<String, String>);

    impl MapPrompts {
        pub(crate) fn with_infer_prompt() -> Self {
            let mut map = HashMap::new();
            map.insert("infer_prompt.txt".to_string(), "SYSTEM PROMPT".to_string());
            Self(map)
        }
    }

    impl PromptTemplates for MapPrompts {
        fn load(&self, name: &str) -> Result<String, InferenceError> {
            self.0.get(name).cloned().ok_or_else(|| InferenceError::PromptError {
                name: name.to_string(),
                reason: "not found".into(),
            })
        }
    }

    pub(crate) fn session() -> Session {
        Session::new(
            Credentials {
                api_key: "opk_test".into(),
                base_url: None,
            },
            "openpipe:onco-v3",
        )
    }

    #[tokio::test]
    async fn probe_success_reports_connected() {
        let client = MockClient::replying("ok");
        let result = probe(&client, &session()).await;
        assert!(result.success);
        assert_eq!(result.message, "Connected");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "openpipe:onco-v3");
        assert_eq!(requests[0].max_tokens, PROBE_MAX_TOKENS);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].messages, vec![ChatMessage::user("test")]);
    }

    #[tokio::test]
    async fn probe_failure_embeds_transport_error() {
        let client = MockClient::failing("invalid model id");
        let result = probe(&client, &session()).await;
        assert!(!result.success);
        assert!(result.message.starts_with("Connection failed: "));
        assert!(result.message.contains("invalid model id"));
    }

    struct RejectingClient;

    #[async_trait]
    impl RemoteCompletionClient for RejectingClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, InferenceError> {
            Err(InferenceError::HttpError {
                status: 401,
                body: "invalid api key".into(),
            })
        }
    }

    #[tokio::test]
    async fn probe_rejected_key_points_at_env_var() {
        let result = probe(&RejectingClient, &session()).await;
        assert!(!result.success);
        assert!(result.message.starts_with("Connection failed: "));
        assert!(result.message.ends_with("(check OPENPIPE_API_KEY)"));
    }

    #[tokio::test]
    async fn probe_transport_failure_has_no_key_hint() {
        let result = probe(&MockClient::failing("dns error"), &session()).await;
        assert!(!result.message.contains("OPENPIPE_API_KEY"));
    }

    #[tokio::test]
    async fn infer_blank_text_makes_no_call() {
        let client = MockClient::replying("unused");
        let prompts = MapPrompts::with_infer_prompt();
        for text in ["", "   ", "\n\t "] {
            let result = infer(&client, &prompts, "infer_prompt.txt", &session(), text).await;
            assert!(!result.success);
            assert_eq!(result.payload, EMPTY_INPUT_MESSAGE);
        }
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn infer_sends_system_then_user() {
        let client = MockClient::replying(r#"<output>{"dx": "benign"}</output>"#);
        let prompts = MapPrompts::with_infer_prompt();
        let result = infer(&client, &prompts, "infer_prompt.txt", &session(), "biopsy text").await;

        assert!(result.success);
        assert_eq!(result.payload, "{\n    \"dx\": \"benign\"\n}");

        let requests = client.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.max_tokens, INFER_MAX_TOKENS);
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[0].content, "SYSTEM PROMPT");
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.messages[1].content, "biopsy text");
    }

    #[tokio::test]
    async fn infer_untagged_reply_passes_through() {
        let client = MockClient::replying("I cannot help with that.");
        let prompts = MapPrompts::with_infer_prompt();
        let result = infer(&client, &prompts, "infer_prompt.txt", &session(), "text").await;
        assert!(result.success);
        assert_eq!(result.payload, "I cannot help with that.");
    }

    #[tokio::test]
    async fn infer_malformed_payload_still_succeeds() {
        let client = MockClient::replying(r#"<output>{"a":}</output>"#);
        let prompts = MapPrompts::with_infer_prompt();
        let result = infer(&client, &prompts, "infer_prompt.txt", &session(), "text").await;
        assert!(result.success);
        assert!(result.payload.starts_with("Error parsing JSON"));
    }

    #[tokio::test]
    async fn infer_transport_failure_is_api_error() {
        let client = MockClient::failing("connection reset");
        let prompts = MapPrompts::with_infer_prompt();
        let result = infer(&client, &prompts, "infer_prompt.txt", &session(), "text").await;
        assert!(!result.success);
        assert!(result.payload.starts_with("API Error: "));
        assert!(result.payload.contains("connection reset"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn infer_missing_prompt_skips_network() {
        let client = MockClient::replying("unused");
        let prompts = MapPrompts(HashMap::new());
        let result = infer(&client, &prompts, "infer_prompt.txt", &session(), "text").await;
        assert!(!result.success);
        assert!(result.payload.contains("infer_prompt.txt"));
        assert_eq!(client.call_count(), 0);
    }
}
