//! Inference: OpenAI-compatible completion client and extraction pipeline.
//!
//! This module handles everything between the controller and the remote
//! endpoint:
//! - Configuration from `.env`, the environment and `endpoints.yaml`
//! - The connection probe and the inference call
//! - Extraction of the `<output>`-tagged JSON payload from model text
//!
//! The endpoint is reached through the [`RemoteCompletionClient`] trait, so
//! any OpenAI-compatible provider (or a test double) can stand in.

pub mod client;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod pipeline;
pub mod prompts;
pub mod types;

// Re-exports for convenience
pub use client::{ClientFactory, OpenAiCompatClient, OpenAiCompatFactory, RemoteCompletionClient};
pub use config::{AppConfig, EndpointsFile, EnvVars};
pub use errors::InferenceError;
pub use extraction::extract_output_json;
pub use pipeline::{infer, probe};
pub use prompts::{DirPromptTemplates, PromptTemplates};
pub use types::{
    ChatMessage, CompletionRequest, ConnectionResult, Credentials, InferenceResult, Role, Session,
};
