//! System prompt templates.
//!
//! Templates are opaque text looked up by name (e.g. `infer_prompt.txt`).

use std::path::{Path, PathBuf};

use super::errors::InferenceError;

/// Template used for the inference request.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "infer_prompt.txt";

/// Source of named prompt templates.
pub trait PromptTemplates: Send + Sync {
    fn load(&self, name: &str) -> Result<String, InferenceError>;
}

/// Reads templates from files in a directory.
#[derive(Debug, Clone)]
pub struct DirPromptTemplates {
    root: PathBuf,
}

impl DirPromptTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PromptTemplates for DirPromptTemplates {
    fn load(&self, name: &str) -> Result<String, InferenceError> {
        // Names are plain file names; anything path-like is rejected.
        if name.is_empty() || Path::new(name).components().count() != 1 || name.contains("..") {
            return Err(InferenceError::PromptError {
                name: name.to_string(),
                reason: "template names must be a single file name".into(),
            });
        }

        let path = self.root.join(name);
        let text = std::fs::read_to_string(&path).map_err(|e| InferenceError::PromptError {
            name: name.to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        if text.trim().is_empty() {
            return Err(InferenceError::PromptError {
                name: name.to_string(),
                reason: format!("{} is empty", path.display()),
            });
        }

        tracing::debug!(template = name, bytes = text.len(), "loaded prompt template");
        Ok(text)
    }
}
