//! Validation of the extracted document.

use serde_json::Value;

/// Result of validating an extracted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub message: String,
    pub parsed: Option<Value>,
}

impl ValidationOutcome {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            parsed: None,
        }
    }
}

/// Checks an extracted payload against the expected document shape.
pub trait OutputValidator: Send + Sync {
    fn validate(&self, text: &str) -> ValidationOutcome;
}

/// Accepts a JSON object containing every configured top-level key.
#[derive(Debug, Clone, Default)]
pub struct JsonDocumentValidator {
    required_keys: Vec<String>,
}

impl JsonDocumentValidator {
    pub fn new(required_keys: Vec<String>) -> Self {
        Self { required_keys }
    }
}

impl OutputValidator for JsonDocumentValidator {
    fn validate(&self, text: &str) -> ValidationOutcome {
        let parsed: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return ValidationOutcome::invalid(format!("not valid JSON: {e}")),
        };

        let Some(object) = parsed.as_object() else {
            return ValidationOutcome::invalid(format!(
                "expected a JSON object, found {}",
                kind_of(&parsed)
            ));
        };

        let missing: Vec<&str> = self
            .required_keys
            .iter()
            .filter(|k| !object.contains_key(k.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return ValidationOutcome::invalid(format!(
                "missing required keys: {}",
                missing.join(", ")
            ));
        }

        ValidationOutcome {
            is_valid: true,
            message: "ok".to_string(),
            parsed: Some(parsed),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
