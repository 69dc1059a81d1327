//! Extraction of the JSON payload from `<output>…</output>` tagged model text.
//!
//! Never fails: a missing region passes the text through and a malformed
//! payload becomes a diagnostic string the user can inspect.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// First `<output>` region, non-greedy, `.` matching newlines.
static OUTPUT_REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<output>(.*?)</output>").expect("valid output-tag regex"));

/// Extract and pretty-print the tagged JSON payload in `raw_text`.
///
/// - no `<output>` region: `raw_text` is returned unchanged;
/// - parseable payload: re-serialized with 4-space indentation, key order kept;
/// - unparseable payload: the parse error followed by the captured content.
pub fn extract_output_json(raw_text: &str) -> String {
    let Some(captured) = OUTPUT_REGION
        .captures(raw_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return raw_text.to_string();
    };

    match serde_json::from_str::<serde_json::Value>(captured.trim()) {
        Ok(parsed) => match to_pretty_json(&parsed) {
            Ok(pretty) => pretty,
            Err(e) => format!("Error formatting JSON: {e}\n\nRaw content:\n{captured}"),
        },
        Err(e) => format!("Error parsing JSON: {e}\n\nRaw content:\n{captured}"),
    }
}

/// Serialize with four-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
