//! Literal escape-sequence substitution for pasted text.

/// Turn literal `\n`, `\t` and `\r` (backslash + letter) into the real
/// characters, in that order.
///
/// Nothing else is recognized: `\\n` still becomes a backslash followed by a
/// newline, because there is no way to tell an escaped backslash from text
/// that genuinely contains one.
pub fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}
