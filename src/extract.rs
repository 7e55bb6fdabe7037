//! JSON recovery from noisy model output
//!
//! Model responses may wrap the JSON payload in markdown fences or
//! leading/trailing prose. This module slices out the most plausible payload
//! before parsing. It is a heuristic: an unrelated brace pair appearing
//! before the real payload can still defeat it, which the semantic
//! validation in the retry loop then catches.

use serde::de::DeserializeOwned;

/// Locate the JSON payload inside model output text.
///
/// Order of preference: a ```json fenced block, then the span between the
/// first `{` or `[` (whichever comes first) and the matching last `}`/`]`.
/// When no bracket is found the text is returned unchanged so that JSON
/// parsing fails with a clear syntax error instead of silently dropping the
/// response.
#[must_use]
pub fn extract_json_payload(text: &str) -> &str {
    let text = text.trim();

    if let Some(inner) = fenced_json_block(text) {
        return inner;
    }

    let first_brace = text.find('{');
    let first_bracket = text.find('[');

    let (open, close) = match (first_brace, first_bracket) {
        (Some(b), Some(k)) if k < b => (k, ']'),
        (Some(b), _) => (b, '}'),
        (None, Some(k)) => (k, ']'),
        (None, None) => return text,
    };

    match text.rfind(close) {
        Some(end) if end > open => &text[open..=end],
        _ => text,
    }
}

fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find("```json")?;
    let body = &text[start + "```json".len()..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Extract and parse a typed payload from raw model text.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(extract_json_payload(raw))
}
