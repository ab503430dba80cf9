//! Reply extraction from Responses API bodies.
//!
//! The API exposes generated text in two places: a convenience `output_text`
//! string at the top level, and the canonical nested
//! `output[].content[]` parts. Each shape gets its own matcher, tried in order.

use serde_json::Value;

/// Sent when a successful upstream response carries no usable text
pub const FALLBACK_REPLY: &str = "No response.";

type ShapeMatcher = fn(&Value) -> Option<String>;

const SHAPE_MATCHERS: [ShapeMatcher; 2] = [top_level_output_text, nested_output_text];

/// First non-blank reply text found in `body`, trimmed
pub fn extract_reply(body: &Value) -> Option<String> {
    SHAPE_MATCHERS.iter().find_map(|matcher| matcher(body))
}

/// Like [`extract_reply`], substituting [`FALLBACK_REPLY`]
pub fn reply_or_fallback(body: &Value) -> String {
    extract_reply(body).unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

fn non_blank(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn top_level_output_text(body: &Value) -> Option<String> {
    non_blank(body.get("output_text")?)
}

fn nested_output_text(body: &Value) -> Option<String> {
    body.get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content")?.as_array())
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .find_map(|part| non_blank(part.get("text")?))
}
