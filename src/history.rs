//! Conversation history normalization.
//!
//! Browser clients send Gemini-style entries (`{"role": "model", "parts": [{"text": ..}]}`)
//! and may include arbitrary junk. The Responses API wants a flat list of
//! `{role, content}` messages with a small fixed set of roles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Roles accepted upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Map a client-supplied role. `model` is the client's name for the
    /// assistant; anything unrecognized or missing is treated as the user.
    pub fn from_client(raw: Option<&str>) -> Self {
        match raw {
            Some("model") | Some("assistant") => Role::Assistant,
            Some("system") => Role::System,
            _ => Role::User,
        }
    }
}

/// One message of the upstream `input` list. `content` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub role: Role,
    pub content: String,
}

impl NormalizedMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Convert raw history entries into upstream messages, skipping anything
/// malformed instead of failing.
pub fn normalize_history(history: &[Value]) -> Vec<NormalizedMessage> {
    history.iter().filter_map(normalize_entry).collect()
}

fn normalize_entry(entry: &Value) -> Option<NormalizedMessage> {
    let entry = entry.as_object()?;
    let role = Role::from_client(entry.get("role").and_then(Value::as_str));

    let parts = entry.get("parts")?.as_array()?;

    let fragments: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    if fragments.is_empty() {
        return None;
    }

    Some(NormalizedMessage {
        role,
        content: fragments.join("\n"),
    })
}

/// Normalize `history` and make sure `message` is the final user turn.
///
/// Clients often already include the new message as the last history entry;
/// it is only appended when the last normalized content differs.
pub fn build_input(history: &[Value], message: &str) -> Vec<NormalizedMessage> {
    let mut messages = normalize_history(history);
    let already_last = messages
        .last()
        .is_some_and(|last| last.content == message);
    if !already_last {
        messages.push(NormalizedMessage::user(message));
    }
    messages
}
