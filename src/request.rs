use serde_json::{Map, Value};

use crate::error::ChatError;

/// A validated chat request body
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Raw history entries, normalized later
    pub history: Vec<Value>,
    /// The new message, already trimmed and non-empty
    pub message: String,
}

impl ChatRequest {
    /// Parse and validate a raw request body. An empty body reads as `{}`.
    pub fn decode(body: &[u8]) -> Result<Self, ChatError> {
        let value: Value = if body.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body).map_err(ChatError::InvalidJson)?
        };

        let Value::Object(mut fields) = value else {
            return Err(ChatError::InvalidRequest);
        };

        let history = match fields.remove("history") {
            Some(Value::Array(history)) => history,
            _ => return Err(ChatError::InvalidRequest),
        };

        let message = match fields.get("message").and_then(Value::as_str).map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => return Err(ChatError::InvalidRequest),
        };

        Ok(ChatRequest { history, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_history_and_trims_message() {
        let body = br#"{"history":[{"role":"user","parts":[{"text":"a"}]}],"message":"  hi  "}"#;
        let request = ChatRequest::decode(body).unwrap();
        assert_eq!(request.message, "hi");
        assert_eq!(
            request.history,
            vec![json!({"role": "user", "parts": [{"text": "a"}]})]
        );
    }

    #[test]
    fn malformed_json_is_invalid_json() {
        for body in [&b"{not json"[..], b"   ", b"\xff\xfe", b"{\"message\": \"hi\""] {
            assert!(matches!(
                ChatRequest::decode(body),
                Err(ChatError::InvalidJson(_))
            ));
        }
    }

    #[test]
    fn empty_body_is_missing_fields() {
        assert!(matches!(
            ChatRequest::decode(b""),
            Err(ChatError::InvalidRequest)
        ));
        assert!(matches!(
            ChatRequest::decode(b"{}"),
            Err(ChatError::InvalidRequest)
        ));
    }

    #[test]
    fn message_must_be_non_blank_string() {
        for body in [
            json!({"history": []}),
            json!({"history": [], "message": ""}),
            json!({"history": [], "message": " \n\t "}),
            json!({"history": [], "message": 5}),
            json!({"history": [], "message": null}),
        ] {
            let bytes = serde_json::to_vec(&body).unwrap();
            assert!(
                matches!(ChatRequest::decode(&bytes), Err(ChatError::InvalidRequest)),
                "expected rejection for {body}"
            );
        }
    }

    #[test]
    fn history_must_be_a_list() {
        for body in [
            json!({"message": "hi"}),
            json!({"history": null, "message": "hi"}),
            json!({"history": {}, "message": "hi"}),
            json!({"history": "[]", "message": "hi"}),
        ] {
            let bytes = serde_json::to_vec(&body).unwrap();
            assert!(matches!(
                ChatRequest::decode(&bytes),
                Err(ChatError::InvalidRequest)
            ));
        }
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        for body in [&b"[]"[..], b"\"hi\"", b"42", b"null"] {
            assert!(matches!(
                ChatRequest::decode(body),
                Err(ChatError::InvalidRequest)
            ));
        }
    }
}
