use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::server::json_response;

/// Everything that can end a chat request early.
///
/// Each variant carries exactly what its response body may reveal; anything
/// else stays in the server log.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing OPENAI_API_KEY")]
    MissingApiKey,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing 'message' or invalid 'history'")]
    InvalidRequest,

    #[error("OpenAI request failed with status {status}")]
    UpstreamStatus {
        status: StatusCode,
        details: Option<Value>,
    },

    #[error("Unable to reach OpenAI: {0}")]
    UpstreamUnreachable(String),

    #[error("Internal server error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    /// Build the upstream-status variant from a raw error body
    pub fn from_upstream(status: StatusCode, raw_body: &str) -> Self {
        ChatError::UpstreamStatus {
            status,
            details: upstream_details(raw_body),
        }
    }

    /// Status sent back to our caller
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::MissingApiKey | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ChatError::InvalidJson(_) | ChatError::InvalidRequest => StatusCode::BAD_REQUEST,
            // Client errors pass through so auth, quota and model problems stay visible.
            ChatError::UpstreamStatus { status, .. } if status.is_client_error() => *status,
            ChatError::UpstreamStatus { .. } | ChatError::UpstreamUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn body(&self) -> Value {
        match self {
            ChatError::MissingApiKey => json!({ "error": "Missing OPENAI_API_KEY" }),
            ChatError::InvalidJson(_) => json!({ "error": "Invalid JSON body" }),
            ChatError::InvalidRequest => {
                json!({ "error": "Missing 'message' or invalid 'history'" })
            }
            ChatError::UpstreamStatus { status, details } => {
                let mut body = Map::new();
                body.insert("error".into(), json!("OpenAI request failed"));
                body.insert("status".into(), json!(status.as_u16()));
                if let Some(details) = details {
                    body.insert("details".into(), details.clone());
                }
                Value::Object(body)
            }
            ChatError::UpstreamUnreachable(reason) => {
                json!({ "error": "Unable to reach OpenAI", "details": reason })
            }
            ChatError::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ChatError::Internal(err) => tracing::error!(error = ?err, "chat request failed"),
            ChatError::UpstreamStatus { .. } | ChatError::UpstreamUnreachable(_) => {
                tracing::warn!(status = status.as_u16(), "{}", self)
            }
            _ => tracing::debug!(status = status.as_u16(), "{}", self),
        }
        json_response(status, &self.body())
    }
}

/// What an upstream error body contributes to `details`.
///
/// JSON objects contribute their `error` member when present, other JSON
/// values are kept whole, and non-JSON text is passed through unless empty.
fn upstream_details(raw_body: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw_body) {
        Ok(Value::Object(mut object)) => match object.remove("error") {
            Some(inner) => Some(inner),
            None => Some(Value::Object(object)),
        },
        Ok(other) => Some(other),
        Err(_) if raw_body.is_empty() => None,
        Err(_) => Some(Value::String(raw_body.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_client_errors_keep_their_status() {
        for code in [400, 401, 403, 404, 429] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = ChatError::from_upstream(status, "");
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn other_upstream_statuses_become_bad_gateway() {
        for code in [500, 502, 503, 504, 304] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = ChatError::from_upstream(status, "");
            assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn upstream_details_unwrap_error_member() {
        let details = upstream_details(r#"{"error":{"message":"Rate limit","code":"rate_limit"}}"#);
        assert_eq!(
            details,
            Some(json!({"message": "Rate limit", "code": "rate_limit"}))
        );
    }

    #[test]
    fn upstream_details_keep_objects_without_error_member() {
        let details = upstream_details(r#"{"message":"nope"}"#);
        assert_eq!(details, Some(json!({"message": "nope"})));

        let details = upstream_details("[1,2]");
        assert_eq!(details, Some(json!([1, 2])));
    }

    #[test]
    fn upstream_details_fall_back_to_text_or_nothing() {
        assert_eq!(
            upstream_details("<html>bad gateway</html>"),
            Some(json!("<html>bad gateway</html>"))
        );
        assert_eq!(upstream_details(""), None);
    }

    #[test]
    fn upstream_body_includes_status_and_details() {
        let err = ChatError::from_upstream(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":"slow down"}"#,
        );
        assert_eq!(
            err.body(),
            json!({"error": "OpenAI request failed", "status": 429, "details": "slow down"})
        );

        let err = ChatError::from_upstream(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            err.body(),
            json!({"error": "OpenAI request failed", "status": 500})
        );
    }

    #[test]
    fn internal_errors_reveal_nothing() {
        let err = ChatError::Internal(anyhow::anyhow!("secret stack detail"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({"error": "Internal server error"}));
    }

    #[test]
    fn local_failures_map_to_fixed_bodies() {
        assert_eq!(ChatError::MissingApiKey.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ChatError::MissingApiKey.body(),
            json!({"error": "Missing OPENAI_API_KEY"})
        );
        assert_eq!(ChatError::InvalidRequest.status(), StatusCode::BAD_REQUEST);

        let err = ChatError::UpstreamUnreachable("connection refused".to_string());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.body(),
            json!({"error": "Unable to reach OpenAI", "details": "connection refused"})
        );
    }
}
