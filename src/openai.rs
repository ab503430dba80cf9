//! Client for the OpenAI Responses API.

use anyhow::Context;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use url::Url;

use crate::config::Config;
use crate::error::ChatError;
use crate::history::NormalizedMessage;

/// Body of `POST /v1/responses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<NormalizedMessage>,
    /// Always false: conversations are never persisted upstream.
    pub store: bool,
}

impl ResponsesRequest {
    pub fn new(model: &str, input: Vec<NormalizedMessage>) -> Self {
        Self {
            model: model.to_string(),
            input,
            store: false,
        }
    }
}

/// Sends requests to the Responses endpoint with one pooled connection set
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    responses_url: Url,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            responses_url: config.responses_url.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `input` upstream and return the parsed JSON body of a 2xx response
    pub async fn create_response(
        &self,
        api_key: &str,
        input: Vec<NormalizedMessage>,
    ) -> Result<Value, ChatError> {
        let request = ResponsesRequest::new(&self.model, input);
        let started = Instant::now();

        let response = self
            .http
            .post(self.responses_url.clone())
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream responded"
        );

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read OpenAI error body");
                String::new()
            });
            tracing::warn!(status = status.as_u16(), body = %raw, "OpenAI HTTP error");
            return Err(ChatError::from_upstream(as_http_status(status), &raw));
        }

        let body = response.bytes().await.map_err(classify_transport_error)?;
        let parsed: Value =
            serde_json::from_slice(&body).context("Upstream returned invalid JSON")?;
        Ok(parsed)
    }
}

/// Reqwest and axum may sit on different `http` versions; go through the number.
fn as_http_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Network-level failures become `UpstreamUnreachable`; anything else is internal.
fn classify_transport_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        let reason = root_cause(&err);
        tracing::warn!(error = %err, "OpenAI network error");
        ChatError::UpstreamUnreachable(reason)
    } else {
        ChatError::Internal(anyhow::Error::new(err).context("Upstream request failed"))
    }
}

/// Text of the innermost error in the source chain
fn root_cause(err: &reqwest::Error) -> String {
    let mut current: &dyn std::error::Error = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
