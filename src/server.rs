//! HTTP surface of the relay.
//!
//! One chat endpoint for the browser widget, plus a health probe. Every
//! response is JSON and carries permissive CORS headers so the widget can be
//! served from any origin.

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ChatError;
use crate::history::build_input;
use crate::openai::OpenAiClient;
use crate::reply::reply_or_fallback;
use crate::request::ChatRequest;

/// Path the browser widget posts to
pub const CHAT_PATH: &str = "/api/chat";

/// Shared, read-only state for all requests
pub struct AppState {
    pub config: Config,
    pub client: OpenAiClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenAiClient::new(&config)?;
        Ok(Self { config, client })
    }
}

/// Build the router for the given configuration
pub fn router(config: Config) -> Result<Router> {
    let state = Arc::new(AppState::new(config)?);

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route(
            CHAT_PATH,
            post(chat_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler)
                // Oversized bodies must still reach the key check and the JSON writer.
                .layer(DefaultBodyLimit::disable()),
        )
        .fallback(fallback_handler)
        .with_state(state))
}

/// Start the relay and serve until Ctrl-C or SIGTERM
pub async fn start_server(config: Config, addr: SocketAddr) -> Result<()> {
    if config.api_key().is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; chat requests will fail with 500");
    }
    tracing::info!(
        model = %config.model,
        upstream = %config.responses_url,
        timeout_secs = config.timeout.as_secs(),
        api_key_set = config.api_key().is_some(),
        "config loaded"
    );

    let app = router(config)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, path = CHAT_PATH, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

/// Serialize `body` with the headers every response carries
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    let bytes = body.to_string().into_bytes();
    let length = bytes.len();

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

/// Health check endpoint
async fn health_handler() -> Response {
    json_response(StatusCode::OK, &json!({ "ok": true }))
}

/// CORS preflight; the body is never inspected
async fn preflight_handler() -> Response {
    json_response(StatusCode::OK, &json!({ "ok": true }))
}

async fn method_not_allowed_handler() -> Response {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "error": "Method not allowed" }),
    )
}

async fn fallback_handler(req: axum::extract::Request) -> Response {
    tracing::debug!(uri = %req.uri(), "no route");
    json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))
}

/// Main chat endpoint
async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match relay_chat(&state, &body).await {
        Ok(reply) => json_response(StatusCode::OK, &json!({ "reply": reply })),
        Err(err) => err.into_response(),
    }
}

async fn relay_chat(state: &AppState, body: &[u8]) -> Result<String, ChatError> {
    // The key check comes first so a misconfigured deployment is obvious
    // no matter what the client sends.
    let api_key = state.config.api_key().ok_or(ChatError::MissingApiKey)?;

    let request = ChatRequest::decode(body)?;
    let input = build_input(&request.history, &request.message);
    tracing::info!(
        history = request.history.len(),
        messages = input.len(),
        model = state.client.model(),
        "relaying chat request"
    );

    let upstream = state.client.create_response(api_key, input).await?;
    let reply = reply_or_fallback(&upstream);
    tracing::info!(reply_chars = reply.chars().count(), "chat reply ready");
    Ok(reply)
}
