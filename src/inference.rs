use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use std::time::Duration;

use crate::config::{MAX_TOKENS, SYSTEM_PROMPT};
use crate::error::{BackendFailure, ExplorerError, Result};
use crate::models::{ChatCompletionChunk, ChatCompletionRequest, InferenceRequest, Message};

// Marker the backend sends as the final SSE payload
const DONE_MARKER: &str = "[DONE]";

/// Streaming chat-completion client for the hosted inference API.
///
/// One call, one stream: no retries here, a transport failure ends the
/// stream with a `Backend` error.
#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    api_base: String,
    default_token: Option<String>,
}

impl InferenceClient {
    pub fn new(
        api_base: impl Into<String>,
        default_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::Config(format!("cannot build http client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            default_token: default_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Caller's credential when present and non-blank, else the process default.
    pub fn resolve_credential(&self, credential: Option<&str>) -> Option<String> {
        match credential.map(str::trim) {
            Some(token) if !token.is_empty() => Some(token.to_string()),
            _ => self.default_token.clone(),
        }
    }

    pub fn chat_url(&self, model: &str) -> String {
        format!("{}/models/{}/v1/chat/completions", self.api_base, model)
    }

    /// Lazily stream text fragments for one backend, in arrival order.
    pub fn stream(&self, request: InferenceRequest) -> impl Stream<Item = Result<String>> + Send + 'static {
        let http = self.http.clone();
        let url = self.chat_url(&request.backend.model);
        let token = self.resolve_credential(request.credential.as_deref());
        let backend = request.backend.model.clone();
        let body = ChatCompletionRequest {
            model: request.backend.model,
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(request.prompt)],
            max_tokens: MAX_TOKENS,
            stream: true,
        };

        async_stream::try_stream! {
            let response = open(&http, &url, &body, token.as_deref(), &backend).await?;

            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| {
                    ExplorerError::backend(&backend, BackendFailure::Stream(e.to_string()))
                })?;
                if event.data.trim() == DONE_MARKER {
                    break;
                }
                let fragment = parse_chunk(&event.data)
                    .map_err(|failure| ExplorerError::backend(&backend, failure))?;
                if let Some(fragment) = fragment {
                    yield fragment;
                }
            }
        }
    }
}

// Send the request; a non-2xx answer becomes a `Status` failure
async fn open(
    http: &reqwest::Client,
    url: &str,
    body: &ChatCompletionRequest,
    token: Option<&str>,
    backend: &str,
) -> Result<reqwest::Response> {
    let mut builder = http
        .post(url)
        .header(ACCEPT, "text/event-stream")
        .json(body);
    if let Some(token) = token {
        builder = builder.bearer_auth(token);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| ExplorerError::backend(backend, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExplorerError::backend(
        backend,
        BackendFailure::Status { status: status.as_u16(), body },
    ))
}

/// Text carried by one SSE payload, if any.
pub fn parse_chunk(data: &str) -> std::result::Result<Option<String>, BackendFailure> {
    let malformed = |reason: String| BackendFailure::Malformed {
        data: data.to_string(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| malformed(e.to_string()))?;

    if let Some(error) = value.get("error") {
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| other.to_string(), str::to_string),
        };
        return Err(BackendFailure::Api(message));
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
