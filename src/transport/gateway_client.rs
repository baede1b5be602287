use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use super::error_body::sanitize_upstream_error;
use crate::config::GatewayConfig;
use crate::error::StreamError;
use crate::stream::ChatMessage;

/// Response body of a streaming completion, chunked as the network delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Wire body of a streaming chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    #[must_use]
    pub fn streaming(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature: None,
        }
    }
}

/// No total deadline: an answer may legitimately stream for minutes. Only the
/// silence between two reads is bounded.
fn build_reqwest_client(config: &GatewayConfig) -> Result<reqwest::Client, StreamError> {
    let mut builder = reqwest::Client::builder()
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .read_timeout(Duration::from_secs(config.timeout_secs));

    if !config.use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| StreamError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for the LLM gateway.
///
/// Opens the SSE response and hands its body to the caller; it never reads
/// the body itself.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    chat_url: String,
    authorization: HeaderValue,
}

impl GatewayClient {
    /// Build a client with pooling and timeouts from the gateway config.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] when the API key is not a valid header
    /// value and [`StreamError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, StreamError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| {
                StreamError::Config("gateway.api_key contains invalid header characters".into())
            })?;
        authorization.set_sensitive(true);

        Ok(Self {
            client: build_reqwest_client(config)?,
            chat_url: config.chat_url(),
            authorization,
        })
    }

    #[must_use]
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// POST the request and return the response body as a byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] when the request cannot be sent and
    /// [`StreamError::Upstream`] when the gateway answers with a non-2xx
    /// status, before any streaming starts.
    pub async fn open_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, StreamError> {
        let body = serde_json::to_vec(request)
            .map_err(|err| StreamError::Internal(format!("Failed to encode request: {err}")))?;

        let response = self
            .client
            .post(&self.chat_url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .body(body)
            .send()
            .await
            .map_err(|err| StreamError::Transport(format!("Request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = sanitize_upstream_error(&body);
            tracing::warn!(status = status.as_u16(), "gateway rejected request: {message}");
            return Err(StreamError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(status = status.as_u16(), url = %self.chat_url, "stream opened");
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(StreamError::from)),
        ))
    }
}
