//! Chat transport: the seam between the stream pipeline and the network.
//!
//! DESIGN
//! ======
//! [`ChunkSource`] is the only I/O boundary. It yields a lazy, finite,
//! non-restartable stream of [`ResponseChunk`]s for one prompt. The HTTP
//! client speaks to the chat backend either through its SSE endpoint, which
//! yields raw body bytes, or through its one-shot JSON endpoint, which yields
//! one already-decoded [`ChatAnswer`]. The answer is never re-framed as SSE:
//! its prose must not be mistaken for sideband sentinels.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};

use crate::config::{ChatConfig, TransportMode};
use crate::sideband::VideoLink;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request could not be sent or the body stream broke.
    #[error("chat request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("chat backend error: status {status}")]
    Status { status: u16, body: String },

    /// The one-shot JSON answer could not be deserialized.
    #[error("chat response parse failed: {0}")]
    Parse(String),
}

// =============================================================================
// CHUNK SOURCE
// =============================================================================

/// One item delivered by a [`ChunkSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseChunk {
    /// Raw bytes of an SSE body, split at arbitrary points.
    Sse(Vec<u8>),
    /// A complete answer from the one-shot endpoint.
    Answer(ChatAnswer),
}

/// Chunks of one response, in delivery order.
pub type ChunkStream = BoxStream<'static, Result<ResponseChunk, ClientError>>;

/// Opens the response stream for one prompt. Enables scripted sources in tests.
#[async_trait::async_trait]
pub trait ChunkSource: Send + Sync {
    /// Start a request for `message`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the connection cannot be established or
    /// the backend rejects the request.
    async fn open(&self, message: &str) -> Result<ChunkStream, ClientError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Body of the one-shot `POST /chat` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub video_links: Vec<VideoLink>,
}

pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
    mode: TransportMode,
    request_timeout: Duration,
}

impl HttpChatClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ChatConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            mode: config.transport,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        })
    }

    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    async fn open_stream(&self, message: &str) -> Result<ChunkStream, ClientError> {
        let url = format!("{}/chat/stream", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("message", message)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let response = check_status(response).await?;

        tracing::debug!(mode = "stream", "chat response opened");
        let chunks = response
            .bytes_stream()
            .map(|item| {
                item.map(|bytes| ResponseChunk::Sse(bytes.to_vec()))
                    .map_err(|e| ClientError::Request(e.to_string()))
            });
        Ok(chunks.boxed())
    }

    async fn open_json(&self, message: &str) -> Result<ChunkStream, ClientError> {
        let url = format!("{}/chat", self.base_url);
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let response = check_status(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let answer = parse_answer(&text)?;
        tracing::debug!(mode = "json", links = answer.video_links.len(), "chat answer received");
        Ok(stream::iter([Ok(ResponseChunk::Answer(answer))]).boxed())
    }
}

#[async_trait::async_trait]
impl ChunkSource for HttpChatClient {
    async fn open(&self, message: &str) -> Result<ChunkStream, ClientError> {
        match self.mode {
            TransportMode::Stream => self.open_stream(message).await,
            TransportMode::Json => self.open_json(message).await,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status: status.as_u16(), body })
}

/// Parse the one-shot JSON answer.
///
/// # Errors
///
/// Returns [`ClientError::Parse`] when `text` is not a valid answer body.
pub fn parse_answer(text: &str) -> Result<ChatAnswer, ClientError> {
    serde_json::from_str(text).map_err(|e| ClientError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
