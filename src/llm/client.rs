//! Anthropic Messages API client

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::stream::{Stream, StreamExt};
use tracing::{debug, trace};

use super::messages::{ModelRequest, ModelTurn};
use super::stream::{StreamAccumulator, StreamEvent};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse LLM response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("LLM stream error: {0}")]
    Stream(String),
    #[error("LLM API error ({kind}): {message}")]
    Api { kind: String, message: String },
    #[error("LLM returned an empty response")]
    EmptyResponse,
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

/// Anything that can answer a [`ModelRequest`] with one complete turn
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn respond(&self, request: &ModelRequest) -> Result<ModelTurn, ChatError>;
}

/// Client for an Anthropic-compatible `/v1/messages` endpoint
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: String,
    streaming: bool,
    client: reqwest::Client,
}

impl ChatClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    pub const API_VERSION: &'static str = "2023-06-01";

    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - Sent as the `x-api-key` header
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            streaming: false,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use server-sent events instead of a single JSON response
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn send(&self, request: &ModelRequest, stream: bool) -> Result<reqwest::Response, ChatError> {
        let mut body = serde_json::to_value(request)?;
        if stream {
            body["stream"] = serde_json::Value::Bool(true);
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Send the request and wait for the full JSON response
    pub async fn create(&self, request: &ModelRequest) -> Result<ModelTurn, ChatError> {
        let response = self.send(request, false).await?;
        let text = response.text().await?;
        let turn: ModelTurn = serde_json::from_str(&text)?;
        debug!(
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            "Model response received"
        );
        Ok(turn)
    }

    /// Open a streaming response and yield its decoded events
    pub async fn events(
        &self,
        request: &ModelRequest,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ChatError>>, ChatError> {
        let response = self.send(request, true).await?;
        Ok(decode_events(response.bytes_stream()))
    }

    /// Stream the response and fold it into one complete turn
    pub async fn stream(&self, request: &ModelRequest) -> Result<ModelTurn, ChatError> {
        let events = self.events(request).await?;
        let mut events = Box::pin(events);
        let mut acc = StreamAccumulator::new();

        while let Some(event) = events.next().await {
            if let Some(delta) = acc.push(event?)? {
                trace!(delta = %delta, "Text delta");
            }
            if acc.is_done() {
                break;
            }
        }

        let turn = acc.finish()?;
        debug!(
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            "Model stream completed"
        );
        Ok(turn)
    }
}

/// Decode an SSE byte stream into [`StreamEvent`]s
fn decode_events<S, B>(bytes: S) -> impl Stream<Item = Result<StreamEvent, ChatError>>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    async_stream::try_stream! {
        let mut sse = Box::pin(bytes.eventsource());
        while let Some(event) = sse.next().await {
            let event = event.map_err(|e| ChatError::Stream(e.to_string()))?;
            if event.data.trim().is_empty() {
                continue;
            }
            let parsed: StreamEvent = serde_json::from_str(&event.data)?;
            yield parsed;
        }
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn respond(&self, request: &ModelRequest) -> Result<ModelTurn, ChatError> {
        let turn = if self.streaming {
            self.stream(request).await?
        } else {
            self.create(request).await?
        };
        if turn.content.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::ContentBlock;
    use futures_util::stream;

    #[test]
    fn test_endpoint_and_base_url() {
        let client = ChatClient::new("key").with_base_url("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/messages");
        assert!(!client.is_streaming());
        assert!(client.with_streaming(true).is_streaming());
    }

    #[tokio::test]
    async fn test_decode_events_from_sse_bytes() {
        let raw = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"model\":\"claude\",\"usage\":{\"input_tokens\":3}}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
        );
        // Split mid-event to exercise reassembly across chunks
        let (a, b) = raw.split_at(70);
        let rest = concat!(
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "event: content_block_stop\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(a.as_bytes().to_vec()),
            Ok(b.as_bytes().to_vec()),
            Ok(rest.as_bytes().to_vec()),
        ];

        let events = decode_events(stream::iter(chunks));
        let mut events = Box::pin(events);
        let mut acc = StreamAccumulator::new();
        while let Some(event) = events.next().await {
            acc.push(event.unwrap()).unwrap();
        }
        assert!(acc.is_done());
        let turn = acc.finish().unwrap();
        assert_eq!(turn.content, vec![ContentBlock::text("Hello")]);
        assert_eq!(turn.usage.input_tokens, 3);
    }
}
