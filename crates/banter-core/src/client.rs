use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::{
    ChangeModelRequest, ChatRequest, ChatResponse, CurrentModel, ModelEntry, ModelList,
    StatusResponse, StreamChunk,
};
use crate::stream::read_sse;

/// Connection establishment allowance, separate from the per-request budget.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default budget for a whole request, streamed body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// What the user sees when a request runs out its time budget.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. The server is taking too long to respond.";

/// Errors surfaced by [`ChatApiClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The server answered with a JSON body carrying an `error` field; the
    /// message is meant for the user and is surfaced verbatim.
    #[error("{message}")]
    Server { message: String },

    #[error("server returned HTTP {status}")]
    Status { status: u16, body: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Typed chunks from a streaming `/chat` response.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// HTTP client for the chat completion server.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ChatApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout(self.request_timeout)
        } else {
            ClientError::Http(error)
        }
    }

    /// Pass 2xx responses through; for anything else, prefer the server's
    /// own `error` message over a bare status code.
    async fn successful(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
        match message {
            Some(message) => Err(ClientError::Server { message }),
            None => Err(ClientError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// `GET /status`
    pub async fn status(&self) -> ClientResult<StatusResponse> {
        let response = self
            .http
            .get(self.endpoint("/status"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::successful(response).await?;
        Ok(response.json().await?)
    }

    /// `POST /chat` without streaming; the complete reply arrives in one
    /// body.
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatResponse> {
        debug!(chars = request.message.len(), fast = ?request.fast, "sending chat request");
        let response = self
            .http
            .post(self.endpoint("/chat"))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::successful(response).await?;
        Ok(response.json().await?)
    }

    /// `POST /chat` with streaming enabled.
    ///
    /// The returned stream yields typed chunks read by a spawned task.
    /// Cancel the token (or drop the stream) to stop reading; transport
    /// failures after this call returns arrive as [`StreamChunk::Error`].
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> ClientResult<ChunkStream> {
        debug!(chars = request.message.len(), "opening chat stream");
        let response = self
            .http
            .post(self.endpoint("/chat"))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::successful(response).await?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(read_sse(Box::pin(response.bytes_stream()), tx, cancel));
        Ok(ReceiverStream::new(rx).boxed())
    }

    /// `GET /models/available`
    pub async fn available_models(&self) -> ClientResult<Vec<ModelEntry>> {
        let response = self
            .http
            .get(self.endpoint("/models/available"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::successful(response).await?;
        let list: ModelList = response.json().await?;
        Ok(list.models)
    }

    /// `GET /models/current`
    pub async fn current_model(&self) -> ClientResult<String> {
        let response = self
            .http
            .get(self.endpoint("/models/current"))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::successful(response).await?;
        let current: CurrentModel = response.json().await?;
        Ok(current.model)
    }

    /// `POST /change_model`
    pub async fn change_model(&self, model: &str) -> ClientResult<()> {
        debug!(model, "requesting model change");
        let response = self
            .http
            .post(self.endpoint("/change_model"))
            .timeout(self.request_timeout)
            .json(&ChangeModelRequest {
                model: model.to_string(),
            })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::successful(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(stream: bool) -> ChatRequest {
        ChatRequest {
            message: "hello".to_string(),
            stream,
            max_tokens: 1024,
            fast: None,
            include_thoughts: None,
        }
    }

    #[tokio::test]
    async fn test_status_reports_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ready",
                "model": "llama3",
            })))
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        let status = client.status().await.unwrap();
        assert!(status.is_ready());
        assert_eq!(status.model.as_deref(), Some("llama3"));
    }

    #[tokio::test]
    async fn test_non_streaming_chat_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Hi there",
                "processing_time": "0.52s",
                "fast_mode": false,
            })))
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        let reply = client.chat(&request(false)).await.unwrap();
        assert_eq!(reply.response.as_deref(), Some("Hi there"));
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn test_server_error_body_surfaces_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "Model is still loading. Please try again in a moment.",
                "status": "loading",
            })))
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        match client.chat(&request(false)).await {
            Err(ClientError::Server { message }) => {
                assert_eq!(message, "Model is still loading. Please try again in a moment.");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_without_error_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_raw("oops", "text/plain"))
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        match client.chat(&request(false)).await {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "oops");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_chat_yields_typed_chunks() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"chunk\": \"Hel\"}\n\n",
            "data: {\"chunk\": \"lo\"}\n\n",
            "data: {\"thought_chunk\": \"hmm\"}\n\n",
            "data: {\"done\": true, \"processing_time\": \"0.10s\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        let stream = client
            .chat_stream(&request(true), CancellationToken::new())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.collect().await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hel".to_string()),
                StreamChunk::Text("lo".to_string()),
                StreamChunk::Thought("hmm".to_string()),
                StreamChunk::Done {
                    thoughts: None,
                    processing_time: Some("0.10s".to_string()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_request_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ready"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = ChatApiClient::with_timeout(server.uri(), Duration::from_millis(50));
        match client.status().await {
            Err(ClientError::Timeout(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_management_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3"}, {"name": "mistral"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/models/current"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"model": "llama3"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/change_model"))
            .and(body_json(serde_json::json!({"model": "mistral"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            )
            .mount(&server)
            .await;

        let client = ChatApiClient::new(server.uri());
        let models = client.available_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3");
        assert_eq!(client.current_model().await.unwrap(), "llama3");
        client.change_model("mistral").await.unwrap();
    }
}
