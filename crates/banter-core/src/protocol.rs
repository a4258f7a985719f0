use serde::{Deserialize, Serialize};

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub stream: bool,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_thoughts: Option<bool>,
}

/// Complete response body for a non-streaming `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub thoughts: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub processing_time: Option<String>,
    #[serde(default)]
    pub fast_mode: Option<bool>,
}

/// One decoded `data:` frame from a streaming `POST /chat` body.
///
/// The server sends frames carrying a `chunk`, a `thought_chunk`, an `error`,
/// or the terminal `done` marker. A `done` frame may additionally carry the
/// final `thoughts` text and a pre-formatted `processing_time` such as
/// `"3.42s"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamFrame {
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub thought_chunk: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub thoughts: Option<String>,
    #[serde(default)]
    pub processing_time: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamFrame {
    /// Flatten the frame into typed chunks in the order a consumer should
    /// apply them. An `error` field makes the whole frame an error; a frame
    /// that carries both content and `done` yields the content first.
    pub fn into_chunks(self) -> Vec<StreamChunk> {
        if let Some(error) = self.error {
            return vec![StreamChunk::Error(error)];
        }

        let mut chunks = Vec::with_capacity(2);
        if let Some(text) = self.chunk {
            chunks.push(StreamChunk::Text(text));
        }
        if let Some(thought) = self.thought_chunk {
            chunks.push(StreamChunk::Thought(thought));
        }
        if self.done {
            chunks.push(StreamChunk::Done {
                thoughts: self.thoughts,
                processing_time: self.processing_time,
            });
        }
        chunks
    }
}

/// Stream chunks emitted while consuming a `/chat` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    Thought(String),
    Done {
        thoughts: Option<String>,
        processing_time: Option<String>,
    },
    Error(String),
}

/// Response body for `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }

    pub fn is_loading(&self) -> bool {
        self.status == "loading"
    }
}

/// Response body for `GET /models/available`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEntry {
    pub name: String,
}

/// Response body for `GET /models/current`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentModel {
    pub model: String,
}

/// Request body for `POST /change_model`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeModelRequest {
    pub model: String,
}
