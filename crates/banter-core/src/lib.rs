pub mod client;
pub mod preferences;
pub mod protocol;
pub mod repositories;
pub mod session;
pub mod stream;
pub mod text;
pub mod transcript;

pub use client::{
    ChatApiClient, ChunkStream, ClientError, ClientResult, DEFAULT_REQUEST_TIMEOUT, TIMEOUT_MESSAGE,
};
pub use preferences::Preferences;
pub use protocol::{ChatRequest, ChatResponse, ModelEntry, StatusResponse, StreamChunk};
pub use session::{SessionHandle, SessionManager, SessionUpdate};
pub use transcript::{ChatTurn, Role, Transcript};
