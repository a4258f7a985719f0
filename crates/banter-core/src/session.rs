use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::StreamChunk;
use crate::text;
use crate::transcript::ChatTurn;

/// Pending buffer size above which an appending read triggers a flush.
const PENDING_FLUSH_CHARS: usize = 25;
/// Buffered appends above which a flush triggers regardless of size.
const PENDING_FLUSH_UPDATES: u32 = 10;
/// Longest the display may lag behind received text.
const FLUSH_INTERVAL: Duration = Duration::from_millis(150);
/// Streamed sends that may fail in a row before the client falls back to
/// non-streaming requests.
const STREAM_ERROR_CEILING: u32 = 3;

/// Handle identifying one request attempt.
///
/// The token cancels the reader task; the generation lets the manager ignore
/// chunks that arrive after the session was superseded.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// What the display should do after one chunk was fed to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Batched text was folded in; show `text` as the in-flight turn and
    /// re-pin the transcript scroll to the bottom.
    Flush { text: String },
    /// The stream finished and `turn` is ready for the transcript. `error`
    /// carries the failure that ended the stream, if any; `processing_time`
    /// is the server-reported figure from a clean completion.
    Finished {
        turn: ChatTurn,
        error: Option<String>,
        processing_time: Option<String>,
    },
}

/// Transient state for one in-flight assistant turn.
struct StreamSession {
    generation: u64,
    cancel: CancellationToken,
    accumulated: String,
    pending: String,
    thoughts: String,
    pending_updates: u32,
    last_flush: Instant,
}

impl StreamSession {
    fn new(generation: u64, cancel: CancellationToken) -> Self {
        Self {
            generation,
            cancel,
            accumulated: String::new(),
            pending: String::new(),
            thoughts: String::new(),
            pending_updates: 0,
            last_flush: Instant::now(),
        }
    }

    /// Append a fragment unless it is blank or merely repeats the tail of
    /// text already seen. Returns true when the fragment was appended.
    fn append_fragment(&mut self, fragment: &str) -> bool {
        if fragment.trim().is_empty() {
            return false;
        }
        if text::is_duplicate_tail(fragment, &self.pending, &self.accumulated) {
            debug!(len = fragment.len(), "dropping re-sent fragment");
            return false;
        }
        self.pending.push_str(fragment);
        self.pending_updates += 1;
        true
    }

    fn should_flush(&self, appended: bool) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        (appended && self.pending.chars().count() > PENDING_FLUSH_CHARS)
            || self.pending_updates > PENDING_FLUSH_UPDATES
            || self.last_flush.elapsed() > FLUSH_INTERVAL
    }

    /// Fold pending text into the accumulated text and collapse any
    /// immediately-repeated phrase the server produced.
    fn fold_pending(&mut self) {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.accumulated.push_str(&pending);
            self.pending_updates = 0;
        }
        if let Some(collapsed) = text::collapse_repeated_phrase(&self.accumulated) {
            debug!(
                before = self.accumulated.len(),
                after = collapsed.len(),
                "collapsed repeated phrase"
            );
            self.accumulated = collapsed;
        }
    }

    fn flush(&mut self) -> String {
        self.fold_pending();
        self.last_flush = Instant::now();
        self.accumulated.clone()
    }
}

/// Owner of the single in-flight stream session and the fallback state.
///
/// At most one session is active at a time; starting a new request cancels
/// the previous session's token and bumps the generation so late chunks from
/// the superseded reader are ignored rather than spliced into the new turn.
pub struct SessionManager {
    session: Option<StreamSession>,
    generation: u64,
    consecutive_stream_errors: u32,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            session: None,
            generation: 0,
            consecutive_stream_errors: 0,
        }
    }

    /// Reserve the next request generation without opening a stream session.
    /// Non-streaming sends use this so that a later send supersedes their
    /// reply the same way it supersedes a stream.
    pub fn begin_request(&mut self) -> u64 {
        if let Some(session) = self.session.take() {
            debug!(
                generation = session.generation,
                "cancelling superseded session"
            );
            session.cancel.cancel();
        }
        self.generation += 1;
        self.generation
    }

    /// Start a new streaming session, cancelling any active one. Partial
    /// text from the superseded session is dropped; call [`Self::cancel_active`]
    /// first when it should be kept as a turn.
    pub fn begin(&mut self) -> SessionHandle {
        let generation = self.begin_request();
        let cancel = CancellationToken::new();
        self.session = Some(StreamSession::new(generation, cancel.clone()));
        SessionHandle { generation, cancel }
    }

    /// Cancel the in-flight session. Text received so far (pending included)
    /// is returned as a completed assistant turn; an empty session yields
    /// `None`.
    pub fn cancel_active(&mut self) -> Option<ChatTurn> {
        let mut session = self.session.take()?;
        session.cancel.cancel();
        session.fold_pending();
        debug!(
            generation = session.generation,
            chars = session.accumulated.len(),
            "session cancelled"
        );
        if session.accumulated.is_empty() {
            None
        } else {
            Some(ChatTurn::assistant(session.accumulated, None))
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// True when `generation` is still the newest request.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// True while streamed sends are still trusted. Once too many streams
    /// fail in a row, sends fall back to the non-streaming request path.
    pub fn should_stream(&self) -> bool {
        self.consecutive_stream_errors < STREAM_ERROR_CEILING
    }

    /// Feed one chunk from the reader task. Chunks from superseded sessions
    /// are discarded so an aborted stream can never touch the display.
    pub fn handle_chunk(&mut self, generation: u64, chunk: StreamChunk) -> Option<SessionUpdate> {
        match self.session {
            Some(ref session) if session.generation == generation => {}
            Some(ref session) => {
                debug!(
                    received = generation,
                    active = session.generation,
                    "ignoring chunk from superseded session"
                );
                return None;
            }
            None => {
                debug!(received = generation, "ignoring chunk, no active session");
                return None;
            }
        }

        match chunk {
            StreamChunk::Text(fragment) => {
                let session = self.session.as_mut()?;
                let appended = session.append_fragment(&fragment);
                if session.should_flush(appended) {
                    let text = session.flush();
                    return Some(SessionUpdate::Flush { text });
                }
                None
            }
            StreamChunk::Thought(fragment) => {
                let session = self.session.as_mut()?;
                session.thoughts.push_str(&fragment);
                None
            }
            StreamChunk::Done {
                thoughts,
                processing_time,
            } => {
                let mut session = self.session.take()?;
                session.fold_pending();
                self.consecutive_stream_errors = 0;

                let collected = std::mem::take(&mut session.thoughts);
                let final_thoughts = thoughts
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| (!collected.trim().is_empty()).then_some(collected));

                debug!(
                    chars = session.accumulated.len(),
                    has_thoughts = final_thoughts.is_some(),
                    "stream completed"
                );
                Some(SessionUpdate::Finished {
                    turn: ChatTurn::assistant(session.accumulated, final_thoughts),
                    error: None,
                    processing_time,
                })
            }
            StreamChunk::Error(message) => {
                let mut session = self.session.take()?;
                session.fold_pending();
                self.consecutive_stream_errors += 1;
                warn!(
                    error = %message,
                    consecutive = self.consecutive_stream_errors,
                    "stream ended in error"
                );

                // A turn with partial text keeps it; with nothing received
                // the error message itself becomes the turn text.
                let turn = if session.accumulated.is_empty() {
                    ChatTurn::assistant(message.clone(), None)
                } else {
                    ChatTurn::assistant(session.accumulated, None)
                };
                Some(SessionUpdate::Finished {
                    turn,
                    error: Some(message),
                    processing_time: None,
                })
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
