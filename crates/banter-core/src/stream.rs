use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::{StreamChunk, StreamFrame};

/// Frames a single stream may deliver before the read is ended early.
/// A runaway server otherwise appends to the transcript without bound;
/// hitting the cap counts as a normal completion.
pub const MAX_STREAM_FRAMES: u32 = 5000;

/// Read `data:` frames from a streaming `/chat` body and forward typed
/// chunks until a terminal frame, the frame cap, cancellation, or a
/// transport failure.
///
/// The eventsource decoder buffers partial UTF-8 sequences and partial
/// frames across reads, so transport re-chunking at arbitrary byte
/// boundaries never corrupts text. Malformed JSON payloads are logged and
/// skipped. Transport failures and server `error` fields both surface as a
/// terminal [`StreamChunk::Error`].
pub(crate) async fn read_sse<S>(stream: S, tx: mpsc::Sender<StreamChunk>, cancel: CancellationToken)
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let mut events = stream.eventsource();
    let mut frames: u32 = 0;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(frames, "stream cancelled");
                return;
            }
            event = events.next() => event,
        };

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                let message = describe_transport_error(&e);
                warn!(error = %e, frames, "stream transport failure");
                let _ = tx.send(StreamChunk::Error(message)).await;
                return;
            }
            None => {
                // Body ended without a done frame; treat it as completion.
                debug!(frames, "stream body ended");
                let _ = tx
                    .send(StreamChunk::Done {
                        thoughts: None,
                        processing_time: None,
                    })
                    .await;
                return;
            }
        };

        frames += 1;
        if frames > MAX_STREAM_FRAMES {
            warn!(frames, "frame cap reached, ending stream early");
            let _ = tx
                .send(StreamChunk::Done {
                    thoughts: None,
                    processing_time: None,
                })
                .await;
            return;
        }

        let frame: StreamFrame = match serde_json::from_str(&event.data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "skipping malformed stream frame");
                continue;
            }
        };

        for chunk in frame.into_chunks() {
            let terminal = matches!(chunk, StreamChunk::Done { .. } | StreamChunk::Error(_));
            if tx.send(chunk).await.is_err() {
                // Receiver dropped; nobody is listening anymore.
                return;
            }
            if terminal {
                return;
            }
        }
    }
}

fn describe_transport_error(error: &EventStreamError<reqwest::Error>) -> String {
    match error {
        EventStreamError::Transport(e) if e.is_timeout() => {
            crate::client::TIMEOUT_MESSAGE.to_string()
        }
        other => other.to_string(),
    }
}
