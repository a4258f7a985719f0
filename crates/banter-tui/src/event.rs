use std::time::Duration;

use banter_core::{ChatResponse, ClientError, ModelEntry, StatusResponse, StreamChunk};
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Interval, MissedTickBehavior};

/// Everything that drives the UI loop: terminal input, the periodic tick,
/// and completions posted back by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// One chunk produced by the stream reader for request `generation`.
    Chunk {
        generation: u64,
        chunk: StreamChunk,
    },
    /// Reply to a non-streaming send.
    Reply {
        generation: u64,
        result: Result<ChatResponse, ClientError>,
    },
    /// Result of the startup server probe.
    Status(Result<StatusResponse, ClientError>),
    /// Model inventory fetched from the server.
    Models(Result<ModelInventory, ClientError>),
    /// Outcome of a model switch.
    ModelChanged {
        model: String,
        result: Result<(), ClientError>,
    },
}

/// What the server reports about its models, fetched in one task so the
/// sidebar fills in atomically.
#[derive(Debug, Clone)]
pub struct ModelInventory {
    pub available: Vec<ModelEntry>,
    pub current: Option<String>,
}

/// Merges the three event sources into a single awaited stream.
///
/// Background tasks get a clone of [`EventBus::sender`] and post their
/// results as [`AppEvent`]s; the UI loop only ever awaits [`EventBus::next`].
pub struct EventBus {
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    input: EventStream,
    tick: Interval,
}

impl EventBus {
    pub fn new(tick_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tick = tokio::time::interval(tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            tx,
            rx,
            input: EventStream::new(),
            tick,
        }
    }

    pub fn sender(&self) -> UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    /// The next event from any source. `None` once terminal input closes.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            tokio::select! {
                event = self.rx.recv() => return event,
                _ = self.tick.tick() => return Some(AppEvent::Tick),
                input = self.input.next() => match input {
                    // Key releases only exist on some platforms; acting on
                    // them would double every keystroke there.
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        return Some(AppEvent::Key(key));
                    }
                    Some(Ok(Event::Resize(_, _))) => return Some(AppEvent::Resize),
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => return None,
                },
            }
        }
    }
}
