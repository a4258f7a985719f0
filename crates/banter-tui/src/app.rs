use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use banter_core::repositories::{PreferencesRepository, TranscriptRepository};
use banter_core::{
    ChatApiClient, ChatRequest, ChatResponse, ChatTurn, ClientError, ModelEntry, Preferences,
    SessionManager, SessionUpdate, StatusResponse, StreamChunk, TIMEOUT_MESSAGE, Transcript,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use tui_textarea::TextArea;

use crate::event::{AppEvent, ModelInventory};
use crate::tasks::{TaskRegistry, TaskSlot};
use crate::theme::Theme;

/// Shown while the server reports the model is still loading.
const MODEL_LOADING_MESSAGE: &str = "Model is being loaded. This might take a minute...";
/// Greeting shown once the server reports the model ready.
const GREETING: &str = "Hello! How can I help you today?";
/// Shown when the server cannot be reached at all.
const UNREACHABLE_MESSAGE: &str =
    "Cannot connect to the AI server. Please make sure the server is running.";
/// Shown for a reply that carries neither response text nor an error.
const EMPTY_REPLY_MESSAGE: &str = "No response received from the server.";
/// How long a toast stays on screen.
const TOAST_LIFETIME: Duration = Duration::from_secs(3);
/// Rows in the settings overlay, top to bottom: dark mode, font size,
/// eye comfort, comfort intensity, fast mode, request thoughts.
pub const SETTINGS_ROWS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Transcript,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Popup {
    #[default]
    None,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

/// Transient notification. At most one is visible; a new toast replaces
/// the previous one, and expiry is checked against `deadline` on tick.
pub struct Toast {
    pub title: String,
    pub message: String,
    pub level: ToastLevel,
    pub deadline: Instant,
}

/// Scroll state of the chat pane. While `pinned`, the view follows the
/// bottom of the transcript; manual scrolling unpins it.
pub struct ChatScroll {
    pub pinned: bool,
    pub offset: u16,
}

struct PendingRequest {
    generation: u64,
    streaming: bool,
}

pub struct App {
    client: ChatApiClient,
    session: SessionManager,
    pub turns: Vec<ChatTurn>,
    /// Latest flushed snapshot of the in-flight assistant turn.
    pub live_text: Option<String>,
    pending: Option<PendingRequest>,
    pub preferences: Preferences,
    pub theme: Theme,
    pub composer: TextArea<'static>,
    pub focus: Focus,
    pub popup: Popup,
    pub settings_cursor: usize,
    pub sidebar_open: bool,
    pub models: Vec<ModelEntry>,
    pub current_model: Option<String>,
    pub model_cursor: usize,
    pub selected_turn: Option<usize>,
    /// Indices of turns whose thoughts panel is expanded.
    pub revealed_thoughts: HashSet<usize>,
    pub scroll: ChatScroll,
    pub last_processing_time: Option<String>,
    pub toast: Option<Toast>,
    pub tick: usize,
    include_thoughts: bool,
    max_tokens: u32,
    tasks: TaskRegistry,
    events: UnboundedSender<AppEvent>,
    transcript_repo: Arc<dyn TranscriptRepository>,
    preferences_repo: Arc<dyn PreferencesRepository>,
    should_quit: bool,
}

impl App {
    pub fn new(
        client: ChatApiClient,
        preferences: Preferences,
        restored_turns: Vec<ChatTurn>,
        transcript_repo: Arc<dyn TranscriptRepository>,
        preferences_repo: Arc<dyn PreferencesRepository>,
        events: UnboundedSender<AppEvent>,
        max_tokens: u32,
    ) -> Self {
        let theme = Theme::from_preferences(&preferences);
        Self {
            client,
            session: SessionManager::new(),
            turns: restored_turns,
            live_text: None,
            pending: None,
            preferences,
            theme,
            composer: new_composer(),
            focus: Focus::Composer,
            popup: Popup::None,
            settings_cursor: 0,
            sidebar_open: true,
            models: Vec::new(),
            current_model: None,
            model_cursor: 0,
            selected_turn: None,
            revealed_thoughts: HashSet::new(),
            scroll: ChatScroll {
                pinned: true,
                offset: 0,
            },
            last_processing_time: None,
            toast: None,
            tick: 0,
            include_thoughts: true,
            max_tokens,
            tasks: TaskRegistry::new(),
            events,
            transcript_repo,
            preferences_repo,
            should_quit: false,
        }
    }

    /// Kick off the startup probes: server status and the model inventory.
    pub fn bootstrap(&mut self) {
        let client = self.client.clone();
        let events = self.events.clone();
        self.tasks.spawn(TaskSlot::StatusProbe, |cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = client.status() => {
                    let _ = events.send(AppEvent::Status(result));
                }
            }
        });
        self.refresh_models();
    }

    /// Fetch the model inventory in the background.
    fn refresh_models(&mut self) {
        let client = self.client.clone();
        let events = self.events.clone();
        self.tasks.spawn(TaskSlot::ModelFetch, |cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = fetch_inventory(client) => {
                    let _ = events.send(AppEvent::Models(result));
                }
            }
        });
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// True while a streamed (rather than buffered) reply is pending.
    pub fn is_streaming(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.streaming)
    }

    pub fn include_thoughts(&self) -> bool {
        self.include_thoughts
    }

    pub async fn shutdown(self) {
        self.tasks.shutdown().await;
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick => {
                self.tick = self.tick.wrapping_add(1);
                self.prune_toast();
            }
            AppEvent::Chunk { generation, chunk } => self.handle_chunk(generation, chunk),
            AppEvent::Reply { generation, result } => self.handle_reply(generation, result),
            AppEvent::Status(result) => self.handle_status(result),
            AppEvent::Models(result) => self.handle_models(result),
            AppEvent::ModelChanged { model, result } => self.handle_model_changed(model, result),
        }
    }

    fn handle_chunk(&mut self, generation: u64, chunk: StreamChunk) {
        let Some(update) = self.session.handle_chunk(generation, chunk) else {
            return;
        };
        match update {
            SessionUpdate::Flush { text } => {
                self.live_text = Some(text);
                self.scroll.pinned = true;
            }
            SessionUpdate::Finished {
                mut turn,
                error,
                processing_time,
            } => {
                self.live_text = None;
                self.pending = None;
                self.last_processing_time = processing_time;
                if let Some(message) = error {
                    warn!(error = %message, "stream ended with error");
                    self.show_toast(ToastLevel::Error, "Stream error", &message);
                } else if turn.text.is_empty() {
                    turn.text = EMPTY_REPLY_MESSAGE.to_string();
                }
                self.push_turn(turn);
            }
        }
    }

    fn handle_reply(&mut self, generation: u64, result: Result<ChatResponse, ClientError>) {
        if !self.session.is_current(generation) {
            debug!(generation, "ignoring superseded reply");
            return;
        }
        self.pending = None;
        let turn = match result {
            Ok(response) => {
                self.last_processing_time = response.processing_time.clone();
                if let Some(error) = response.error {
                    ChatTurn::assistant(error, None)
                } else {
                    match response.response.filter(|text| !text.is_empty()) {
                        Some(text) => ChatTurn::assistant(text, response.thoughts),
                        None => ChatTurn::assistant(EMPTY_REPLY_MESSAGE, None),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                ChatTurn::assistant(request_error_message(&e), None)
            }
        };
        self.push_turn(turn);
    }

    fn handle_status(&mut self, result: Result<StatusResponse, ClientError>) {
        match result {
            Ok(status) if status.is_loading() => {
                self.push_turn(ChatTurn::system(MODEL_LOADING_MESSAGE));
            }
            Ok(status) if status.is_ready() => {
                if let Some(model) = status.model {
                    self.current_model.get_or_insert(model);
                }
                self.push_turn(ChatTurn::assistant(GREETING, None));
            }
            Ok(status) => {
                warn!(status = %status.status, "model not available");
                let detail = status.error.unwrap_or(status.status);
                self.show_toast(ToastLevel::Error, "Model not loaded", &detail);
            }
            Err(e) => {
                warn!(error = %e, "status probe failed");
                self.push_turn(ChatTurn::system(UNREACHABLE_MESSAGE));
            }
        }
    }

    fn handle_models(&mut self, result: Result<ModelInventory, ClientError>) {
        match result {
            Ok(inventory) => {
                self.models = inventory.available;
                if inventory.current.is_some() {
                    self.current_model = inventory.current;
                }
                self.model_cursor = self
                    .models
                    .iter()
                    .position(|m| Some(&m.name) == self.current_model.as_ref())
                    .unwrap_or(0);
            }
            // The endpoints are optional server features; stay quiet when
            // they are missing and leave the sidebar list empty.
            Err(e) => debug!(error = %e, "model inventory unavailable"),
        }
    }

    fn handle_model_changed(&mut self, model: String, result: Result<(), ClientError>) {
        match result {
            Ok(()) => {
                self.show_toast(ToastLevel::Info, "Model changed", &model);
                self.current_model = Some(model);
                // The server may normalize the name; re-read its answer.
                self.refresh_models();
            }
            Err(e) => {
                warn!(error = %e, model = %model, "model change failed");
                self.show_toast(
                    ToastLevel::Error,
                    "Model change failed",
                    &request_error_message(&e),
                );
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.popup == Popup::Settings {
            self.handle_settings_key(key);
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('n') => self.new_chat(),
                KeyCode::Char('b') => self.toggle_sidebar(),
                KeyCode::Char('o') => {
                    self.popup = Popup::Settings;
                    self.settings_cursor = 0;
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Esc => {
                if self.in_flight() {
                    self.cancel_request();
                } else if !self.scroll.pinned {
                    self.scroll.pinned = true;
                } else {
                    self.focus = Focus::Composer;
                }
            }
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::PageUp => self.scroll_by(-10),
            KeyCode::PageDown => self.scroll_by(10),
            _ => match self.focus {
                Focus::Composer => self.handle_composer_key(key),
                Focus::Transcript => self.handle_transcript_key(key),
                Focus::Sidebar => self.handle_sidebar_key(key),
            },
        }
    }

    fn handle_composer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                self.composer.insert_newline();
            }
            KeyCode::Enter => self.send_message(),
            _ => {
                // Input stays disabled while a reply is pending.
                if !self.in_flight() {
                    self.composer.input(key);
                }
            }
        }
    }

    fn handle_transcript_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_turn = match self.selected_turn {
                    None => self.turns.len().checked_sub(1),
                    Some(0) => Some(0),
                    Some(i) => Some(i - 1),
                };
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(i) = self.selected_turn {
                    self.selected_turn = if i + 1 < self.turns.len() {
                        Some(i + 1)
                    } else {
                        None
                    };
                }
            }
            KeyCode::Enter | KeyCode::Char('t') => self.toggle_thoughts(),
            KeyCode::End | KeyCode::Char('G') => {
                self.selected_turn = None;
                self.scroll.pinned = true;
            }
            _ => {}
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.model_cursor = self.model_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.model_cursor + 1 < self.models.len() {
                    self.model_cursor += 1;
                }
            }
            KeyCode::Enter => self.change_model(),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.popup = Popup::None,
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_cursor = self.settings_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_cursor = (self.settings_cursor + 1).min(SETTINGS_ROWS - 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_setting(),
            KeyCode::Left => self.adjust_setting(-1.0),
            KeyCode::Right => self.adjust_setting(1.0),
            _ => {}
        }
    }

    fn toggle_setting(&mut self) {
        match self.settings_cursor {
            0 => self.preferences.dark_mode = !self.preferences.dark_mode,
            2 => self.preferences.eye_comfort = !self.preferences.eye_comfort,
            4 => self.preferences.fast_mode = !self.preferences.fast_mode,
            5 => {
                // Request-thoughts is a per-run switch, not a preference.
                self.include_thoughts = !self.include_thoughts;
                return;
            }
            _ => return,
        }
        self.apply_preferences();
    }

    fn adjust_setting(&mut self, direction: f32) {
        match self.settings_cursor {
            1 => self.preferences.font_size += direction,
            3 => self.preferences.eye_comfort_intensity += direction * 0.1,
            _ => return,
        }
        self.apply_preferences();
    }

    fn apply_preferences(&mut self) {
        self.preferences = self.preferences.clone().sanitized();
        self.theme = Theme::from_preferences(&self.preferences);
        self.save_preferences();
    }

    fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
        if !self.sidebar_open && self.focus == Focus::Sidebar {
            self.focus = Focus::Composer;
        }
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Composer => Focus::Transcript,
            Focus::Transcript if self.sidebar_open => Focus::Sidebar,
            Focus::Transcript | Focus::Sidebar => Focus::Composer,
        };
    }

    fn toggle_thoughts(&mut self) {
        let Some(index) = self.selected_turn else {
            return;
        };
        let has_thoughts = self
            .turns
            .get(index)
            .is_some_and(|turn| turn.thoughts.is_some());
        if !has_thoughts {
            return;
        }
        if !self.revealed_thoughts.remove(&index) {
            self.revealed_thoughts.insert(index);
        }
    }

    fn scroll_by(&mut self, delta: i32) {
        if delta < 0 {
            self.scroll.pinned = false;
            self.scroll.offset = self.scroll.offset.saturating_sub(delta.unsigned_abs() as u16);
        } else if !self.scroll.pinned {
            self.scroll.offset = self.scroll.offset.saturating_add(delta as u16);
        }
    }

    fn send_message(&mut self) {
        if self.in_flight() {
            return;
        }
        let message = self.composer.lines().join("\n").trim().to_string();
        if message.is_empty() {
            return;
        }
        self.composer = new_composer();
        self.push_turn(ChatTurn::user(message.clone()));
        self.selected_turn = None;

        let streaming = self.session.should_stream();
        let request = self.build_request(message, streaming);
        let client = self.client.clone();
        let events = self.events.clone();
        if streaming {
            let handle = self.session.begin();
            let generation = handle.generation;
            self.pending = Some(PendingRequest {
                generation,
                streaming: true,
            });
            self.tasks.spawn(TaskSlot::Chat, |_| async move {
                match client.chat_stream(&request, handle.cancel).await {
                    Ok(mut chunks) => {
                        while let Some(chunk) = chunks.next().await {
                            if events.send(AppEvent::Chunk { generation, chunk }).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        // Feed the failure through the session so it counts
                        // toward the non-streaming fallback.
                        let chunk = StreamChunk::Error(request_error_message(&e));
                        let _ = events.send(AppEvent::Chunk { generation, chunk });
                    }
                }
            });
        } else {
            let generation = self.session.begin_request();
            self.pending = Some(PendingRequest {
                generation,
                streaming: false,
            });
            self.tasks.spawn(TaskSlot::Chat, |_| async move {
                let result = client.chat(&request).await;
                let _ = events.send(AppEvent::Reply { generation, result });
            });
        }
    }

    fn build_request(&self, message: String, stream: bool) -> ChatRequest {
        ChatRequest {
            message,
            stream,
            max_tokens: self.max_tokens,
            fast: self.preferences.fast_mode.then_some(true),
            include_thoughts: Some(self.include_thoughts),
        }
    }

    /// Abort the in-flight request, keeping whatever text already arrived
    /// as a completed turn.
    fn cancel_request(&mut self) {
        if !self.in_flight() {
            return;
        }
        let partial = self.session.cancel_active();
        // Bump the generation so a late reply from the aborted request is
        // ignored rather than applied.
        let _ = self.session.begin_request();
        self.tasks.cancel(TaskSlot::Chat);
        self.pending = None;
        self.live_text = None;
        if let Some(turn) = partial {
            self.push_turn(turn);
        }
        self.show_toast(ToastLevel::Info, "Cancelled", "Request cancelled");
    }

    fn new_chat(&mut self) {
        let _ = self.session.cancel_active();
        let _ = self.session.begin_request();
        self.tasks.cancel(TaskSlot::Chat);
        self.pending = None;
        self.live_text = None;
        self.turns.clear();
        self.revealed_thoughts.clear();
        self.selected_turn = None;
        self.last_processing_time = None;
        self.scroll = ChatScroll {
            pinned: true,
            offset: 0,
        };
        self.focus = Focus::Composer;

        let repo = self.transcript_repo.clone();
        self.tasks.spawn(TaskSlot::SaveTranscript, |_| async move {
            if let Err(e) = repo.clear().await {
                warn!(error = %e, "could not clear saved transcript");
            }
        });
    }

    fn change_model(&mut self) {
        let Some(entry) = self.models.get(self.model_cursor) else {
            return;
        };
        let model = entry.name.clone();
        if Some(&model) == self.current_model.as_ref() {
            return;
        }
        let client = self.client.clone();
        let events = self.events.clone();
        let requested = model.clone();
        self.tasks.spawn(TaskSlot::ModelChange, |cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = client.change_model(&requested) => {
                    let _ = events.send(AppEvent::ModelChanged { model, result });
                }
            }
        });
    }

    fn push_turn(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.scroll.pinned = true;
        self.save_transcript();
    }

    fn save_transcript(&mut self) {
        let transcript = Transcript::new(self.turns.clone());
        let repo = self.transcript_repo.clone();
        self.tasks.spawn(TaskSlot::SaveTranscript, |_| async move {
            if let Err(e) = repo.save(transcript).await {
                warn!(error = %e, "could not save transcript");
            }
        });
    }

    fn save_preferences(&mut self) {
        let preferences = self.preferences.clone();
        let repo = self.preferences_repo.clone();
        self.tasks.spawn(TaskSlot::SavePreferences, |_| async move {
            if let Err(e) = repo.save(preferences).await {
                warn!(error = %e, "could not save preferences");
            }
        });
    }

    fn show_toast(&mut self, level: ToastLevel, title: &str, message: &str) {
        self.toast = Some(Toast {
            title: title.to_string(),
            message: message.to_string(),
            level,
            deadline: Instant::now() + TOAST_LIFETIME,
        });
    }

    fn prune_toast(&mut self) {
        if self
            .toast
            .as_ref()
            .is_some_and(|t| t.deadline <= Instant::now())
        {
            self.toast = None;
        }
    }
}

async fn fetch_inventory(client: ChatApiClient) -> Result<ModelInventory, ClientError> {
    let available = client.available_models().await?;
    // The current-model endpoint is newer than the list endpoint on some
    // servers; a missing answer just leaves the marker off.
    let current = client.current_model().await.ok();
    Ok(ModelInventory { available, current })
}

fn request_error_message(error: &ClientError) -> String {
    match error {
        ClientError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
        ClientError::Http(e) if e.is_connect() => UNREACHABLE_MESSAGE.to_string(),
        ClientError::Server { message } => message.clone(),
        other => format!("Error: {other}"),
    }
}

fn new_composer() -> TextArea<'static> {
    let mut composer = TextArea::default();
    composer.set_placeholder_text("Type a message");
    composer
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_core::Role;
    use banter_core::repositories::{PreferencesJsonRepository, TranscriptJsonRepository};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_app() -> (App, UnboundedReceiver<AppEvent>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let app = App::new(
            ChatApiClient::new("http://localhost:9"),
            Preferences::default(),
            Vec::new(),
            Arc::new(TranscriptJsonRepository::at_dir(dir.path())),
            Arc::new(PreferencesJsonRepository::at_dir(dir.path())),
            tx,
            1024,
        );
        (app, rx, dir)
    }

    fn ok_status(status: &str) -> Result<StatusResponse, ClientError> {
        Ok(StatusResponse {
            status: status.to_string(),
            model: None,
            error: None,
        })
    }

    #[tokio::test]
    async fn test_status_loading_adds_system_turn() {
        let (mut app, _rx, _dir) = test_app();
        app.handle_event(AppEvent::Status(ok_status("loading")));

        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::System);
        assert_eq!(turn.text, "Model is being loaded. This might take a minute...");
    }

    #[tokio::test]
    async fn test_status_ready_adds_greeting() {
        let (mut app, _rx, _dir) = test_app();
        app.handle_event(AppEvent::Status(ok_status("ready")));

        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, "Hello! How can I help you today?");
    }

    #[tokio::test]
    async fn test_status_failure_adds_unreachable_turn() {
        let (mut app, _rx, _dir) = test_app();
        app.handle_event(AppEvent::Status(Err(ClientError::Server {
            message: "boom".to_string(),
        })));

        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::System);
        assert_eq!(
            turn.text,
            "Cannot connect to the AI server. Please make sure the server is running."
        );
    }

    #[tokio::test]
    async fn test_send_pushes_user_turn_and_blocks_input() {
        let (mut app, _rx, _dir) = test_app();
        app.composer.insert_str("hello there");
        app.send_message();

        assert!(app.in_flight());
        assert!(app.is_streaming());
        assert!(app.composer.lines().join("").is_empty());
        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text, "hello there");

        // Another Enter while pending changes nothing.
        app.composer.insert_str("queued");
        let before = app.turns.len();
        app.send_message();
        assert_eq!(app.turns.len(), before);
    }

    #[tokio::test]
    async fn test_send_ignores_blank_input() {
        let (mut app, _rx, _dir) = test_app();
        app.composer.insert_str("   ");
        app.send_message();
        assert!(!app.in_flight());
        assert!(app.turns.is_empty());
    }

    #[tokio::test]
    async fn test_stream_flush_and_finish_update_transcript() {
        let (mut app, _rx, _dir) = test_app();
        app.composer.insert_str("question");
        app.send_message();
        let generation = app.pending.as_ref().unwrap().generation;

        app.handle_event(AppEvent::Chunk {
            generation,
            chunk: StreamChunk::Text("An answer long enough to flush".to_string()),
        });
        assert_eq!(
            app.live_text.as_deref(),
            Some("An answer long enough to flush")
        );

        app.handle_event(AppEvent::Chunk {
            generation,
            chunk: StreamChunk::Done {
                thoughts: None,
                processing_time: Some("1.25s".to_string()),
            },
        });
        assert!(!app.in_flight());
        assert!(app.live_text.is_none());
        assert_eq!(app.last_processing_time.as_deref(), Some("1.25s"));
        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, "An answer long enough to flush");
    }

    #[tokio::test]
    async fn test_chunks_from_superseded_request_are_dropped() {
        let (mut app, _rx, _dir) = test_app();
        app.composer.insert_str("first");
        app.send_message();
        let stale = app.pending.as_ref().unwrap().generation;

        app.new_chat();
        app.handle_event(AppEvent::Chunk {
            generation: stale,
            chunk: StreamChunk::Text("late text that must not display".to_string()),
        });
        assert!(app.live_text.is_none());
        assert!(app.turns.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_text() {
        let (mut app, _rx, _dir) = test_app();
        app.composer.insert_str("question");
        app.send_message();
        let generation = app.pending.as_ref().unwrap().generation;
        app.handle_event(AppEvent::Chunk {
            generation,
            chunk: StreamChunk::Text("partial answer".to_string()),
        });

        app.cancel_request();
        assert!(!app.in_flight());
        let turn = app.turns.last().unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, "partial answer");

        // A reply surviving from the aborted request is ignored.
        app.handle_event(AppEvent::Chunk {
            generation,
            chunk: StreamChunk::Text("more".to_string()),
        });
        assert!(app.live_text.is_none());
    }

    #[tokio::test]
    async fn test_reply_error_is_shown_verbatim() {
        let (mut app, _rx, _dir) = test_app();
        let generation = app.session.begin_request();
        app.pending = Some(PendingRequest {
            generation,
            streaming: false,
        });

        app.handle_event(AppEvent::Reply {
            generation,
            result: Ok(ChatResponse {
                error: Some("Model is still loading. Please try again in a moment.".to_string()),
                ..Default::default()
            }),
        });
        assert_eq!(
            app.turns.last().unwrap().text,
            "Model is still loading. Please try again in a moment."
        );
    }

    #[tokio::test]
    async fn test_empty_reply_uses_default_message() {
        let (mut app, _rx, _dir) = test_app();
        let generation = app.session.begin_request();
        app.pending = Some(PendingRequest {
            generation,
            streaming: false,
        });

        app.handle_event(AppEvent::Reply {
            generation,
            result: Ok(ChatResponse::default()),
        });
        assert_eq!(
            app.turns.last().unwrap().text,
            "No response received from the server."
        );
    }

    #[tokio::test]
    async fn test_stale_reply_is_ignored() {
        let (mut app, _rx, _dir) = test_app();
        let stale = app.session.begin_request();
        let _ = app.session.begin_request();

        app.handle_event(AppEvent::Reply {
            generation: stale,
            result: Ok(ChatResponse {
                response: Some("late".to_string()),
                ..Default::default()
            }),
        });
        assert!(app.turns.is_empty());
    }

    #[tokio::test]
    async fn test_model_inventory_positions_cursor_on_current() {
        let (mut app, _rx, _dir) = test_app();
        app.handle_event(AppEvent::Models(Ok(ModelInventory {
            available: vec![
                ModelEntry {
                    name: "llama3".to_string(),
                },
                ModelEntry {
                    name: "mistral".to_string(),
                },
            ],
            current: Some("mistral".to_string()),
        })));
        assert_eq!(app.models.len(), 2);
        assert_eq!(app.current_model.as_deref(), Some("mistral"));
        assert_eq!(app.model_cursor, 1);
    }

    #[tokio::test]
    async fn test_model_change_outcome_updates_marker() {
        let (mut app, _rx, _dir) = test_app();
        app.handle_event(AppEvent::ModelChanged {
            model: "mistral".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.current_model.as_deref(), Some("mistral"));
        assert_eq!(app.toast.as_ref().unwrap().title, "Model changed");

        app.handle_event(AppEvent::ModelChanged {
            model: "llama3".to_string(),
            result: Err(ClientError::Server {
                message: "no such model".to_string(),
            }),
        });
        // A failed switch leaves the marker where it was.
        assert_eq!(app.current_model.as_deref(), Some("mistral"));
        assert_eq!(app.toast.as_ref().unwrap().title, "Model change failed");
    }

    #[tokio::test]
    async fn test_toast_expires_on_tick() {
        let (mut app, _rx, _dir) = test_app();
        app.show_toast(ToastLevel::Info, "Model changed", "phi-2");
        app.toast.as_mut().unwrap().deadline = Instant::now() - Duration::from_millis(1);
        app.handle_event(AppEvent::Tick);
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn test_new_chat_clears_state() {
        let (mut app, _rx, _dir) = test_app();
        app.push_turn(ChatTurn::user("hi"));
        app.push_turn(ChatTurn::assistant("hello", Some("thinking".to_string())));
        app.revealed_thoughts.insert(1);
        app.selected_turn = Some(0);

        app.new_chat();
        assert!(app.turns.is_empty());
        assert!(app.revealed_thoughts.is_empty());
        assert!(app.selected_turn.is_none());
        assert!(app.scroll.pinned);
    }

    #[tokio::test]
    async fn test_settings_changes_retheme_and_sanitize() {
        let (mut app, _rx, _dir) = test_app();
        app.popup = Popup::Settings;
        app.settings_cursor = 0;
        app.toggle_setting();
        assert!(!app.preferences.dark_mode);
        assert_eq!(app.theme, Theme::light());

        app.settings_cursor = 1;
        for _ in 0..40 {
            app.adjust_setting(1.0);
        }
        assert_eq!(app.preferences.font_size, 32.0);
    }

    #[tokio::test]
    async fn test_settings_overlay_rows_match_cursor_range() {
        let (app, _rx, _dir) = test_app();
        assert_eq!(
            crate::views::settings::settings_rows(&app).len(),
            SETTINGS_ROWS
        );
    }

    #[tokio::test]
    async fn test_thoughts_toggle_only_on_turns_with_thoughts() {
        let (mut app, _rx, _dir) = test_app();
        app.push_turn(ChatTurn::user("q"));
        app.push_turn(ChatTurn::assistant("a", Some("because".to_string())));

        app.selected_turn = Some(0);
        app.toggle_thoughts();
        assert!(app.revealed_thoughts.is_empty());

        app.selected_turn = Some(1);
        app.toggle_thoughts();
        assert!(app.revealed_thoughts.contains(&1));
        app.toggle_thoughts();
        assert!(app.revealed_thoughts.is_empty());
    }
}
