mod app;
mod event;
mod tasks;
mod theme;
mod tui;
mod views;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use banter_core::ChatApiClient;
use banter_core::repositories::{
    PreferencesJsonRepository, PreferencesRepository, TranscriptJsonRepository,
    TranscriptRepository,
};
use clap::Parser;
use tracing::warn;

use crate::app::App;
use crate::event::EventBus;
use crate::tui::Tui;

/// Terminal chat client for a local LLM server.
#[derive(Debug, Parser)]
#[command(name = "banter", version, about)]
struct Cli {
    /// Base URL of the chat server.
    #[arg(long, default_value = "http://localhost:5000")]
    server_url: String,

    /// Token budget requested per completion.
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,

    /// Request budget in seconds, streamed replies included.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Log file path; defaults to banter.log next to the saved history.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone())?;
    tracing::info!(server = %cli.server_url, "starting banter");

    let transcript_repo = Arc::new(TranscriptJsonRepository::new()?);
    let preferences_repo = Arc::new(PreferencesJsonRepository::new()?);

    let preferences = match preferences_repo.load().await {
        Ok(preferences) => preferences,
        Err(e) => {
            warn!(error = %e, "could not load preferences, using defaults");
            Default::default()
        }
    };
    let restored = match transcript_repo.load().await {
        Ok(transcript) => transcript.map(|t| t.turns).unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "could not restore transcript");
            Vec::new()
        }
    };

    let client =
        ChatApiClient::with_timeout(&cli.server_url, Duration::from_secs(cli.timeout_secs));
    let mut events = EventBus::new(Duration::from_millis(100));
    let mut app = App::new(
        client,
        preferences,
        restored,
        transcript_repo,
        preferences_repo,
        events.sender(),
        cli.max_tokens,
    );

    let mut terminal = tui::init()?;
    app.bootstrap();
    let result = run(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    app.shutdown().await;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventBus) -> Result<()> {
    terminal.draw(|frame| views::render(frame, app))?;
    while let Some(event) = events.next().await {
        app.handle_event(event);
        if app.should_quit() {
            break;
        }
        terminal.draw(|frame| views::render(frame, app))?;
    }
    Ok(())
}

fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            let dir = dirs::config_dir()
                .context("no config directory on this platform")?
                .join("banter");
            std::fs::create_dir_all(&dir)?;
            dir.join("banter.log")
        }
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
