use std::io::{BufWriter, Stdout, stdout};

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

/// The terminal type used by the application.
pub type Tui = Terminal<CrosstermBackend<BufWriter<Stdout>>>;

/// Put the terminal into raw alternate-screen mode and install a panic hook
/// that restores it, so a crash never leaves the shell unusable.
pub fn init() -> Result<Tui> {
    execute!(stdout(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    set_panic_hook();

    // BufWriter cuts write syscalls during rendering.
    let backend = CrosstermBackend::new(BufWriter::new(stdout()));
    Ok(Terminal::new(backend)?)
}

fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore(); // ignore errors, we are already failing
        hook(panic_info);
    }));
}

/// Restore the terminal to its original state.
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}
