use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType};

use crate::app::{App, Focus};

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
    let theme = app.theme;
    let focused = app.focus == Focus::Composer && !app.in_flight();

    let title = if app.in_flight() {
        let glyph = SPINNER[app.tick % SPINNER.len()];
        let verb = if app.is_streaming() {
            "streaming reply"
        } else {
            "waiting for reply"
        };
        format!(" {glyph} {verb} · esc cancels ")
    } else {
        " Message · enter sends · alt+enter newline ".to_string()
    };

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused {
            theme.border_focus
        } else {
            theme.border
        }))
        .title(Line::from(title).style(Style::default().fg(theme.text_dim)));

    if app.in_flight() {
        app.composer.set_style(Style::default().fg(theme.text_dim));
        app.composer.set_cursor_style(Style::default());
    } else {
        app.composer.set_style(Style::default().fg(theme.text));
        app.composer
            .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    }
    app.composer.set_cursor_line_style(Style::default());
    app.composer
        .set_placeholder_style(Style::default().fg(theme.text_dim));
    app.composer.set_block(block);

    frame.render_widget(&app.composer, area);
}
