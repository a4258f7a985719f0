use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Clear, Paragraph, Wrap};

use crate::app::{App, ToastLevel};

const TOAST_WIDTH: u16 = 36;
const TOAST_HEIGHT: u16 = 4;

pub fn render(frame: &mut Frame, app: &App) {
    let Some(toast) = &app.toast else {
        return;
    };
    let theme = app.theme;
    let root = frame.area();
    if root.width < TOAST_WIDTH + 4 || root.height < TOAST_HEIGHT + 2 {
        return;
    }

    let area = Rect::new(
        root.right() - TOAST_WIDTH - 2,
        root.y + 1,
        TOAST_WIDTH,
        TOAST_HEIGHT,
    );
    frame.render_widget(Clear, area);

    let color = match toast.level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Error => theme.error,
    };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme.surface))
        .title(
            Line::from(format!(" {} ", toast.title))
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(toast.message.clone())
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(theme.text)),
        inner,
    );
}
