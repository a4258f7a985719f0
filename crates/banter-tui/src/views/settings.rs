use ratatui::Frame;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Clear, Padding, Paragraph};

use crate::app::{App, SETTINGS_ROWS};

pub fn render(frame: &mut Frame, app: &App) {
    let theme = app.theme;
    let area = super::centered(frame.area(), 46, SETTINGS_ROWS as u16 + 6);
    frame.render_widget(Clear, area);

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_focus))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(theme.surface))
        .title(
            Line::from(" Settings ").style(
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for (index, (label, value)) in settings_rows(app).into_iter().enumerate() {
        let selected = index == app.settings_cursor;
        let marker = if selected { "› " } else { "  " };
        let label_style = if selected {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{label:<22}"), label_style),
            Span::styled(value, Style::default().fg(theme.text)),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "↑↓ select · enter toggle · ←→ adjust · esc close",
        Style::default().fg(theme.text_dim),
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

pub(crate) fn settings_rows(app: &App) -> Vec<(&'static str, String)> {
    vec![
        ("Dark mode", on_off(app.preferences.dark_mode)),
        ("Font size", format!("{:.0}", app.preferences.font_size)),
        ("Eye comfort", on_off(app.preferences.eye_comfort)),
        (
            "Comfort intensity",
            format!("{:.1}", app.preferences.eye_comfort_intensity),
        ),
        ("Fast mode", on_off(app.preferences.fast_mode)),
        ("Request thoughts", on_off(app.include_thoughts())),
    ]
}

fn on_off(value: bool) -> String {
    if value { "on" } else { "off" }.to_string()
}
