use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph};

use crate::app::{App, Focus};

const KEY_HINTS: &[(&str, &str)] = &[
    ("tab", "switch focus"),
    ("enter", "send / select"),
    ("ctrl+n", "new chat"),
    ("ctrl+b", "sidebar"),
    ("ctrl+o", "settings"),
    ("esc", "cancel request"),
    ("ctrl+c", "quit"),
];

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let focused = app.focus == Focus::Sidebar;
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused {
            theme.border_focus
        } else {
            theme.border
        }))
        .padding(Padding::horizontal(1))
        .title(
            Line::from(" banter ").style(
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 4 {
        return;
    }

    let hints_height = KEY_HINTS.len() as u16 + 3;
    let [models_area, hints_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(hints_height)]).areas(inner);

    render_models(frame, models_area, app);
    render_hints(frame, hints_area, app);
}

fn render_models(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let [header, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Models",
            Style::default().fg(theme.text_dim),
        ))),
        header,
    );

    if app.models.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "(none reported)",
                Style::default()
                    .fg(theme.text_dim)
                    .add_modifier(Modifier::ITALIC),
            ))),
            list_area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .models
        .iter()
        .map(|entry| {
            let current = Some(&entry.name) == app.current_model.as_ref();
            let marker = if current { "● " } else { "  " };
            let style = if current {
                Style::default().fg(theme.accent)
            } else {
                Style::default().fg(theme.text)
            };
            ListItem::new(Line::from(Span::styled(
                format!("{marker}{}", entry.name),
                style,
            )))
        })
        .collect();
    let list = List::new(items).highlight_style(
        Style::default()
            .bg(theme.surface)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(app.model_cursor));
    frame.render_stateful_widget(list, list_area, &mut state);
}

fn render_hints(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let current = app.current_model.as_deref().unwrap_or("(server default)");
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Current: ", Style::default().fg(theme.text_dim)),
            Span::styled(current.to_string(), Style::default().fg(theme.text)),
        ]),
        Line::default(),
    ];
    for (key, action) in KEY_HINTS {
        lines.push(Line::from(vec![
            Span::styled(format!("{key:<7}"), Style::default().fg(theme.accent)),
            Span::styled(*action, Style::default().fg(theme.text_dim)),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), area);
}
