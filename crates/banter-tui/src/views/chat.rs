use banter_core::{ChatTurn, Role};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};

use crate::app::{App, Focus};
use crate::theme::{self, Theme};

/// Marker appended to streamed text while the reply is still arriving.
const CURSOR: &str = "▍";
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
    let theme = app.theme;
    let focused = app.focus == Focus::Transcript;
    let mut block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused {
            theme.border_focus
        } else {
            theme.border
        }))
        .padding(Padding::horizontal(1))
        .title(Line::from(" Chat ").style(Style::default().fg(theme.text_dim)));
    if let Some(time) = &app.last_processing_time {
        block = block.title_bottom(
            Line::from(format!(" last reply {time} "))
                .right_aligned()
                .style(Style::default().fg(theme.text_dim)),
        );
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let lines = transcript_lines(app, inner.width as usize);
    let max_offset = (lines.len() as u16).saturating_sub(inner.height);
    if app.scroll.pinned {
        app.scroll.offset = max_offset;
    } else {
        app.scroll.offset = app.scroll.offset.min(max_offset);
        // Scrolling back down to the bottom re-engages following.
        if app.scroll.offset == max_offset {
            app.scroll.pinned = true;
        }
    }

    let paragraph = Paragraph::new(Text::from(lines)).scroll((app.scroll.offset, 0));
    frame.render_widget(paragraph, inner);
}

/// All transcript rows, already wrapped to `width` so scroll offsets are
/// exact display rows.
fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let spacing = theme::turn_spacing(app.preferences.font_size);
    let mut lines = Vec::new();
    for (index, turn) in app.turns.iter().enumerate() {
        push_turn_lines(
            &mut lines,
            turn,
            &app.theme,
            width,
            app.selected_turn == Some(index),
            app.revealed_thoughts.contains(&index),
        );
        for _ in 0..spacing {
            lines.push(Line::default());
        }
    }
    push_live_lines(&mut lines, app, width);
    lines
}

fn push_turn_lines(
    lines: &mut Vec<Line<'static>>,
    turn: &ChatTurn,
    theme: &Theme,
    width: usize,
    selected: bool,
    thoughts_open: bool,
) {
    let (label, color) = role_heading(turn.role, theme);
    let mut header = vec![Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if turn.thoughts.is_some() {
        let hint = if thoughts_open {
            "  [t] hide thoughts"
        } else {
            "  [t] show thoughts"
        };
        header.push(Span::styled(hint, Style::default().fg(theme.text_dim)));
    }
    let mut header_line = Line::from(header);
    if selected {
        header_line = header_line.style(Style::default().bg(theme.surface));
    }
    lines.push(header_line);

    if thoughts_open && let Some(thoughts) = &turn.thoughts {
        for row in wrap_text(thoughts, width.saturating_sub(2).max(1)) {
            lines.push(Line::from(Span::styled(
                format!("  {row}"),
                Style::default()
                    .fg(theme.thought)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
    }

    let body_color = if turn.role == Role::System {
        theme.system
    } else {
        theme.text
    };
    for row in wrap_text(&turn.text, width) {
        lines.push(Line::from(Span::styled(
            row,
            Style::default().fg(body_color),
        )));
    }
}

/// The in-flight assistant turn: streamed text with a cursor marker, or a
/// spinner while nothing has arrived yet.
fn push_live_lines(lines: &mut Vec<Line<'static>>, app: &App, width: usize) {
    if !app.in_flight() {
        return;
    }
    let theme = &app.theme;
    lines.push(Line::from(Span::styled(
        "Assistant",
        Style::default()
            .fg(theme.assistant)
            .add_modifier(Modifier::BOLD),
    )));
    match app.live_text.as_deref() {
        Some(text) => {
            let display = format!("{text}{CURSOR}");
            for row in wrap_text(&display, width) {
                lines.push(Line::from(Span::styled(
                    row,
                    Style::default().fg(theme.text),
                )));
            }
        }
        None => {
            let glyph = SPINNER[app.tick % SPINNER.len()];
            lines.push(Line::from(Span::styled(
                format!("{glyph} thinking"),
                Style::default().fg(theme.text_dim),
            )));
        }
    }
}

fn role_heading(role: Role, theme: &Theme) -> (&'static str, ratatui::style::Color) {
    match role {
        Role::User => ("You", theme.user),
        Role::Assistant => ("Assistant", theme.assistant),
        Role::System => ("System", theme.system),
    }
}

/// Word-wrap `text` to `width` columns, preserving explicit newlines.
/// Words wider than a whole row are hard-broken.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        if line.chars().count() <= width {
            rows.push(line.to_string());
            continue;
        }
        let mut row = String::new();
        let mut row_len = 0usize;
        for word in line.split(' ') {
            let word_len = word.chars().count();
            if row_len > 0 && row_len + 1 + word_len > width {
                rows.push(std::mem::take(&mut row));
                row_len = 0;
            }
            if row_len > 0 {
                row.push(' ');
                row_len += 1;
            }
            if word_len > width {
                for ch in word.chars() {
                    if row_len == width {
                        rows.push(std::mem::take(&mut row));
                        row_len = 0;
                    }
                    row.push(ch);
                    row_len += 1;
                }
            } else {
                row.push_str(word);
                row_len += word_len;
            }
        }
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_passes_through() {
        assert_eq!(wrap_text("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_empty_text_is_one_empty_row() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn test_explicit_newlines_are_preserved() {
        assert_eq!(wrap_text("hi\n\nthere", 10), vec!["hi", "", "there"]);
    }

    #[test]
    fn test_long_word_is_hard_broken() {
        assert_eq!(
            wrap_text("ababababababab", 4),
            vec!["abab", "abab", "abab", "ab"]
        );
    }

    #[test]
    fn test_long_word_after_short_word_starts_fresh_row() {
        assert_eq!(wrap_text("a bbbbbb", 4), vec!["a", "bbbb", "bb"]);
    }

    #[test]
    fn test_width_counts_chars_not_bytes() {
        assert_eq!(wrap_text("héllo wörld", 5), vec!["héllo", "wörld"]);
    }

    #[test]
    fn test_role_headings() {
        let theme = Theme::dark();
        assert_eq!(role_heading(Role::User, &theme).0, "You");
        assert_eq!(role_heading(Role::Assistant, &theme).0, "Assistant");
        assert_eq!(role_heading(Role::System, &theme).0, "System");
    }
}
