pub mod chat;
pub mod composer;
pub mod settings;
pub mod sidebar;
pub mod toast;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::Block;

use crate::app::{App, Popup};

const SIDEBAR_WIDTH: u16 = 26;

/// Draw the whole UI for one frame.
pub fn render(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    frame.render_widget(
        Block::default().style(
            Style::default()
                .bg(app.theme.background)
                .fg(app.theme.text),
        ),
        root,
    );

    // The composer grows with its content, up to a few lines.
    let composer_height = (app.composer.lines().len() as u16).clamp(1, 4) + 2;
    let [main_area, composer_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(composer_height)]).areas(root);

    let chat_area = if app.sidebar_open {
        let [sidebar_area, chat_area] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
                .areas(main_area);
        sidebar::render(frame, sidebar_area, app);
        chat_area
    } else {
        main_area
    };

    chat::render(frame, chat_area, app);
    composer::render(frame, composer_area, app);

    if app.popup == Popup::Settings {
        settings::render(frame, app);
    }
    toast::render(frame, app);
}

/// A `width` x `height` rectangle centred in `area`, shrunk to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
