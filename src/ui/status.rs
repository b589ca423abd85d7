use crate::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const HINTS: &str = "[1-4/Tab]category [j/k]move [o]pen [c]omments [r]eload [q]uit";

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(&**msg)
    } else {
        match app.state.progress() {
            Some((done, total)) if done < total => {
                Cow::Owned(format!("Loading stories... {}/{}", done, total))
            }
            _ => Cow::Borrowed(HINTS),
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
