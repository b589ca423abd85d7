//! Input handling for the TUI.
//!
//! Keys map either to view-only changes (selection, status line) or to state
//! machine events (category switch, refresh).

use crate::app::App;
use crate::hn::Category;
use crate::util::{url_host, validate_url_for_open};
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('r') => {
            let label = app.state.current_category.label();
            app.refresh();
            app.set_status(format!("Reloading {} stories...", label));
        }
        KeyCode::Tab => {
            let next = app.state.current_category.next();
            app.change_category(next);
        }
        KeyCode::BackTab => {
            let current = app.state.current_category;
            // Previous tab: three steps forward on a four-tab ring
            let prev = current.next().next().next();
            app.change_category(prev);
        }
        KeyCode::Char(c @ '1'..='4') => {
            let idx = (c as usize) - ('1' as usize);
            let category = Category::ALL[idx];
            if category != app.state.current_category {
                app.change_category(category);
            }
        }
        KeyCode::Char('o') | KeyCode::Enter => open_selected(app, false),
        KeyCode::Char('c') => open_selected(app, true),
        _ => {}
    }
    Action::Continue
}

/// Open the selected story's link, or its discussion page.
///
/// Stories without an external link always open the discussion page.
fn open_selected(app: &mut App, discussion: bool) {
    let Some(story) = app.selected_story() else {
        app.set_status("Story has not loaded");
        return;
    };

    let target = match (&story.url, discussion) {
        (Some(url), false) => url.clone(),
        _ => story.discussion_url(),
    };

    // SEC: Validate URL before open::that() to prevent command injection
    match validate_url_for_open(&target) {
        Err(e) => app.set_status(e.to_string()),
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                app.set_status(format!("Failed to open browser: {}", e));
            } else {
                let host = url_host(url.as_str()).unwrap_or_default();
                app.set_status(format!("Opening {}...", host));
            }
        }
    }
}
