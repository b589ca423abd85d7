use crate::app::{App, StoryResult};
use crate::deferred::Deferred;
use crate::hn::{ItemId, StoryItem};
use crate::util::{format_age, sanitize_title, truncate_to_width, url_host};
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// Braille spinner shown while fetches are outstanding.
pub(super) const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the story list panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let spinner = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Hacker News - {}", app.state.current_category.label()));

    match &app.state.items {
        Deferred::NotStarted => {
            f.render_widget(Paragraph::new("Starting...").block(block), area);
        }
        Deferred::InProgress => {
            let msg = format!(
                "{} Loading {} stories...",
                spinner,
                app.state.current_category.label()
            );
            f.render_widget(
                Paragraph::new(msg)
                    .alignment(Alignment::Center)
                    .block(block),
                area,
            );
        }
        Deferred::Resolved(Err(error)) => {
            let text = vec![
                Line::from(Span::styled(
                    "Failed to load stories",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(sanitize_title(error).into_owned()),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to try again",
                    Style::default().fg(Color::Gray),
                )),
            ];
            f.render_widget(
                Paragraph::new(text)
                    .wrap(Wrap { trim: true })
                    .alignment(Alignment::Center)
                    .block(block),
                area,
            );
        }
        Deferred::Resolved(Ok(map)) if map.is_empty() => {
            f.render_widget(Paragraph::new("No stories").block(block), area);
        }
        Deferred::Resolved(Ok(_)) => {
            let now = Utc::now().timestamp();
            let width = area.width.saturating_sub(2) as usize;
            let items: Vec<ListItem> = app
                .state
                .sorted_items()
                .into_iter()
                .enumerate()
                .map(|(i, (id, status))| {
                    ListItem::new(story_line(id, status, i == app.selected, spinner, now, width))
                })
                .collect();
            f.render_widget(List::new(items).block(block), area);
        }
    }
}

fn story_line(
    id: ItemId,
    status: &Deferred<StoryResult>,
    selected: bool,
    spinner: &str,
    now: i64,
    width: usize,
) -> Line<'static> {
    let selected_style = Style::default().bg(Color::DarkGray).fg(Color::White);

    match status {
        Deferred::NotStarted | Deferred::InProgress => {
            let style = if selected {
                selected_style
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(format!("{:>5} {} Loading #{}", "", spinner, id), style))
        }
        Deferred::Resolved(Err(error)) => {
            let style = if selected {
                selected_style
            } else {
                Style::default().fg(Color::Red)
            };
            let text = format!("{:>5} #{} failed: {}", "!", id, sanitize_title(error));
            Line::from(Span::styled(truncate_to_width(&text, width).into_owned(), style))
        }
        Deferred::Resolved(Ok(item)) => loaded_line(item, selected, now, width),
    }
}

fn loaded_line(item: &StoryItem, selected: bool, now: i64, width: usize) -> Line<'static> {
    let title_style = if selected {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let dim = Style::default().fg(Color::DarkGray);

    let score = format!("{:>5} ", item.score);
    let host = item
        .url
        .as_deref()
        .and_then(url_host)
        .map(|h| format!(" ({})", h))
        .unwrap_or_default();
    let meta = match item.descendants {
        Some(n) => format!("  {} | {} comments", format_age(item.time, now), n),
        None => format!("  {}", format_age(item.time, now)),
    };

    let fixed = score.chars().count() + host.chars().count() + meta.chars().count();
    let title = sanitize_title(&item.title);
    let title = truncate_to_width(&title, width.saturating_sub(fixed)).into_owned();

    Line::from(vec![
        Span::styled(score, Style::default().fg(Color::Rgb(255, 102, 0))),
        Span::styled(title, title_style),
        Span::styled(host, dim),
        Span::styled(meta, dim),
    ])
}
