//! Chat panel rendering (history list + message input box).

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use peerchat_proto::message::{Message, MessageKind};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the chat panel (history + input box).
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_history(frame, chunks[0], app);
    render_input(frame, chunks[1], app);
}

/// Render the message history.
///
/// Local messages are right-aligned; file messages render as a labelled
/// attachment line instead of their raw data-URI content.
fn render_history(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::History;

    // Window the list so the scroll position is the bottom-most visible row.
    let visible = area.height.saturating_sub(2) as usize;
    let bottom = app
        .history_scroll
        .min(app.history.len().saturating_sub(1));
    let start = (bottom + 1).saturating_sub(visible.max(1));

    let items: Vec<ListItem> = app
        .history
        .iter()
        .skip(start)
        .map(|msg| ListItem::new(message_line(msg, app)))
        .collect();

    let block = Block::default()
        .title("Chat")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(List::new(items).block(block), area);
}

/// Build the display line for one history entry.
fn message_line<'a>(msg: &'a Message, app: &App) -> Line<'a> {
    let is_own = msg.sender == app.local;

    let body = match msg.kind {
        MessageKind::Text => Span::styled(
            msg.content.as_str(),
            if is_own {
                theme::own_message()
            } else {
                theme::normal()
            },
        ),
        MessageKind::File => {
            let name = msg.file_name.as_deref().unwrap_or("attachment");
            let size = attachment_size(&msg.content);
            Span::styled(format!("\u{2913} {name} ({size})"), theme::attachment())
        }
    };

    let spans = if is_own {
        vec![body, Span::raw(" "), Span::styled("you", theme::dimmed())]
    } else {
        vec![
            Span::styled(
                msg.sender.as_str(),
                theme::normal().fg(theme::sender_color(msg.sender.as_str())),
            ),
            Span::raw(": "),
            body,
        ]
    };

    let line = Line::from(spans);
    if is_own {
        line.alignment(Alignment::Right)
    } else {
        line
    }
}

/// Human-readable decoded size of a data-URI attachment.
fn attachment_size(content: &str) -> String {
    peerchat_proto::data_uri::decode(content).map_or_else(
        |_| "unreadable".to_string(),
        |(_, bytes)| format_size(bytes.len()),
    )
}

/// Format a byte count as "NNN B", "N.N KB" or "N.N MB".
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Render the message input box.
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Message;

    let mut display_text = app.message_input.clone();
    if is_focused {
        if app.message_cursor >= display_text.len() {
            display_text.push('\u{2588}');
        } else {
            display_text.insert(app.message_cursor, '\u{2588}');
        }
    }

    let input_line = if display_text.is_empty() && !is_focused {
        Line::from(Span::styled(
            "Type a message, /file <path> to attach...",
            theme::dimmed(),
        ))
    } else {
        Line::from(Span::styled(display_text, theme::normal()))
    };

    let block = Block::default()
        .title("Message")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(Paragraph::new(input_line).block(block), area);
}
