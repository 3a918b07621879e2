//! Sidebar rendering: connected-peer list and the connect input box.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the sidebar (peer list + connect box).
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_peers(frame, chunks[0], app);
    render_connect(frame, chunks[1], app);
}

/// Render the connected-peer list.
fn render_peers(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = if app.peers.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "no peers connected",
            theme::dimmed(),
        )))]
    } else {
        app.peers
            .iter()
            .map(|peer| {
                let line = Line::from(vec![
                    Span::styled("\u{25cf} ", theme::normal().fg(theme::SUCCESS)),
                    Span::styled(
                        peer.as_str(),
                        theme::normal().fg(theme::sender_color(peer.as_str())),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect()
    };

    let block = Block::default().title("Peers").borders(Borders::ALL);
    frame.render_widget(List::new(items).block(block), area);
}

/// Render the remote-identity input box.
fn render_connect(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Connect;

    let mut display_text = app.connect_input.clone();
    if is_focused {
        if app.connect_cursor >= display_text.len() {
            display_text.push('\u{2588}');
        } else {
            display_text.insert(app.connect_cursor, '\u{2588}');
        }
    }

    let input_line = if display_text.is_empty() && !is_focused {
        Line::from(Span::styled("Peer ID to connect...", theme::dimmed()))
    } else {
        Line::from(Span::styled(display_text, theme::normal()))
    };

    let block = Block::default()
        .title("Connect")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(Paragraph::new(input_line).block(block), area);
}
