//! Terminal UI rendering.

pub mod chat_panel;
pub mod peers_panel;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Main layout with status bar at bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    // Two-column layout: peers on the left, chat on the right
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(24), Constraint::Percentage(76)])
        .split(content_area);

    peers_panel::render(frame, content_chunks[0], app);
    chat_panel::render(frame, content_chunks[1], app);

    status_bar::render(frame, status_area, app);
}
