//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Registered/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Pending indicator color.
pub const WARNING: Color = Color::Yellow;

/// Disconnected indicator color.
pub const OFFLINE: Color = Color::DarkGray;

/// Colors assigned to remote sender names.
pub const SENDER_COLORS: [Color; 12] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::LightCyan,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightRed,
    Color::Rgb(255, 165, 0),
    Color::Rgb(180, 120, 255),
];

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (metadata, placeholders).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused panel borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Style for the local side of the conversation.
#[must_use]
pub fn own_message() -> Style {
    Style::default().fg(HIGHLIGHT)
}

/// Style for attachment lines (the downloadable-link analog).
#[must_use]
pub fn attachment() -> Style {
    Style::default()
        .fg(Color::LightBlue)
        .add_modifier(Modifier::UNDERLINED)
}

/// Style for status-line notices.
#[must_use]
pub fn notice() -> Style {
    Style::default()
        .fg(Color::Rgb(100, 140, 180))
        .add_modifier(Modifier::ITALIC)
}

/// Style for the status bar background.
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Get a color for a sender based on their name.
#[must_use]
pub fn sender_color(name: &str) -> Color {
    let hash = name.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(u32::from(b))
    });
    SENDER_COLORS[(hash as usize) % SENDER_COLORS.len()]
}
