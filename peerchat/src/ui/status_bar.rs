//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus};
use crate::session::SessionState;

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let (dot_color, status_text) = match app.state {
        SessionState::Connected => (theme::SUCCESS, "connected"),
        SessionState::Connecting => (theme::WARNING, "connecting"),
        SessionState::Disconnected => (theme::OFFLINE, "disconnected"),
    };

    let help_text = match app.focus {
        PanelFocus::Message => "Enter: send | Tab: switch panel | Esc: quit",
        PanelFocus::Connect => "Enter: connect | Tab: switch panel | Esc: quit",
        PanelFocus::History => "\u{2191}\u{2193}/jk: scroll | Tab: switch panel | Esc: quit",
    };

    let mut spans = vec![
        Span::styled("PeerChat", theme::bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | id: "),
        Span::styled(app.local.as_str(), theme::bold()),
        Span::raw(" | "),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.as_str(), theme::notice()));
    } else {
        spans.push(Span::styled(help_text, theme::dimmed()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
