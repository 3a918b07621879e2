//! Chat surface state and input handling.
//!
//! The surface is purely reactive to session snapshots: the only state it
//! owns is the two transient input buffers (outbound message, remote
//! identity), both cleared immediately after a successful submission, plus
//! scroll/focus chrome. All network actions leave as [`NetCommand`]s.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use peerchat_proto::data_uri;
use peerchat_proto::message::{Message, MessageKind, PeerId};

use crate::net::NetCommand;
use crate::session::{SessionSnapshot, SessionState};

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Message input box (default).
    Message,
    /// Remote-identity connect box.
    Connect,
    /// Chat history list.
    History,
}

/// Main application state.
pub struct App {
    /// In-progress message text.
    pub message_input: String,
    /// Cursor position in the message input.
    pub message_cursor: usize,
    /// In-progress remote-identity text.
    pub connect_input: String,
    /// Cursor position in the connect input.
    pub connect_cursor: usize,
    /// Which panel is focused.
    pub focus: PanelFocus,
    /// Scroll position in the history list (index of the bottom-most
    /// visible entry).
    pub history_scroll: usize,
    /// The local identity.
    pub local: PeerId,
    /// Latest observed session state.
    pub state: SessionState,
    /// Latest observed connected-peer list.
    pub peers: Vec<PeerId>,
    /// Latest observed message history.
    pub history: Vec<Message>,
    /// Transient status-line notice.
    pub notice: Option<String>,
    /// Directory the `/save` command writes attachments to.
    pub download_dir: PathBuf,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create a fresh surface for `local` with registration pending.
    #[must_use]
    pub fn new(local: PeerId, download_dir: PathBuf) -> Self {
        Self {
            message_input: String::new(),
            message_cursor: 0,
            connect_input: String::new(),
            connect_cursor: 0,
            focus: PanelFocus::Message,
            history_scroll: 0,
            local,
            state: SessionState::Connecting,
            peers: Vec::new(),
            history: Vec::new(),
            notice: None,
            download_dir,
            should_quit: false,
        }
    }

    /// Replace the rendered session view with a fresh snapshot.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        let grew = snapshot.history.len() > self.history.len();
        self.local = snapshot.local;
        self.state = snapshot.state;
        self.peers = snapshot.peers;
        self.history = snapshot.history;
        if grew {
            // Follow new messages.
            self.history_scroll = self.history.len().saturating_sub(1);
        }
    }

    /// Set the status-line notice.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Prefill the connect box (CLI flag or remembered peer).
    pub fn prefill_connect(&mut self, peer: &str) {
        self.connect_input = peer.to_string();
        self.connect_cursor = self.connect_input.len();
    }

    /// Handle a key event, returning a command when the action requires
    /// network dispatch.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<NetCommand> {
        // Global shortcuts
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.should_quit = true;
                return None;
            }
            (KeyCode::Tab, KeyModifiers::SHIFT) => {
                self.cycle_focus_backward();
                return None;
            }
            (KeyCode::Tab | KeyCode::BackTab, _) => {
                self.cycle_focus_forward();
                return None;
            }
            _ => {}
        }

        match self.focus {
            PanelFocus::Message => self.handle_message_key(key),
            PanelFocus::Connect => self.handle_connect_key(key),
            PanelFocus::History => {
                self.handle_history_key(key);
                None
            }
        }
    }

    /// Key event while the message input is focused.
    fn handle_message_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Enter => self.submit_message(),
            KeyCode::Char(c) => {
                self.message_input.insert(self.message_cursor, c);
                self.message_cursor += c.len_utf8();
                None
            }
            KeyCode::Backspace => {
                if self.message_cursor > 0 {
                    let removed = self.message_input.remove(self.message_cursor - 1);
                    self.message_cursor -= removed.len_utf8();
                }
                None
            }
            KeyCode::Left => {
                self.message_cursor = self.message_cursor.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                if self.message_cursor < self.message_input.len() {
                    self.message_cursor += 1;
                }
                None
            }
            KeyCode::Home => {
                self.message_cursor = 0;
                None
            }
            KeyCode::End => {
                self.message_cursor = self.message_input.len();
                None
            }
            _ => None,
        }
    }

    /// Key event while the connect input is focused.
    fn handle_connect_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Enter => self.submit_connect(),
            KeyCode::Char(c) => {
                self.connect_input.insert(self.connect_cursor, c);
                self.connect_cursor += c.len_utf8();
                None
            }
            KeyCode::Backspace => {
                if self.connect_cursor > 0 {
                    let removed = self.connect_input.remove(self.connect_cursor - 1);
                    self.connect_cursor -= removed.len_utf8();
                }
                None
            }
            KeyCode::Left => {
                self.connect_cursor = self.connect_cursor.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                if self.connect_cursor < self.connect_input.len() {
                    self.connect_cursor += 1;
                }
                None
            }
            _ => None,
        }
    }

    /// Key event while the history list is focused.
    const fn handle_history_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.history_scroll > 0 {
                    self.history_scroll -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.history_scroll < self.history.len().saturating_sub(1) {
                    self.history_scroll += 1;
                }
            }
            _ => {}
        }
    }

    /// Cycle focus forward: Message -> Connect -> History -> Message.
    const fn cycle_focus_forward(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Message => PanelFocus::Connect,
            PanelFocus::Connect => PanelFocus::History,
            PanelFocus::History => PanelFocus::Message,
        };
    }

    /// Cycle focus backward: Message -> History -> Connect -> Message.
    const fn cycle_focus_backward(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Message => PanelFocus::History,
            PanelFocus::History => PanelFocus::Connect,
            PanelFocus::Connect => PanelFocus::Message,
        };
    }

    /// Submit the message input: plain text, or a `/file` / `/save` command.
    fn submit_message(&mut self) -> Option<NetCommand> {
        let text = self.message_input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.message_input.clear();
        self.message_cursor = 0;

        if let Some(rest) = text.strip_prefix("/file")
            && (rest.is_empty() || rest.starts_with(' '))
        {
            let path = rest.trim();
            if path.is_empty() {
                self.set_notice("usage: /file <path>");
                return None;
            }
            return Some(NetCommand::SendFile {
                path: PathBuf::from(path),
            });
        }
        if let Some(rest) = text.strip_prefix("/save")
            && (rest.is_empty() || rest.starts_with(' '))
        {
            self.save_attachment(rest.trim());
            return None;
        }
        if text.starts_with('/') {
            self.set_notice(format!("unknown command: {text}"));
            return None;
        }

        Some(NetCommand::SendText { text })
    }

    /// Submit the connect input as a dial request.
    fn submit_connect(&mut self) -> Option<NetCommand> {
        let peer = self.connect_input.trim().to_string();
        if peer.is_empty() {
            return None;
        }
        self.connect_input.clear();
        self.connect_cursor = 0;
        Some(NetCommand::Connect { peer })
    }

    /// Decode the n-th attachment (1-based) into the download directory.
    fn save_attachment(&mut self, arg: &str) {
        let Ok(n) = arg.parse::<usize>() else {
            self.set_notice("usage: /save <n>  (n-th attachment in the history)");
            return;
        };
        let Some(message) = self
            .history
            .iter()
            .filter(|m| m.kind == MessageKind::File)
            .nth(n.saturating_sub(1))
        else {
            self.set_notice(format!("no attachment #{n}"));
            return;
        };

        let name = message
            .file_name
            .clone()
            .unwrap_or_else(|| format!("attachment-{n}.bin"));
        let bytes = match data_uri::decode(&message.content) {
            Ok((_, bytes)) => bytes,
            Err(e) => {
                self.set_notice(format!("could not decode {name}: {e}"));
                return;
            }
        };

        let target = self.download_dir.join(&name);
        match std::fs::write(&target, &bytes) {
            Ok(()) => self.set_notice(format!("saved {name} to {}", self.download_dir.display())),
            Err(e) => self.set_notice(format!("could not save {name}: {e}")),
        }
    }
}
