//! `PeerChat` — peer-to-peer terminal chat.
//!
//! Launches the TUI, registers an identity with the signaling broker, and
//! chats with peers dialed by identity. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/peerchat/config.toml`).
//!
//! ```bash
//! # Offline mode (no broker configured)
//! cargo run --bin peerchat
//!
//! # Register with a broker and prefill a peer to dial
//! cargo run --bin peerchat -- --server-url ws://127.0.0.1:9000/ws \
//!     --identity alice --connect bob
//!
//! # Or via environment variables
//! PEERCHAT_SERVER_URL=ws://127.0.0.1:9000/ws PEERCHAT_IDENTITY=alice cargo run
//! ```

use std::io;
use std::path::Path;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use peerchat::app::App;
use peerchat::config::{CliArgs, ClientConfig};
use peerchat::net::{self, NetCommand, NetEvent};
use peerchat::prefs::PrefStore;
use peerchat::session::SessionState;
use peerchat::signaling::ws::WsSignaling;
use peerchat::ui;
use peerchat_proto::message::PeerId;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("peerchat starting");

    // One identity per process run: configured, or freshly generated.
    let identity = config
        .identity
        .clone()
        .map_or_else(PeerId::generate, PeerId::new);

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, identity, &config).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("peerchat exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the
/// terminal). Returns a [`WorkerGuard`] that must be held until shutdown
/// to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("peerchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
///
/// The broker registration is a single attempt: when the WebSocket
/// connection itself fails the UI runs offline in the `Disconnected`
/// state, and a fresh attempt requires restarting the program.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    identity: PeerId,
    config: &ClientConfig,
) -> io::Result<()> {
    let prefs = PrefStore::open_default();
    let mut app = App::new(identity.clone(), config.resolved_download_dir());

    // Prefill the connect box: CLI flag wins over the remembered peer.
    if let Some(peer) = config.connect.clone().or_else(|| prefs.get("last_peer")) {
        app.prefill_connect(&peer);
    }

    let (cmd_tx, mut evt_rx) = match config.server_url {
        Some(ref url) => match WsSignaling::connect(url, identity).await {
            Ok(service) => {
                let (tx, rx) = net::spawn_net(service, config.channel_capacity);
                (Some(tx), Some(rx))
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "broker connection failed");
                app.state = SessionState::Disconnected;
                app.set_notice(format!("could not reach signaling broker ({e})"));
                (None, None)
            }
        },
        None => {
            app.state = SessionState::Disconnected;
            app.set_notice("no signaling broker configured — offline");
            (None, None)
        }
    };

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain all pending NetEvents (non-blocking).
        if let Some(ref mut rx) = evt_rx {
            drain_net_events(&mut app, rx);
        }

        // Step 3: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(net_cmd) = app.handle_key_event(key) {
                if let NetCommand::Connect { ref peer } = net_cmd {
                    prefs.set("last_peer", peer);
                }
                match cmd_tx {
                    Some(ref tx) => match tx.try_send(net_cmd) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            app.set_notice("network busy — command dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            app.set_notice("network disconnected");
                        }
                    },
                    None => app.set_notice("offline — command not sent"),
                }
            }
        }

        if app.should_quit {
            // Stop the driver task; dropping the service releases the
            // registration regardless of the observed state.
            if let Some(ref tx) = cmd_tx {
                let _ = tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Drain all pending `NetEvent`s from the receiver and apply them to the app.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            NetEvent::Snapshot(snapshot) => app.apply_snapshot(snapshot),
            NetEvent::Notice(notice) => app.set_notice(notice),
        }
    }
}
