//! Configuration system for the `PeerChat` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/peerchat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    signaling: SignalingFileConfig,
    ui: UiFileConfig,
    files: FilesFileConfig,
}

/// `[signaling]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SignalingFileConfig {
    server_url: Option<String>,
    identity: Option<String>,
    channel_capacity: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
}

/// `[files]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FilesFileConfig {
    download_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Signaling broker WebSocket URL. Absent means offline mode.
    pub server_url: Option<String>,
    /// Identity override. Absent means a fresh token is generated.
    pub identity: Option<String>,
    /// Peer identity to prefill the connect box with.
    pub connect: Option<String>,
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Directory the `/save` command writes attachments to.
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            identity: None,
            connect: None,
            channel_capacity: 256,
            poll_timeout: Duration::from_millis(50),
            download_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given config file cannot be
    /// read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.signaling.server_url.clone()),
            identity: cli
                .identity
                .clone()
                .or_else(|| file.signaling.identity.clone()),
            connect: cli.connect.clone(),
            channel_capacity: file
                .signaling
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.files.download_dir.clone().map(PathBuf::from)),
        }
    }

    /// The directory attachments are saved to.
    ///
    /// Falls back to the platform download directory, then the current
    /// working directory.
    #[must_use]
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Peer-to-peer terminal chat over a signaling broker")]
pub struct CliArgs {
    /// WebSocket URL of the signaling broker.
    #[arg(long, env = "PEERCHAT_SERVER_URL")]
    pub server_url: Option<String>,

    /// Your identity token (generated when omitted).
    #[arg(long, env = "PEERCHAT_IDENTITY")]
    pub identity: Option<String>,

    /// Peer identity to prefill the connect box with.
    #[arg(long, env = "PEERCHAT_CONNECT")]
    pub connect: Option<String>,

    /// Path to config file (default: `~/.config/peerchat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to save received attachments into.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "PEERCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/peerchat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("peerchat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
