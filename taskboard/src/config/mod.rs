//! Configuration for the `taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{RoomId, TaskId, TaskStatus, UserId};

use crate::board::sync::DEFAULT_CHANNEL_CAPACITY;
use crate::notify::ListenerConfig;
use crate::session::{Actor, Session, SessionError};
use crate::store::http::DEFAULT_REQUEST_TIMEOUT;

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
    server: ServerFileConfig,
    board: BoardFileConfig,
    user: UserFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    api_url: Option<String>,
    ws_url: Option<String>,
    token: Option<String>,
    request_timeout_secs: Option<u64>,
    reconnect_delay_secs: Option<u64>,
    max_reconnect_attempts: Option<u32>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    room_id: Option<u64>,
    mine_only: Option<bool>,
    channel_capacity: Option<usize>,
}

/// `[user]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UserFileConfig {
    id: Option<u64>,
    username: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // -- Server --
    /// REST API root. `None` runs the offline demo.
    pub api_url: Option<String>,
    /// Notification WebSocket override; derived from `api_url` if unset.
    pub ws_url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Per-request timeout for the REST API.
    pub request_timeout: Duration,
    /// Pause before reconnecting the notification socket.
    pub reconnect_delay: Duration,
    /// Consecutive failed reconnects before the listener gives up.
    pub max_reconnect_attempts: u32,

    // -- Board --
    /// Room to show; `None` shows every room.
    pub room_id: Option<u64>,
    /// Show only tasks assigned to the current user.
    pub mine_only: bool,
    /// Capacity of the synchronizer's completion channel.
    pub channel_capacity: usize,

    // -- User --
    /// Account id of the current user.
    pub user_id: Option<u64>,
    /// Display name of the current user.
    pub username: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let listener = ListenerConfig::default();
        Self {
            api_url: None,
            ws_url: None,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: listener.reconnect_delay,
            max_reconnect_attempts: listener.max_attempts.unwrap_or(10),
            room_id: None,
            mine_only: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            user_id: None,
            username: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/taskboard/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            api_url: cli.api_url.clone().or_else(|| file.server.api_url.clone()),
            ws_url: cli.ws_url.clone().or_else(|| file.server.ws_url.clone()),
            token: cli.token.clone().or_else(|| file.server.token.clone()),
            request_timeout: file
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            reconnect_delay: file
                .server
                .reconnect_delay_secs
                .map_or(defaults.reconnect_delay, Duration::from_secs),
            max_reconnect_attempts: file
                .server
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            room_id: cli.room.or(file.board.room_id),
            mine_only: cli.mine || file.board.mine_only.unwrap_or(defaults.mine_only),
            channel_capacity: file
                .board
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            user_id: cli.user_id.or(file.user.id),
            username: cli
                .username
                .clone()
                .or_else(|| file.user.username.clone()),
        }
    }

    /// Board scope described by this configuration.
    #[must_use]
    pub fn filter(&self) -> TaskFilter {
        let filter = self
            .room_id
            .map_or_else(TaskFilter::all, |room| TaskFilter::all().in_room(RoomId::new(room)));
        if self.mine_only { filter.mine() } else { filter }
    }

    /// The current user, if an id is configured.
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        let id = UserId::new(self.user_id?);
        Some(Actor {
            id,
            username: self.username.clone().unwrap_or_else(|| format!("user-{id}")),
        })
    }

    /// Builds the session for the configured backend.
    ///
    /// Returns `Ok(None)` if no API URL is configured (offline demo mode).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if either URL is malformed.
    pub fn to_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(api_url) = self.api_url.as_deref().filter(|url| !url.is_empty()) else {
            return Ok(None);
        };
        let mut session = Session::new(api_url)?;
        if let Some(ws_url) = &self.ws_url {
            session = session.with_ws_url(ws_url)?;
        }
        if let Some(token) = &self.token {
            session = session.with_token(token.clone());
        }
        if let Some(actor) = self.actor() {
            session = session.with_actor(actor);
        }
        Ok(Some(session))
    }

    /// Reconnect policy for the notification listener.
    #[must_use]
    pub const fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            reconnect_delay: self.reconnect_delay,
            max_attempts: Some(self.max_reconnect_attempts),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban board client with optimistic synchronization")]
pub struct CliArgs {
    /// Root of the REST API (e.g. `http://127.0.0.1:8000/api`).
    #[arg(long, env = "TASKBOARD_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Notification WebSocket URL (default: derived from the API URL).
    #[arg(long, env = "TASKBOARD_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Bearer token for the API.
    #[arg(long, env = "TASKBOARD_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Your account id.
    #[arg(long, env = "TASKBOARD_USER_ID", global = true)]
    pub user_id: Option<u64>,

    /// Your display name.
    #[arg(long, env = "TASKBOARD_USERNAME", global = true)]
    pub username: Option<String>,

    /// Only show tasks in this room.
    #[arg(long, global = true)]
    pub room: Option<u64>,

    /// Only show tasks assigned to you.
    #[arg(long, global = true)]
    pub mine: bool,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG", global = true)]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do; defaults to `show`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `taskboard` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load and print the board.
    Show,
    /// Drag a task onto a column.
    Move {
        /// Task to move.
        id: TaskId,
        /// Destination column (`todo`, `in_progress`, `done`).
        status: TaskStatus,
        /// Position within the destination column (default: bottom).
        #[arg(long)]
        index: Option<usize>,
    },
    /// Drag a task off the board, deleting it.
    Delete {
        /// Task to delete.
        id: TaskId,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Print the board and reprint it whenever it changes, until Ctrl-C.
    Watch,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
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
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
