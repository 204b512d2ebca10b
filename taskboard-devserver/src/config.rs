//! Dev server settings.
//!
//! Each setting comes from the first source that has it: the command line
//! (or the environment variable clap reads for it), then
//! `taskboard-devserver.toml` in the platform config directory, then the
//! built-in default.
//!
//! ```toml
//! bind_addr = "127.0.0.1:8000"
//!
//! [board]
//! seed = true
//! max_page_size = 100
//! ```

use std::path::{Path, PathBuf};

use taskboard_proto::api::BOARD_PAGE_SIZE;

/// File looked up in the platform config directory when `--config` is absent.
pub const SETTINGS_FILE: &str = "taskboard-devserver.toml";

/// Why settings could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// A page size of zero was requested.
    #[error("max_page_size must be at least 1")]
    ZeroPageSize,
}

/// Contents of the settings file. Absent keys fall through to defaults.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    bind_addr: Option<String>,
    board: BoardSettings,
}

/// `[board]` table: what the task table starts with and how lists page.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BoardSettings {
    seed: Option<bool>,
    max_page_size: Option<u32>,
}

/// Command line of `taskboard-devserver`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory Taskboard backend for local development")]
pub struct DevServerCliArgs {
    /// Address to listen on.
    #[arg(short, long, env = "TASKBOARD_DEVSERVER_ADDR")]
    pub bind: Option<String>,

    /// Settings file to use instead of the one in the config directory.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start with no tasks instead of the sample board.
    #[arg(long)]
    pub empty: bool,

    /// Largest page the list routes return.
    #[arg(long)]
    pub max_page_size: Option<u32>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "TASKBOARD_DEVSERVER_LOG")]
    pub log_level: String,
}

/// Settings the dev server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    /// Seed the task table with the sample board.
    pub seed: bool,
    /// Largest page the list routes return.
    pub max_page_size: u32,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            seed: true,
            max_page_size: BOARD_PAGE_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl DevServerConfig {
    /// Reads the settings file and applies `cli` on top of it.
    ///
    /// A missing file is only an error when it was named with `--config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if
    /// the page size ends up zero.
    pub fn load(cli: &DevServerCliArgs) -> Result<Self, ConfigError> {
        let file = read_settings(cli.config.as_deref())?;
        Self::merge(cli, file)
    }

    fn merge(cli: &DevServerCliArgs, file: SettingsFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_page_size = cli
            .max_page_size
            .or(file.board.max_page_size)
            .unwrap_or(defaults.max_page_size);
        if max_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }

        Ok(Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            seed: !cli.empty && file.board.seed.unwrap_or(defaults.seed),
            max_page_size,
            log_level: cli.log_level.clone(),
        })
    }
}

fn read_settings(explicit: Option<&Path>) -> Result<SettingsFile, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match dirs::config_dir() {
            Some(dir) => (dir.join(SETTINGS_FILE), false),
            None => return Ok(SettingsFile::default()),
        },
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SettingsFile::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
