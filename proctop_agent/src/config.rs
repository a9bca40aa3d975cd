//! Agent configuration: defaults, then an optional JSON file, then environment.
//! Stored under XDG config dir: $XDG_CONFIG_HOME/proctop/config.json (fallback ~/.config/proctop/config.json)

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

use crate::error::ConfigError;
use crate::reader::{DEFAULT_OS_RELEASE, DEFAULT_PROC_ROOT};

pub const ENV_PROC_ROOT: &str = "PROCTOP_PROC_ROOT";
pub const ENV_OS_RELEASE: &str = "PROCTOP_OS_RELEASE";
pub const ENV_INTERVAL_MS: &str = "PROCTOP_INTERVAL_MS";
pub const ENV_TOP: &str = "PROCTOP_TOP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
    /// Refresh period.
    pub interval_ms: u64,
    /// Only report the first N processes of the ordered list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            os_release: PathBuf::from(DEFAULT_OS_RELEASE),
            interval_ms: 1_000,
            top: None,
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("proctop")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctop")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl AgentConfig {
    /// Defaults overlaid with the config file (if any) and `PROCTOP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_file(&config_path())?.unwrap_or_default();
        cfg.apply_vars(std::env::vars());
        Ok(cfg)
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Applies recognised `PROCTOP_*` pairs; unparsable numbers are ignored.
    pub fn apply_vars<I: IntoIterator<Item = (String, String)>>(&mut self, vars: I) {
        for (key, value) in vars {
            match key.as_str() {
                ENV_PROC_ROOT if !value.is_empty() => self.proc_root = PathBuf::from(value),
                ENV_OS_RELEASE if !value.is_empty() => self.os_release = PathBuf::from(value),
                ENV_INTERVAL_MS => match value.parse() {
                    Ok(ms) => self.interval_ms = ms,
                    Err(_) => warn!("ignoring {ENV_INTERVAL_MS}={value}: not a number"),
                },
                ENV_TOP => match value.parse() {
                    Ok(0) => self.top = None,
                    Ok(k) => self.top = Some(k),
                    Err(_) => warn!("ignoring {ENV_TOP}={value}: not a number"),
                },
                _ => {}
            }
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}
