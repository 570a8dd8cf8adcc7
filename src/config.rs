//! User settings, read from `config.json` in the platform config directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    constants::{RECENT_SESSIONS_LIMIT, TIME_SETTINGS},
    storage,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the record, backups and logs.
    pub data_dir: Option<PathBuf>,
    /// How many sessions the recent feed shows.
    pub recent_limit: usize,
    /// Refresh period of the terminal UI while a session runs.
    pub tick_ms: u64,
    /// Log filter level, e.g. `info` or `debug`.
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            recent_limit: RECENT_SESSIONS_LIMIT,
            tick_ms: TIME_SETTINGS.tick_ms,
            log_level: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unusable.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_default() -> Self {
        Self::load(&storage::default_config_path())
    }

    /// Resolve the data directory: explicit override, then config, then the
    /// platform default.
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(storage::default_data_dir)
    }

    fn normalized(mut self) -> Self {
        if self.tick_ms == 0 {
            self.tick_ms = TIME_SETTINGS.tick_ms;
        }
        self
    }
}
