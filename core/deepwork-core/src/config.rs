//! Runtime configuration loading.
//!
//! `config.toml` under the data root is optional. Missing keys take their
//! defaults; a missing file is the all-defaults config.

use std::path::Path;
use std::time::Duration;

use fs_err as fs;
use serde::Deserialize;

use crate::error::{DeepWorkError, Result};
use crate::storage::StorageConfig;
use crate::types::MusicChoice;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const MIN_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeepWorkConfig {
    /// How often a running countdown is re-evaluated against the wall clock.
    pub poll_interval_ms: u64,
    /// Music choice used when `start` is given none.
    pub default_music: MusicChoice,
}

impl Default for DeepWorkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_music: MusicChoice::None,
        }
    }
}

impl DeepWorkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Loads `config.toml` from the data root.
pub fn load_config(storage: &StorageConfig) -> Result<DeepWorkConfig> {
    load_config_from(&storage.config_file())
}

pub fn load_config_from(path: &Path) -> Result<DeepWorkConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DeepWorkConfig::default())
        }
        Err(source) => {
            return Err(DeepWorkError::Io {
                context: format!("reading {}", path.display()),
                source,
            })
        }
    };

    toml::from_str(&content).map_err(|err| DeepWorkError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
