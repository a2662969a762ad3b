//! Storage configuration and path management for DeepWork.
//!
//! All file paths for DeepWork data are decided here. Production code uses
//! `StorageConfig::default()`; tests use `StorageConfig::with_root(temp_dir)`
//! so every document lands in an isolated directory.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data root.
pub const DEEPWORK_HOME_ENV: &str = "DEEPWORK_HOME";

/// Central configuration for all DeepWork storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all DeepWork data (default: ~/.deepwork)
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        if let Some(root) = std::env::var_os(DEEPWORK_HOME_ENV).filter(|v| !v.is_empty()) {
            return Self {
                root: PathBuf::from(root),
            };
        }
        let root = dirs::home_dir()
            .map(|home| home.join(".deepwork"))
            .unwrap_or_else(|| PathBuf::from(".deepwork"));
        Self { root }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to sessions.json (completed sessions keyed by day).
    pub fn sessions_file(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    /// Path to settings.json (activities and duration presets).
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Runtime
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to config.toml (runtime preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ directory (rolling log files).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/deepwork-test"));
        assert_eq!(
            storage.sessions_file(),
            PathBuf::from("/tmp/deepwork-test/sessions.json")
        );
        assert_eq!(
            storage.settings_file(),
            PathBuf::from("/tmp/deepwork-test/settings.json")
        );
        assert_eq!(
            storage.config_file(),
            PathBuf::from("/tmp/deepwork-test/config.toml")
        );
        assert_eq!(storage.logs_dir(), PathBuf::from("/tmp/deepwork-test/logs"));
    }
}
