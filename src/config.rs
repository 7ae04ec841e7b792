use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Configuration loaded from `devloop.toml` at the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevLoopConfig {
    /// Quiet window, in milliseconds, before a drained set of raw events is
    /// classified and delivered as one batch.
    pub debounce_ms: u64,
    /// Scan period for the polling watch backend.
    pub poll_interval_ms: u64,
    /// Select the polling backend even on platforms with a native one.
    pub force_polling: bool,
    /// Path substrings the watcher ignores (e.g. "target/", ".git/").
    pub exclude: Vec<String>,
}

impl Default for DevLoopConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            poll_interval_ms: 1000,
            force_polling: false,
            exclude: Vec::new(),
        }
    }
}

impl DevLoopConfig {
    /// Load configuration from `devloop.toml` in the given root directory.
    ///
    /// Returns the default configuration if the file does not exist or cannot
    /// be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("devloop.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse devloop.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read devloop.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = DevLoopConfig::load(dir.path());
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(!config.force_polling);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_defaults_when_file_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("devloop.toml"), "debounce_ms = [not toml").unwrap();
        let config = DevLoopConfig::load(dir.path());
        assert_eq!(
            config.debounce_ms, 100,
            "malformed file should fall back to defaults"
        );
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("devloop.toml"),
            "debounce_ms = 50\nexclude = [\"target/\"]\n",
        )
        .unwrap();
        let config = DevLoopConfig::load(dir.path());
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.exclude, vec!["target/".to_string()]);
        assert_eq!(
            config.poll_interval_ms, 1000,
            "unset fields keep their defaults"
        );
    }
}
