//! Configuration for termdraw.
//!
//! Settings are read from `~/.termdraw/config.toml`. Every key is optional:
//!
//! ```toml
//! # Glyph drawn for every opaque pixel
//! glyph = "*"
//!
//! # Time between frames, in milliseconds
//! interval_ms = 200
//!
//! # Draw to the terminal (false keeps the animation clock running silently)
//! display = true
//!
//! # "esc" for keys only, "mouse" to also report mouse events
//! input_mode = "esc"
//!
//! [log]
//! level = "info"
//! file = "/tmp/termdraw.log"
//! ```
//!
//! Command-line flags override values from the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::InputMode;
use crate::error::ConfigError;

const CONFIG_DIR: &str = ".termdraw";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub glyph: char,
    pub interval_ms: u64,
    pub display: bool,
    pub input_mode: InputMode,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            glyph: '*',
            interval_ms: 200,
            display: true,
            input_mode: InputMode::Esc,
            log: LogConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "termdraw=debug"
    pub level: String,
    /// Log file; defaults to `~/.termdraw/termdraw.log`
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load `~/.termdraw/config.toml`, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let (config, err) = Self::load_or_default(&path);
        if let Some(e) = err {
            warn!("{}; using defaults", e);
        }
        config
    }

    /// Load `path` if it exists.
    ///
    /// A missing file gives defaults and no error. An unreadable or invalid
    /// file gives defaults plus the error, so the caller can report it once
    /// logging is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Log file path, explicit or default
    pub fn log_path(&self) -> PathBuf {
        self.log.file.clone().unwrap_or_else(|| {
            config_dir()
                .map(|dir| dir.join("termdraw.log"))
                .unwrap_or_else(|| PathBuf::from("termdraw.log"))
        })
    }

    /// `~/.termdraw/config.toml`, if a home directory is known
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_DIR))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r##"
            glyph = "#"
            input_mode = "mouse"

            [log]
            level = "debug"
            "##,
        )
        .unwrap();

        assert_eq!(config.glyph, '#');
        assert_eq!(config.input_mode, InputMode::Mouse);
        assert_eq!(config.interval_ms, 200);
        assert!(config.display);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval_ms = 50\ndisplay = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.interval(), Duration::from_millis(50));
        assert!(!config.display);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load_from(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "input_mode = \"joystick\"").unwrap();
        assert!(matches!(Config::load_from(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_or_default_keeps_error() {
        let dir = tempfile::tempdir().unwrap();

        let (config, err) = Config::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
        assert!(err.is_none());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "interval_ms = \"soon\"").unwrap();
        let (config, err) = Config::load_or_default(&bad);
        assert_eq!(config, Config::default());
        assert!(matches!(err, Some(ConfigError::Parse { .. })));

        let good = dir.path().join("good.toml");
        fs::write(&good, "glyph = \"@\"").unwrap();
        let (config, err) = Config::load_or_default(&good);
        assert_eq!(config.glyph, '@');
        assert!(err.is_none());
    }

    #[test]
    fn test_explicit_log_path() {
        let mut config = Config::default();
        config.log.file = Some(PathBuf::from("/tmp/x.log"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/x.log"));
    }
}
