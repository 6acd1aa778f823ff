//! Configuration for the terminal engine and its shell session

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Rgb;

/// Engine and session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Screen and cell geometry
    pub geometry: GeometryConfig,
    /// Quiescent delay before a coalesced scroll is reconciled
    pub scroll_flush_delay_ms: u64,
    /// Cursor overlay
    pub cursor_highlight: HighlightConfig,
    /// Monospace font file; a system font is searched for when unset
    pub font_path: Option<PathBuf>,
    /// Shell spawned by the relay
    pub shell: ShellConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            scroll_flush_delay_ms: 100,
            cursor_highlight: HighlightConfig::default(),
            font_path: None,
            shell: ShellConfig::default(),
        }
    }
}

/// Screen size in cells and cell size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub cols: usize,
    pub rows: usize,
    pub char_width: usize,
    pub char_height: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            char_width: 12,
            char_height: 22,
        }
    }
}

/// Translucent cursor highlight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub color: Rgb,
    /// Opacity (0.0 - 1.0)
    pub alpha: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            alpha: 0.25,
        }
    }
}

/// Login shell and its fixed environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let env = [("TERM", "xterm-256color"), ("LANG", "C")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            program: "/bin/bash".to_string(),
            args: vec!["-l".to_string()],
            env,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        if let Some(path) = default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring config file")
                    }
                }
            }
        }
        Self::default()
    }

    pub fn scroll_flush_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_flush_delay_ms)
    }
}

/// `~/.config/mochi-webterm/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("mochi-webterm")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
