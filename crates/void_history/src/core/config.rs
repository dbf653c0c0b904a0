//! History configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the undo/redo engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum undo entries kept; the oldest are dropped first. 0 keeps all.
    pub max_entries: usize,
    /// Edits only merge when they arrive within this many milliseconds
    /// of the previous one. Unset means only gesture boundaries split.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coalesce_window_ms: Option<u64>,
    /// Whether project files include the history.
    pub persist: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::DEFAULT_MAX_ENTRIES,
            coalesce_window_ms: None,
            persist: true,
        }
    }
}

impl HistoryConfig {
    /// Default maximum history size.
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    /// A configuration that never drops entries.
    pub fn unbounded() -> Self {
        Self {
            max_entries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window_ms = Some(u64::try_from(window.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn cap(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }

    pub fn coalesce_window(&self) -> Option<Duration> {
        self.coalesce_window_ms.map(Duration::from_millis)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&content)?;
        log::info!("Loaded history config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        log::info!("Saved history config to {:?}", path);
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("void_editor");
            p.push("history.toml");
            p
        })
    }
}
