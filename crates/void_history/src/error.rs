//! Errors surfaced by history persistence and configuration.

use thiserror::Error;
use void_scene::SceneError;

use crate::commands::CommandError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
