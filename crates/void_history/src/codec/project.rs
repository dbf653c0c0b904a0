//! Project files: a scene document plus its persisted history.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use void_scene::SceneData;

use crate::error::Result;

/// Current project file format version.
pub const PROJECT_VERSION: &str = "1.0.0";

fn default_version() -> String {
    PROJECT_VERSION.to_string()
}

/// On-disk project layout.
///
/// History records stay as raw JSON values so a corrupted entry only
/// drops that entry when the history is decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub scene: SceneData,
    #[serde(default)]
    pub history: Vec<Value>,
}

impl ProjectFile {
    pub fn new(scene: SceneData, history: Vec<Value>) -> Self {
        Self {
            version: default_version(),
            scene,
            history,
        }
    }

    /// Read a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let project: ProjectFile = serde_json::from_str(&content)?;
        if project.version != PROJECT_VERSION {
            log::warn!(
                "Project {:?} has version {}, expected {}",
                path.as_ref(),
                project.version,
                PROJECT_VERSION
            );
        }
        Ok(project)
    }

    /// Write the project as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
