//! Orchestration entry points.
//!
//! [`Editor`] owns the scene graph and its history and is what UI and menu
//! code calls into: execute, undo, redo, clear, and persistence.

use std::path::{Path, PathBuf};

use void_scene::SceneGraph;

use super::config::HistoryConfig;
use super::history::{EntrySummary, History, HistoryEvent, MergeHint, SubscriberId};
use crate::codec::{CommandRegistry, LoadReport, ProjectFile};
use crate::commands::{Command, CommandError, CommandResult};
use crate::error::Result;

/// Scene graph, history and command registry of one editing session.
pub struct Editor {
    scene: SceneGraph,
    history: History,
    registry: CommandRegistry,
    /// File the project was last saved to or loaded from
    project_path: Option<PathBuf>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl Editor {
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_scene(SceneGraph::new(), config)
    }

    pub fn with_scene(scene: SceneGraph, config: HistoryConfig) -> Self {
        Self {
            scene,
            history: History::with_config(config),
            registry: CommandRegistry::with_builtin(),
            project_path: None,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Direct access to the graph. Changes made here are not recorded.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Register additional command kinds for deserialization.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Execute a command and add it to history.
    pub fn execute(&mut self, cmd: Box<dyn Command>) -> CommandResult {
        self.execute_with(cmd, MergeHint::Auto)
    }

    pub fn execute_with(&mut self, mut cmd: Box<dyn Command>, hint: MergeHint) -> CommandResult {
        cmd.execute(&mut self.scene)?;
        self.history.push_with(cmd, None, hint);
        Ok(())
    }

    /// Execute a command under a custom history panel name.
    pub fn execute_named(&mut self, mut cmd: Box<dyn Command>, name: impl Into<String>) -> CommandResult {
        cmd.execute(&mut self.scene)?;
        self.history.push_named(cmd, name);
        Ok(())
    }

    /// Undo the last command. `Ok(None)` means there was nothing to undo.
    pub fn undo(&mut self) -> std::result::Result<Option<EntrySummary>, CommandError> {
        self.history.undo(&mut self.scene)
    }

    /// Redo the last undone command.
    pub fn redo(&mut self) -> std::result::Result<Option<EntrySummary>, CommandError> {
        self.history.redo(&mut self.scene)
    }

    pub fn go_to(&mut self, id: Option<u64>) -> CommandResult {
        self.history.go_to(&mut self.scene, id)
    }

    /// Signal the end of a drag, slider move or other continuous input.
    pub fn end_gesture(&mut self) {
        self.history.end_gesture();
    }

    pub fn begin_transaction(&mut self, name: impl Into<String>) {
        self.history.begin_transaction(name);
    }

    pub fn commit_transaction(&mut self) -> Option<EntrySummary> {
        self.history.commit_transaction()
    }

    pub fn rollback_transaction(&mut self) -> CommandResult {
        self.history.rollback_transaction(&mut self.scene)
    }

    /// Empty the history; the scene is left as it is.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Start over with an empty scene and history.
    pub fn new_scene(&mut self) {
        self.scene.clear();
        self.history.clear();
        self.project_path = None;
    }

    pub fn undo_entries(&self) -> Vec<EntrySummary> {
        self.history.undo_entries()
    }

    pub fn redo_entries(&self) -> Vec<EntrySummary> {
        self.history.redo_entries()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&HistoryEvent) + Send + Sync + 'static,
    {
        self.history.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.history.unsubscribe(id)
    }

    /// Serialize the undo stack as a JSON array.
    pub fn serialize_history(&self) -> Result<String> {
        let records = self.history.serialize()?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Replace the history with a JSON array produced by
    /// [`serialize_history`](Self::serialize_history).
    ///
    /// The current scene must already reflect those commands. Only a
    /// document that is not a JSON array is an error; bad entries are
    /// dropped and listed in the report.
    pub fn deserialize_history(&mut self, data: &str) -> Result<LoadReport> {
        let records: Vec<serde_json::Value> = serde_json::from_str(data)?;
        Ok(self.history.load(&records, &self.scene, &self.registry))
    }

    /// Write the scene and, if configured, the history to a project file.
    pub fn save_project(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let history = if self.history.config().persist {
            self.history
                .serialize()?
                .into_iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        ProjectFile::new(self.scene.to_data(), history).save(path)?;
        self.history.mark_saved();
        self.project_path = Some(path.to_path_buf());
        log::info!("Saved project to {:?}", path);
        Ok(())
    }

    /// Load a project: the scene is rebuilt first, then the history is
    /// decoded against the finished graph.
    pub fn load_project(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let project = ProjectFile::load(path)?;
        let scene = SceneGraph::from_data(&project.scene)?;

        self.scene.clear();
        self.scene = scene;
        let report = self.history.load(&project.history, &self.scene, &self.registry);
        self.project_path = Some(path.to_path_buf());
        log::info!("Loaded project from {:?} ({} objects)", path, self.scene.len());
        Ok(report)
    }
}
