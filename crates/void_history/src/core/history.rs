//! Undo/Redo history with command coalescing and transaction support.
//!
//! Commands are pushed after they have been executed once. Consecutive
//! updatable edits of the same kind, target and attribute merge into the
//! entry on top of the undo stack until a gesture boundary is signalled
//! with [`History::end_gesture`]. Commands pushed while a transaction is
//! open are grouped into a single [`MultiCmds`] entry.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use void_scene::{IdentityResolver, SceneGraph};

use super::config::HistoryConfig;
use crate::codec::{self, CommandRegistry, LoadReport, SerializedCommand};
use crate::commands::{Command, CommandError, CommandResult, MultiCmds};

/// A group of commands executed as a single undoable unit.
pub struct Transaction {
    pub name: String,
    pub commands: Vec<Box<dyn Command>>,
}

impl Transaction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.commands.push(cmd);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// How a push interacts with the entry on top of the undo stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeHint {
    /// Merge when the coalescing rules allow it
    #[default]
    Auto,
    /// Always start a new entry
    Separate,
}

/// Read-only view of a history entry for the history panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: u64,
    pub display_name: String,
}

/// Change notification delivered synchronously to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEvent {
    Pushed(EntrySummary),
    Merged(EntrySummary),
    Undone(EntrySummary),
    Redone(EntrySummary),
    Cleared,
    Loaded { count: usize },
    /// Oldest entries evicted by the size cap
    Trimmed { dropped: Vec<u64> },
}

/// Unique identifier for a history subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Handler = Box<dyn Fn(&HistoryEvent) + Send + Sync>;

/// An executed command with its position in the timeline.
pub struct HistoryEntry {
    pub id: u64,
    pub name: String,
    command: Box<dyn Command>,
    pushed_at: Instant,
}

impl HistoryEntry {
    pub fn command(&self) -> &dyn Command {
        self.command.as_ref()
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            display_name: self.name.clone(),
        }
    }
}

/// Linear undo/redo timeline.
pub struct History {
    /// Executed entries, oldest first
    undo_stack: VecDeque<HistoryEntry>,
    /// Undone entries; the last one is redone next
    redo_stack: Vec<HistoryEntry>,
    config: HistoryConfig,
    /// Last sequence id handed out
    next_id: u64,
    /// Entry still open for merging, cleared at gesture boundaries
    coalescing: Option<u64>,
    /// Current open transaction
    current_transaction: Option<Transaction>,
    enabled: bool,
    /// Whether history has been modified since last save
    dirty: bool,
    subscribers: Vec<(SubscriberId, Handler)>,
    next_subscriber: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            config,
            next_id: 0,
            coalescing: None,
            current_transaction: None,
            enabled: true,
            dirty: false,
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Replace the configuration; a smaller cap applies immediately.
    pub fn set_config(&mut self, config: HistoryConfig) {
        self.config = config;
        let dropped = self.enforce_cap();
        if !dropped.is_empty() {
            self.emit(HistoryEvent::Trimmed { dropped });
        }
    }

    /// Check if there are commands to undo.
    pub fn can_undo(&self) -> bool {
        self.enabled && !self.undo_stack.is_empty()
    }

    /// Check if there are commands to redo.
    pub fn can_redo(&self) -> bool {
        self.enabled && !self.redo_stack.is_empty()
    }

    /// Get the description of the next undo command.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.name.as_str())
    }

    /// Get the description of the next redo command.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.name.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> Vec<EntrySummary> {
        self.undo_stack.iter().map(HistoryEntry::summary).collect()
    }

    /// Redo entries in stack order; the last one is redone next.
    pub fn redo_entries(&self) -> Vec<EntrySummary> {
        self.redo_stack.iter().map(HistoryEntry::summary).collect()
    }

    /// Entry that the next undo would revert.
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark as saved (clears dirty flag).
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Suspend or resume undo/redo. Pushes are still recorded.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Signal the end of a continuous gesture.
    ///
    /// The next push starts a fresh entry even if it would otherwise merge.
    pub fn end_gesture(&mut self) {
        if self.coalescing.take().is_some() {
            log::trace!("Gesture ended");
        }
    }

    /// Register a handler called after every history change.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&HistoryEvent) + Send + Sync + 'static,
    {
        self.next_subscriber += 1;
        let id = SubscriberId(self.next_subscriber);
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn emit(&self, event: HistoryEvent) {
        for (_, handler) in &self.subscribers {
            handler(&event);
        }
    }

    /// Begin a new transaction.
    /// Commands pushed during a transaction are grouped as one undo unit.
    pub fn begin_transaction(&mut self, name: impl Into<String>) {
        if let Some(open) = &self.current_transaction {
            log::warn!("Transaction '{}' already open, nesting into it", open.name);
            return;
        }
        self.current_transaction = Some(Transaction::new(name));
    }

    /// Commit the current transaction as a single entry.
    pub fn commit_transaction(&mut self) -> Option<EntrySummary> {
        let transaction = self.current_transaction.take()?;
        if transaction.is_empty() {
            return None;
        }
        let name = transaction.name.clone();
        let group = MultiCmds::new(transaction.name, transaction.commands);
        self.push_with(Box::new(group), Some(name), MergeHint::Separate);
        self.undo_stack.back().map(HistoryEntry::summary)
    }

    /// Revert every command pushed in the open transaction and discard it.
    ///
    /// A member that fails to revert does not stop the others; the first
    /// failure is returned once every member has been tried.
    pub fn rollback_transaction(&mut self, scene: &mut SceneGraph) -> CommandResult {
        let Some(mut transaction) = self.current_transaction.take() else {
            return Ok(());
        };
        let mut first_error = None;
        for cmd in transaction.commands.iter_mut().rev() {
            if let Err(e) = cmd.undo(scene) {
                log::warn!("Failed to roll back '{}': {}", cmd.description(), e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Check if a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.current_transaction.is_some()
    }

    /// Push a command that has already been executed.
    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.push_with(cmd, None, MergeHint::Auto);
    }

    /// Push with a display name other than the command's description.
    pub fn push_named(&mut self, cmd: Box<dyn Command>, name: impl Into<String>) {
        self.push_with(cmd, Some(name.into()), MergeHint::Auto);
    }

    pub fn push_with(&mut self, cmd: Box<dyn Command>, name: Option<String>, hint: MergeHint) {
        if let Some(transaction) = self.current_transaction.as_mut() {
            transaction.push(cmd);
            return;
        }

        let now = Instant::now();
        self.redo_stack.clear();
        self.dirty = true;

        if hint == MergeHint::Auto {
            if let Some(merged) = self.try_merge(cmd.as_ref(), now) {
                log::debug!("Merged into #{} {}", merged.id, merged.display_name);
                self.emit(HistoryEvent::Merged(merged));
                return;
            }
        }

        let id = self.allocate_id();
        let entry = HistoryEntry {
            id,
            name: name.unwrap_or_else(|| cmd.description()),
            command: cmd,
            pushed_at: now,
        };
        self.coalescing = entry.command.updatable().then_some(entry.id);
        let summary = entry.summary();
        log::debug!("Pushed #{} {}", summary.id, summary.display_name);
        self.undo_stack.push_back(entry);
        let dropped = self.enforce_cap();
        self.emit(HistoryEvent::Pushed(summary));
        if !dropped.is_empty() {
            self.emit(HistoryEvent::Trimmed { dropped });
        }
    }

    fn try_merge(&mut self, cmd: &dyn Command, now: Instant) -> Option<EntrySummary> {
        let open = self.coalescing?;
        let window = self.config.coalesce_window();
        let top = self.undo_stack.back_mut()?;
        if top.id != open || !cmd.updatable() || !top.command.updatable() {
            return None;
        }
        if let Some(window) = window {
            if now.duration_since(top.pushed_at) > window {
                return None;
            }
        }
        if top.command.kind() != cmd.kind()
            || top.command.target() != cmd.target()
            || top.command.attribute() != cmd.attribute()
        {
            return None;
        }
        if !top.command.merge(cmd) {
            return None;
        }
        top.pushed_at = now;
        Some(top.summary())
    }

    /// Next sequence id. When the id space runs out, live entries are
    /// renumbered from 1 so ids keep increasing along the timeline.
    fn allocate_id(&mut self) -> u64 {
        if self.next_id == u64::MAX {
            self.renumber();
        }
        self.next_id += 1;
        self.next_id
    }

    /// Reassign ids `1..` in timeline order: undo stack oldest first, then
    /// redo entries in the order they would be redone.
    fn renumber(&mut self) {
        log::warn!("History ids exhausted, renumbering {} entries", self.undo_stack.len() + self.redo_stack.len());
        let entries = self
            .undo_stack
            .iter_mut()
            .chain(self.redo_stack.iter_mut().rev());
        let mut last = 0;
        for (id, entry) in (1u64..).zip(entries) {
            entry.id = id;
            last = id;
        }
        self.next_id = last;
        self.coalescing = None;
    }

    /// Drop the oldest entries beyond the cap, returning their ids.
    fn enforce_cap(&mut self) -> Vec<u64> {
        let mut dropped = Vec::new();
        let Some(cap) = self.config.cap() else {
            return dropped;
        };
        while self.undo_stack.len() > cap {
            if let Some(entry) = self.undo_stack.pop_front() {
                log::warn!("History full ({} entries), dropping #{} {}", cap, entry.id, entry.name);
                dropped.push(entry.id);
            }
        }
        dropped
    }

    /// Revert the newest entry.
    ///
    /// Returns `Ok(None)` when there is nothing to undo or history is
    /// suspended. A failed undo leaves the entry on the undo stack.
    pub fn undo(&mut self, scene: &mut SceneGraph) -> Result<Option<EntrySummary>, CommandError> {
        if !self.enabled {
            log::debug!("History suspended, ignoring undo");
            return Ok(None);
        }
        if self.in_transaction() {
            return Err(CommandError::InvalidOperation(
                "cannot undo while a transaction is open".to_string(),
            ));
        }
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        self.coalescing = None;

        match entry.command.undo(scene) {
            Ok(()) => {
                let summary = entry.summary();
                log::debug!("Undo: {}", summary.display_name);
                self.redo_stack.push(entry);
                self.dirty = true;
                self.emit(HistoryEvent::Undone(summary.clone()));
                Ok(Some(summary))
            }
            Err(e) => {
                log::warn!("Undo of '{}' failed: {}", entry.name, e);
                self.undo_stack.push_back(entry);
                Err(e)
            }
        }
    }

    /// Re-apply the most recently undone entry.
    pub fn redo(&mut self, scene: &mut SceneGraph) -> Result<Option<EntrySummary>, CommandError> {
        if !self.enabled {
            log::debug!("History suspended, ignoring redo");
            return Ok(None);
        }
        if self.in_transaction() {
            return Err(CommandError::InvalidOperation(
                "cannot redo while a transaction is open".to_string(),
            ));
        }
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        self.coalescing = None;

        match entry.command.execute(scene) {
            Ok(()) => {
                let summary = entry.summary();
                log::debug!("Redo: {}", summary.display_name);
                self.undo_stack.push_back(entry);
                self.dirty = true;
                self.emit(HistoryEvent::Redone(summary.clone()));
                Ok(Some(summary))
            }
            Err(e) => {
                log::warn!("Redo of '{}' failed: {}", entry.name, e);
                self.redo_stack.push(entry);
                Err(e)
            }
        }
    }

    /// Undo or redo until entry `id` is the newest applied one.
    ///
    /// `None` undoes everything.
    pub fn go_to(&mut self, scene: &mut SceneGraph, id: Option<u64>) -> CommandResult {
        if !self.enabled {
            return Ok(());
        }
        match id {
            None => {
                while self.undo(scene)?.is_some() {}
            }
            Some(id) if self.undo_stack.iter().any(|e| e.id == id) => {
                while self.undo_stack.back().map(|e| e.id) != Some(id) {
                    if self.undo(scene)?.is_none() {
                        break;
                    }
                }
            }
            Some(id) if self.redo_stack.iter().any(|e| e.id == id) => {
                while self.undo_stack.back().map(|e| e.id) != Some(id) {
                    if self.redo(scene)?.is_none() {
                        break;
                    }
                }
            }
            Some(id) => {
                return Err(CommandError::InvalidOperation(format!("no history entry #{}", id)));
            }
        }
        Ok(())
    }

    /// Empty both stacks without reverting anything.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_transaction = None;
        self.coalescing = None;
        self.next_id = 0;
        self.dirty = false;
        log::debug!("History cleared");
        self.emit(HistoryEvent::Cleared);
    }

    /// Records for the undo stack, oldest first. Redo entries are not kept.
    pub fn serialize(&self) -> Result<Vec<SerializedCommand>, CommandError> {
        self.undo_stack
            .iter()
            .map(|e| SerializedCommand::from_command(e.id, &e.name, e.command.as_ref()))
            .collect()
    }

    /// Replace the history with persisted records.
    ///
    /// The scene must already reflect every record; commands are resolved
    /// against it but not executed. Bad records are dropped and reported.
    pub fn load(
        &mut self,
        records: &[Value],
        resolver: &dyn IdentityResolver,
        registry: &CommandRegistry,
    ) -> LoadReport {
        let (decoded, report) = codec::decode_history(records, resolver, registry);

        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_transaction = None;
        self.coalescing = None;
        self.next_id = 0;

        // Persisted ids are kept only when they are usable as a sequence
        let keep_ids = decoded.first().map_or(true, |e| e.id > 0)
            && decoded.windows(2).all(|pair| pair[0].id < pair[1].id);
        if !keep_ids {
            log::warn!("History ids are missing or out of order, renumbering");
        }

        let now = Instant::now();
        for (position, entry) in (1u64..).zip(decoded) {
            let id = if keep_ids { entry.id } else { position };
            self.next_id = id;
            self.undo_stack.push_back(HistoryEntry {
                id,
                name: entry.name,
                command: entry.command,
                pushed_at: now,
            });
        }
        self.enforce_cap();
        self.dirty = false;

        log::info!(
            "Loaded {} history entries ({} dropped)",
            report.loaded,
            report.warnings.len()
        );
        self.emit(HistoryEvent::Loaded { count: self.undo_stack.len() });
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddObjectCommand, SetPropertyValueCommand, SetTransformCommand};
    use void_scene::{LightKind, ObjectId, SceneObject};

    fn scene() -> (SceneGraph, ObjectId) {
        let mut scene = SceneGraph::new();
        let id = scene.add(SceneObject::light("Lamp", LightKind::Point), None).unwrap();
        (scene, id)
    }

    fn intensity(scene: &mut SceneGraph, id: ObjectId, value: f64) -> Box<dyn Command> {
        let mut cmd = SetPropertyValueCommand::new(scene, id, "intensity", value).unwrap();
        cmd.execute(scene).unwrap();
        Box::new(cmd)
    }

    fn move_to(scene: &mut SceneGraph, id: ObjectId, x: f32) -> Box<dyn Command> {
        let mut cmd = SetTransformCommand::position(scene, id, [x, 0.0, 0.0]).unwrap();
        cmd.execute(scene).unwrap();
        Box::new(cmd)
    }

    #[test]
    fn test_history_basic() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.push(move_to(&mut scene, id, 1.0));

        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Set Position"));
        assert!(history.is_dirty());
    }

    #[test]
    fn test_history_undo_redo() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.push(move_to(&mut scene, id, 1.0));
        history.end_gesture();
        history.push(move_to(&mut scene, id, 2.0));
        assert_eq!(history.undo_count(), 2);

        assert_eq!(history.redo_description(), None);
        history.undo(&mut scene).unwrap();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.redo_count(), 1);
        assert_eq!(history.redo_description(), Some("Set Position"));
        assert_eq!(scene.get(id).unwrap().transform.position[0], 1.0);

        history.redo(&mut scene).unwrap();
        assert_eq!(history.undo_count(), 2);
        assert_eq!(history.redo_count(), 0);
        assert_eq!(scene.get(id).unwrap().transform.position[0], 2.0);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let (mut scene, _) = scene();
        let mut history = History::new();
        assert_eq!(history.undo(&mut scene), Ok(None));
        assert_eq!(history.redo(&mut scene), Ok(None));
    }

    #[test]
    fn test_different_attribute_starts_new_entry() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.push(intensity(&mut scene, id, 2.0));
        history.push(move_to(&mut scene, id, 1.0));
        history.push(intensity(&mut scene, id, 3.0));
        assert_eq!(history.undo_count(), 3);
    }

    #[test]
    fn test_separate_hint_never_merges() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.push(intensity(&mut scene, id, 2.0));
        history.push_with(intensity(&mut scene, id, 3.0), None, MergeHint::Separate);
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let (mut scene, id) = scene();
        let mut history = History::with_config(HistoryConfig::default().with_max_entries(3));

        for i in 0..5 {
            history.push(move_to(&mut scene, id, i as f32));
            history.end_gesture();
        }
        let ids: Vec<u64> = history.undo_entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_suspended_history_ignores_undo() {
        let (mut scene, id) = scene();
        let mut history = History::new();
        history.push(move_to(&mut scene, id, 1.0));

        history.set_enabled(false);
        assert!(!history.can_undo());
        assert_eq!(history.undo(&mut scene), Ok(None));
        assert_eq!(history.undo_count(), 1);

        history.set_enabled(true);
        assert!(history.undo(&mut scene).unwrap().is_some());
    }

    #[test]
    fn test_transaction_commits_one_entry() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.begin_transaction("Tweak Lamp");
        history.push(intensity(&mut scene, id, 5.0));
        history.push(move_to(&mut scene, id, 4.0));
        assert!(history.undo(&mut scene).is_err());
        let summary = history.commit_transaction().unwrap();

        assert_eq!(summary.display_name, "Tweak Lamp");
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.last_entry().unwrap().command().kind(), "MultiCmds");

        history.undo(&mut scene).unwrap();
        let lamp = scene.get(id).unwrap();
        assert_eq!(lamp.transform.position, [0.0, 0.0, 0.0]);
        assert_eq!(lamp.property("intensity").unwrap().and_then(|v| v.as_f64()), Some(1.0));
    }

    #[test]
    fn test_transaction_rollback() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.begin_transaction("Discarded");
        history.push(move_to(&mut scene, id, 9.0));
        history.rollback_transaction(&mut scene).unwrap();

        assert!(!history.in_transaction());
        assert_eq!(history.undo_count(), 0);
        assert_eq!(scene.get(id).unwrap().transform.position[0], 0.0);
        assert_eq!(history.commit_transaction(), None);
    }

    #[test]
    fn test_rollback_continues_past_failing_member() {
        let (mut scene, id) = scene();
        let mut history = History::new();

        history.begin_transaction("Build");
        history.push(move_to(&mut scene, id, 5.0));
        let helper = SceneObject::group("Helper");
        let helper_id = helper.id;
        let mut add = AddObjectCommand::new(&scene, helper, None).unwrap();
        add.execute(&mut scene).unwrap();
        history.push(Box::new(add));

        scene.remove(helper_id).unwrap();
        let result = history.rollback_transaction(&mut scene);

        assert!(result.is_err());
        assert!(!history.in_transaction());
        assert_eq!(scene.get(id).unwrap().transform.position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clear_resets_ids() {
        let (mut scene, id) = scene();
        let mut history = History::new();
        history.push(move_to(&mut scene, id, 1.0));
        history.clear();

        assert_eq!(history.undo_count(), 0);
        history.push(move_to(&mut scene, id, 2.0));
        assert_eq!(history.undo_entries()[0].id, 1);
        // Clearing never touches the scene
        assert_eq!(scene.get(id).unwrap().transform.position[0], 2.0);
    }
}
