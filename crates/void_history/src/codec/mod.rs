//! History persistence.
//!
//! A history is stored as an ordered JSON array of [`SerializedCommand`]
//! records, oldest first. Loading is tolerant: a record that cannot be
//! parsed, decoded or resolved is dropped with a [`LoadWarning`] and the
//! rest of the history still loads.

mod project;
mod record;
mod registry;

pub use project::{ProjectFile, PROJECT_VERSION};
pub use record::SerializedCommand;
pub use registry::{CommandRegistry, DecodeFn};

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use void_scene::{IdentityResolver, ObjectId, ObjectNode, SceneObject};

use crate::commands::{Command, CommandError};

/// A record dropped while loading a history.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadWarning {
    /// Position of the record in the persisted array
    pub index: usize,
    /// Sequence id of the record, if it could be read
    pub id: Option<u64>,
    /// Kind tag of the record, if it could be read
    pub kind: Option<String>,
    pub error: CommandError,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {}", self.index)?;
        if let Some(kind) = &self.kind {
            write!(f, " ({})", kind)?;
        }
        write!(f, " dropped: {}", self.error)
    }
}

/// Outcome of loading a persisted history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A command decoded from a record along with its history metadata.
pub(crate) struct DecodedEntry {
    pub id: u64,
    pub name: String,
    pub command: Box<dyn Command>,
}

/// Resolves against the live graph first, then against objects carried
/// by value in the records being loaded.
struct ReplayResolver<'a> {
    scene: &'a dyn IdentityResolver,
    captured: HashMap<ObjectId, SceneObject>,
}

impl<'a> ReplayResolver<'a> {
    fn new(scene: &'a dyn IdentityResolver) -> Self {
        Self {
            scene,
            captured: HashMap::new(),
        }
    }

    fn capture(&mut self, node: &ObjectNode) {
        self.captured.entry(node.id).or_insert_with(|| node.to_object());
        for child in &node.children {
            self.capture(child);
        }
    }
}

impl IdentityResolver for ReplayResolver<'_> {
    fn object_by_id(&self, id: ObjectId) -> Option<&SceneObject> {
        self.scene.object_by_id(id).or_else(|| self.captured.get(&id))
    }
}

fn warn(report: &mut LoadReport, index: usize, id: Option<u64>, kind: Option<String>, error: CommandError) {
    let warning = LoadWarning { index, id, kind, error };
    log::warn!("History {}", warning);
    report.warnings.push(warning);
}

/// Decode persisted records against a finished scene graph.
///
/// Records are parsed and decoded first; every object captured by value
/// in the batch then joins the resolver, and each command is resolved.
/// Commands are never executed.
pub(crate) fn decode_history(
    records: &[Value],
    resolver: &dyn IdentityResolver,
    registry: &CommandRegistry,
) -> (Vec<DecodedEntry>, LoadReport) {
    let mut report = LoadReport::default();
    let mut decoded = Vec::with_capacity(records.len());

    for (index, value) in records.iter().enumerate() {
        let kind = value.get("kind").and_then(Value::as_str).map(str::to_string);
        let record: SerializedCommand = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                let label = kind.clone().unwrap_or_else(|| "command".to_string());
                let id = value.get("id").and_then(Value::as_u64);
                warn(&mut report, index, id, kind, CommandError::malformed(&label, e));
                continue;
            }
        };
        match registry.decode(&record) {
            Ok(command) => decoded.push((index, record.id, record.display_name, command)),
            Err(e) => warn(&mut report, index, Some(record.id), Some(record.kind), e),
        }
    }

    let mut replay = ReplayResolver::new(resolver);
    for (_, _, _, command) in &decoded {
        for node in command.captured_objects() {
            replay.capture(node);
        }
    }

    let mut entries = Vec::with_capacity(decoded.len());
    for (index, id, name, command) in decoded {
        match command.resolve(&replay) {
            Ok(()) => entries.push(DecodedEntry { id, name, command }),
            Err(e) => warn(&mut report, index, Some(id), Some(command.kind().to_string()), e),
        }
    }

    report.loaded = entries.len();
    (entries, report)
}
