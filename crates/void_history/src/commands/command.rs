//! Command trait and result types.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use void_scene::{IdentityResolver, ObjectId, ObjectNode, SceneError, SceneGraph};

use crate::codec::CommandRegistry;

/// Result type for command execution.
pub type CommandResult = Result<(), CommandError>;

/// Kind-specific fields of a serialized command.
pub type CommandState = Map<String, Value>;

/// Errors that can occur while executing, undoing or decoding a command.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CommandError {
    /// A persistent id did not resolve to a live object
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),
    /// No decoder is registered for a kind tag
    #[error("Unknown command kind: {0}")]
    UnknownKind(String),
    /// A record is missing fields or carries values of the wrong shape
    #[error("Malformed {kind} record: {reason}")]
    Malformed { kind: String, reason: String },
    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl CommandError {
    pub fn malformed(kind: &str, reason: impl ToString) -> Self {
        CommandError::Malformed {
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A reversible, serializable scene mutation.
///
/// Commands capture both the value they apply and the value they replace
/// when constructed, so `execute` and `undo` depend only on the resolved
/// target and that stored state.
///
/// # Example
///
/// ```ignore
/// let cmd = SetTransformCommand::position(editor.scene(), id, [0.0, 1.0, 0.0])?;
/// editor.execute(Box::new(cmd))?;
/// editor.undo()?;
/// ```
pub trait Command: Send + Sync {
    /// Dispatch key used when decoding a record.
    fn kind(&self) -> &'static str;

    /// Human-readable description for the history panel.
    fn description(&self) -> String;

    /// Whether successive edits of this command may be merged.
    fn updatable(&self) -> bool {
        false
    }

    /// Persistent id of the object this command edits.
    fn target(&self) -> Option<ObjectId>;

    /// Attribute of the target this command edits, if it edits just one.
    fn attribute(&self) -> Option<&str> {
        None
    }

    /// Apply the after-state.
    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult;

    /// Restore the before-state.
    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult;

    /// Take `newer`'s after-state, keeping this command's before-state.
    ///
    /// Only called for a command of the same kind, target and attribute.
    /// Returns false when `newer` cannot be absorbed.
    fn merge(&mut self, _newer: &dyn Command) -> bool {
        false
    }

    /// Check that every object this command refers to can be found.
    fn resolve(&self, resolver: &dyn IdentityResolver) -> CommandResult {
        match self.target() {
            Some(id) if !resolver.contains(id) => Err(CommandError::ObjectNotFound(id)),
            _ => Ok(()),
        }
    }

    /// Kind-specific state for the persisted record.
    fn encode(&self) -> Result<CommandState, CommandError>;

    /// Objects this command carries by value.
    fn captured_objects(&self) -> Vec<&ObjectNode> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
}

/// A command kind that can be rebuilt from a persisted record.
pub trait DecodeCommand: Command + Sized {
    const KIND: &'static str;

    fn decode(
        registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError>;
}

/// Before and after values of a single attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange<T> {
    pub old_value: T,
    pub new_value: T,
}

impl<T: Clone> ValueChange<T> {
    pub fn new(old_value: T, new_value: T) -> Self {
        Self { old_value, new_value }
    }

    /// Continue this change with a newer one; `old_value` is untouched.
    pub fn absorb(&mut self, newer: &ValueChange<T>) {
        self.new_value = newer.new_value.clone();
    }
}

pub fn encode_state<T: Serialize>(kind: &str, state: &T) -> Result<CommandState, CommandError> {
    match serde_json::to_value(state) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CommandError::malformed(
            kind,
            format!("state encodes as {} instead of an object", other),
        )),
        Err(e) => Err(CommandError::malformed(kind, e)),
    }
}

pub fn decode_state<T: DeserializeOwned>(kind: &str, state: CommandState) -> Result<T, CommandError> {
    serde_json::from_value(Value::Object(state)).map_err(|e| CommandError::malformed(kind, e))
}

pub fn require_target(kind: &str, target: Option<ObjectId>) -> Result<ObjectId, CommandError> {
    target.ok_or_else(|| CommandError::malformed(kind, "missing targetId"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_change_absorb_keeps_old() {
        let mut change = ValueChange::new(1, 2);
        change.absorb(&ValueChange::new(5, 3));
        assert_eq!(change, ValueChange::new(1, 3));
    }

    #[test]
    fn test_state_helpers() {
        let state = encode_state("Test", &ValueChange::new(0.5, 1.0)).unwrap();
        assert_eq!(Value::Object(state.clone()), json!({ "oldValue": 0.5, "newValue": 1.0 }));

        let decoded: ValueChange<f64> = decode_state("Test", state).unwrap();
        assert_eq!(decoded.new_value, 1.0);

        let err = decode_state::<ValueChange<f64>>("Test", Map::new()).unwrap_err();
        assert!(matches!(err, CommandError::Malformed { ref kind, .. } if kind == "Test"));
        assert!(encode_state("Test", &3).is_err());
    }

    #[test]
    fn test_require_target() {
        let id = ObjectId::new();
        assert_eq!(require_target("Test", Some(id)), Ok(id));
        assert!(require_target("Test", None).is_err());
    }
}
