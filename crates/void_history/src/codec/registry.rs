//! Kind-tag dispatch for decoding commands.

use std::collections::HashMap;

use void_scene::ObjectId;

use super::SerializedCommand;
use crate::commands::{
    self, AddObjectCommand, Command, CommandError, CommandState, DecodeCommand, MoveObjectCommand,
    MultiCmds, RemoveObjectCommand, SetColorValueCommand, SetGeometryCommand, SetMapValueCommand,
    SetMaterialCommand, SetPropertyValueCommand,
};

/// Builds a command from the target id and kind-specific state of a record.
pub type DecodeFn =
    fn(&CommandRegistry, Option<ObjectId>, CommandState) -> Result<Box<dyn Command>, CommandError>;

fn decode_boxed<C: DecodeCommand + 'static>(
    registry: &CommandRegistry,
    target: Option<ObjectId>,
    state: CommandState,
) -> Result<Box<dyn Command>, CommandError> {
    Ok(Box::new(C::decode(registry, target, state)?))
}

/// Maps kind tags to decode functions.
pub struct CommandRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Create a registry with every built-in command kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<AddObjectCommand>();
        registry.register::<RemoveObjectCommand>();
        registry.register::<MoveObjectCommand>();
        registry.register_fn("SetPosition", commands::decode_position);
        registry.register_fn("SetRotation", commands::decode_rotation);
        registry.register_fn("SetScale", commands::decode_scale);
        registry.register::<SetPropertyValueCommand>();
        registry.register::<SetColorValueCommand>();
        registry.register::<SetMapValueCommand>();
        registry.register::<SetGeometryCommand>();
        registry.register::<SetMaterialCommand>();
        registry.register::<MultiCmds>();
        registry
    }

    /// Register a command type under its kind tag.
    pub fn register<C: DecodeCommand + 'static>(&mut self) {
        self.register_fn(C::KIND, decode_boxed::<C>);
    }

    /// Register a decode function under an explicit kind tag.
    pub fn register_fn(&mut self, kind: &str, decode: DecodeFn) {
        if self.decoders.insert(kind.to_string(), decode).is_some() {
            log::debug!("Replaced decoder for {}", kind);
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Rebuild a command from its record.
    ///
    /// The record's `updatable` flag must agree with the decoded command,
    /// otherwise re-serializing would not reproduce the record.
    pub fn decode(&self, record: &SerializedCommand) -> Result<Box<dyn Command>, CommandError> {
        let decode = self
            .decoders
            .get(&record.kind)
            .ok_or_else(|| CommandError::UnknownKind(record.kind.clone()))?;
        let command = decode(self, record.target_id, record.state.clone())?;
        if command.updatable() != record.updatable {
            return Err(CommandError::malformed(
                &record.kind,
                format!("updatable is {}, expected {}", record.updatable, command.updatable()),
            ));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::{LightKind, SceneGraph, SceneObject};

    #[test]
    fn test_builtin_kinds() {
        let registry = CommandRegistry::with_builtin();
        for kind in [
            "AddObject",
            "RemoveObject",
            "MoveObject",
            "SetPosition",
            "SetRotation",
            "SetScale",
            "SetPropertyValue",
            "SetColorValue",
            "SetMapValue",
            "SetGeometry",
            "SetMaterial",
            "MultiCmds",
        ] {
            assert!(registry.contains(kind), "missing {}", kind);
        }
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn test_updatable_flag_must_match_kind() {
        let mut scene = SceneGraph::new();
        let lamp = scene.add(SceneObject::light("Lamp", LightKind::Point), None).unwrap();
        let cmd = SetPropertyValueCommand::new(&scene, lamp, "intensity", 2.0).unwrap();
        let mut record = SerializedCommand::from_command(1, "Set intensity", &cmd).unwrap();

        let registry = CommandRegistry::with_builtin();
        assert!(registry.decode(&record).is_ok());

        record.updatable = false;
        assert!(matches!(
            registry.decode(&record),
            Err(CommandError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let registry = CommandRegistry::new();
        let record = SerializedCommand {
            kind: "Teleport".to_string(),
            id: 1,
            display_name: String::new(),
            updatable: false,
            target_id: None,
            state: CommandState::new(),
        };
        assert_eq!(
            registry.decode(&record).err(),
            Some(CommandError::UnknownKind("Teleport".to_string()))
        );
    }
}
