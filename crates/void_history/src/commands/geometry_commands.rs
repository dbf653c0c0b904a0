//! Resource-backed swaps: geometry and whole materials.
//!
//! Both commands go through the scene graph's swap operations, which
//! release the outgoing resource before the new one is bound and keep
//! derived bounds in sync with the geometry descriptor.

use std::any::Any;

use void_scene::{Geometry, Material, ObjectId, SceneGraph};

use super::command::{
    decode_state, encode_state, require_target, Command, CommandError, CommandResult,
    CommandState, DecodeCommand, ValueChange,
};
use crate::codec::CommandRegistry;

/// Command to replace an object's geometry descriptor.
pub struct SetGeometryCommand {
    object: ObjectId,
    change: ValueChange<Option<Geometry>>,
}

impl SetGeometryCommand {
    pub fn new(scene: &SceneGraph, object: ObjectId, geometry: Geometry) -> Result<Self, CommandError> {
        let current = scene
            .get(object)
            .map(|o| o.geometry().cloned())
            .ok_or(CommandError::ObjectNotFound(object))?;
        Ok(Self {
            object,
            change: ValueChange::new(current, Some(geometry)),
        })
    }

    pub fn change(&self) -> &ValueChange<Option<Geometry>> {
        &self.change
    }
}

impl Command for SetGeometryCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        match &self.change.new_value {
            Some(geometry) => format!("Set Geometry: {}", geometry.name()),
            None => "Clear Geometry".to_string(),
        }
    }

    fn updatable(&self) -> bool {
        true
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some("geometry")
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_geometry(self.object, self.change.new_value.clone())?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_geometry(self.object, self.change.old_value.clone())?;
        Ok(())
    }

    fn merge(&mut self, newer: &dyn Command) -> bool {
        match newer.as_any().downcast_ref::<Self>() {
            Some(newer) if newer.object == self.object => {
                self.change.absorb(&newer.change);
                true
            }
            _ => false,
        }
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(Self::KIND, &self.change)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for SetGeometryCommand {
    const KIND: &'static str = "SetGeometry";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            object: require_target(Self::KIND, target)?,
            change: decode_state(Self::KIND, state)?,
        })
    }
}

/// Command to replace an object's whole material.
pub struct SetMaterialCommand {
    object: ObjectId,
    change: ValueChange<Option<Material>>,
}

impl SetMaterialCommand {
    pub fn new(scene: &SceneGraph, object: ObjectId, material: Material) -> Result<Self, CommandError> {
        let current = scene
            .get(object)
            .map(|o| o.material().cloned())
            .ok_or(CommandError::ObjectNotFound(object))?;
        Ok(Self {
            object,
            change: ValueChange::new(current, Some(material)),
        })
    }
}

impl Command for SetMaterialCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        "New Material".to_string()
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some("material")
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_material(self.object, self.change.new_value.clone())?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_material(self.object, self.change.old_value.clone())?;
        Ok(())
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(Self::KIND, &self.change)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for SetMaterialCommand {
    const KIND: &'static str = "SetMaterial";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            object: require_target(Self::KIND, target)?,
            change: decode_state(Self::KIND, state)?,
        })
    }
}
