//! Leaf attribute commands (scalar values, colors, texture maps).
//!
//! Attributes are addressed by path: `intensity` edits the object itself,
//! `material.opacity` edits its material.

use std::any::Any;

use serde::{Deserialize, Serialize};
use void_scene::{Color, ObjectId, PropertyValue, SceneGraph, TextureRef};

use super::command::{
    decode_state, encode_state, require_target, Command, CommandError, CommandResult,
    CommandState, DecodeCommand, ValueChange,
};
use crate::codec::CommandRegistry;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeState<T> {
    attribute: String,
    old_value: T,
    new_value: T,
}

impl<T: Clone> AttributeState<T> {
    fn capture(attribute: &str, change: &ValueChange<T>) -> Self {
        Self {
            attribute: attribute.to_string(),
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        }
    }

    fn into_parts(self) -> (String, ValueChange<T>) {
        (self.attribute, ValueChange::new(self.old_value, self.new_value))
    }
}

/// Command to set a scalar, boolean or text attribute.
pub struct SetPropertyValueCommand {
    object: ObjectId,
    attribute: String,
    change: ValueChange<Option<PropertyValue>>,
}

impl SetPropertyValueCommand {
    pub fn new(
        scene: &SceneGraph,
        object: ObjectId,
        attribute: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Self, CommandError> {
        Self::with_value(scene, object, attribute, Some(value.into()))
    }

    /// Set the attribute, or remove it when `value` is `None`.
    pub fn with_value(
        scene: &SceneGraph,
        object: ObjectId,
        attribute: impl Into<String>,
        value: Option<PropertyValue>,
    ) -> Result<Self, CommandError> {
        let attribute = attribute.into();
        let current = scene.property(object, &attribute)?;
        Ok(Self {
            object,
            attribute,
            change: ValueChange::new(current, value),
        })
    }

    pub fn change(&self) -> &ValueChange<Option<PropertyValue>> {
        &self.change
    }
}

impl Command for SetPropertyValueCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Set {}", self.attribute)
    }

    fn updatable(&self) -> bool {
        true
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some(&self.attribute)
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_property(self.object, &self.attribute, self.change.new_value.clone())?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_property(self.object, &self.attribute, self.change.old_value.clone())?;
        Ok(())
    }

    fn merge(&mut self, newer: &dyn Command) -> bool {
        match newer.as_any().downcast_ref::<Self>() {
            Some(newer) if newer.object == self.object && newer.attribute == self.attribute => {
                self.change.absorb(&newer.change);
                true
            }
            _ => false,
        }
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(Self::KIND, &AttributeState::capture(&self.attribute, &self.change))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for SetPropertyValueCommand {
    const KIND: &'static str = "SetPropertyValue";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let object = require_target(Self::KIND, target)?;
        let state: AttributeState<Option<PropertyValue>> = decode_state(Self::KIND, state)?;
        let (attribute, change) = state.into_parts();
        Ok(Self { object, attribute, change })
    }
}

/// Command to set a color attribute, stored as a packed RGB integer.
pub struct SetColorValueCommand {
    object: ObjectId,
    attribute: String,
    change: ValueChange<Option<Color>>,
}

impl SetColorValueCommand {
    pub fn new(
        scene: &SceneGraph,
        object: ObjectId,
        attribute: impl Into<String>,
        color: Color,
    ) -> Result<Self, CommandError> {
        let attribute = attribute.into();
        let current = scene.color(object, &attribute)?;
        Ok(Self {
            object,
            attribute,
            change: ValueChange::new(current, Some(color)),
        })
    }

    pub fn change(&self) -> &ValueChange<Option<Color>> {
        &self.change
    }
}

impl Command for SetColorValueCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Set {}", self.attribute)
    }

    fn updatable(&self) -> bool {
        true
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some(&self.attribute)
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_color(self.object, &self.attribute, self.change.new_value)?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_color(self.object, &self.attribute, self.change.old_value)?;
        Ok(())
    }

    fn merge(&mut self, newer: &dyn Command) -> bool {
        match newer.as_any().downcast_ref::<Self>() {
            Some(newer) if newer.object == self.object && newer.attribute == self.attribute => {
                self.change.absorb(&newer.change);
                true
            }
            _ => false,
        }
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(Self::KIND, &AttributeState::capture(&self.attribute, &self.change))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for SetColorValueCommand {
    const KIND: &'static str = "SetColorValue";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let object = require_target(Self::KIND, target)?;
        let state: AttributeState<Option<Color>> = decode_state(Self::KIND, state)?;
        let (attribute, change) = state.into_parts();
        Ok(Self { object, attribute, change })
    }
}

/// Command to bind or clear a texture in a material slot.
///
/// Textures are referenced by id only. Map edits never merge.
pub struct SetMapValueCommand {
    object: ObjectId,
    slot: String,
    change: ValueChange<Option<TextureRef>>,
}

impl SetMapValueCommand {
    pub fn new(
        scene: &SceneGraph,
        object: ObjectId,
        slot: impl Into<String>,
        texture: Option<TextureRef>,
    ) -> Result<Self, CommandError> {
        let slot = slot.into();
        let current = scene.map(object, &slot)?;
        Ok(Self {
            object,
            slot,
            change: ValueChange::new(current, texture),
        })
    }

    pub fn change(&self) -> &ValueChange<Option<TextureRef>> {
        &self.change
    }
}

impl Command for SetMapValueCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Set material.{}", self.slot)
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some(&self.slot)
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_map(self.object, &self.slot, self.change.new_value.clone())?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.set_map(self.object, &self.slot, self.change.old_value.clone())?;
        Ok(())
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(Self::KIND, &AttributeState::capture(&self.slot, &self.change))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for SetMapValueCommand {
    const KIND: &'static str = "SetMapValue";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let object = require_target(Self::KIND, target)?;
        let state: AttributeState<Option<TextureRef>> = decode_state(Self::KIND, state)?;
        let (slot, change) = state.into_parts();
        Ok(Self { object, slot, change })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::{Geometry, LightKind, Material, SceneObject, TextureId};

    fn scene() -> (SceneGraph, ObjectId, ObjectId) {
        let mut scene = SceneGraph::new();
        let mesh = scene
            .add(SceneObject::mesh("Box", Geometry::cube(1.0), Material::default()), None)
            .unwrap();
        let light = scene.add(SceneObject::light("Sun", LightKind::Directional), None).unwrap();
        (scene, mesh, light)
    }

    #[test]
    fn test_material_value() {
        let (mut scene, mesh, _) = scene();
        let mut cmd = SetPropertyValueCommand::new(&scene, mesh, "material.opacity", 0.25).unwrap();
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.property(mesh, "material.opacity").unwrap(), Some(PropertyValue::Float(0.25)));
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.property(mesh, "material.opacity").unwrap(), Some(PropertyValue::Float(1.0)));
    }

    #[test]
    fn test_new_property_is_removed_on_undo() {
        let (mut scene, _, light) = scene();
        let mut cmd = SetPropertyValueCommand::new(&scene, light, "castShadow", true).unwrap();
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.property(light, "castShadow").unwrap(), Some(PropertyValue::Bool(true)));
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.property(light, "castShadow").unwrap(), None);
    }

    #[test]
    fn test_color_is_stored_numerically() {
        let (scene, _, light) = scene();
        let cmd = SetColorValueCommand::new(&scene, light, "color", Color::from_hex(0xff8800)).unwrap();
        let state = cmd.encode().unwrap();
        assert_eq!(state["attribute"], "color");
        assert_eq!(state["oldValue"], 0xffffff);
        assert_eq!(state["newValue"], 0xff8800);
    }

    #[test]
    fn test_map_does_not_merge_with_value() {
        let (mut scene, mesh, _) = scene();
        let texture = TextureRef::new(TextureId::new());
        let mut map = SetMapValueCommand::new(&scene, mesh, "map", Some(texture.clone())).unwrap();
        let value = SetPropertyValueCommand::new(&scene, mesh, "material.map", 1.0).unwrap();
        assert!(!map.updatable());
        assert!(!map.merge(&value));

        map.execute(&mut scene).unwrap();
        assert_eq!(scene.map(mesh, "map").unwrap(), Some(texture));
        map.undo(&mut scene).unwrap();
        assert_eq!(scene.map(mesh, "map").unwrap(), None);
    }
}
