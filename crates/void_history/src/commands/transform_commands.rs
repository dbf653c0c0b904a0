//! Transform manipulation commands (position, rotation, scale).

use std::any::Any;

use void_scene::{ObjectId, SceneGraph, Transform};

use super::command::{
    decode_state, encode_state, require_target, Command, CommandError, CommandResult,
    CommandState, ValueChange,
};
use crate::codec::CommandRegistry;

/// Which part of a transform a command edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformChannel {
    Position,
    Rotation,
    Scale,
}

impl TransformChannel {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformChannel::Position => "SetPosition",
            TransformChannel::Rotation => "SetRotation",
            TransformChannel::Scale => "SetScale",
        }
    }

    pub fn attribute(&self) -> &'static str {
        match self {
            TransformChannel::Position => "position",
            TransformChannel::Rotation => "rotation",
            TransformChannel::Scale => "scale",
        }
    }

    fn get(&self, transform: &Transform) -> [f32; 3] {
        match self {
            TransformChannel::Position => transform.position,
            TransformChannel::Rotation => transform.rotation,
            TransformChannel::Scale => transform.scale,
        }
    }

    fn set(&self, transform: &mut Transform, value: [f32; 3]) {
        match self {
            TransformChannel::Position => transform.position = value,
            TransformChannel::Rotation => transform.rotation = value,
            TransformChannel::Scale => transform.scale = value,
        }
    }
}

/// Command to set one channel of an object's transform.
///
/// Consecutive edits of the same channel merge, so a gizmo drag becomes
/// a single entry.
pub struct SetTransformCommand {
    object: ObjectId,
    channel: TransformChannel,
    change: ValueChange<[f32; 3]>,
}

impl SetTransformCommand {
    pub fn new(
        scene: &SceneGraph,
        object: ObjectId,
        channel: TransformChannel,
        value: [f32; 3],
    ) -> Result<Self, CommandError> {
        let current = scene
            .get(object)
            .map(|o| channel.get(&o.transform))
            .ok_or(CommandError::ObjectNotFound(object))?;
        Ok(Self {
            object,
            channel,
            change: ValueChange::new(current, value),
        })
    }

    pub fn position(scene: &SceneGraph, object: ObjectId, value: [f32; 3]) -> Result<Self, CommandError> {
        Self::new(scene, object, TransformChannel::Position, value)
    }

    pub fn rotation(scene: &SceneGraph, object: ObjectId, value: [f32; 3]) -> Result<Self, CommandError> {
        Self::new(scene, object, TransformChannel::Rotation, value)
    }

    pub fn scale(scene: &SceneGraph, object: ObjectId, value: [f32; 3]) -> Result<Self, CommandError> {
        Self::new(scene, object, TransformChannel::Scale, value)
    }

    pub fn channel(&self) -> TransformChannel {
        self.channel
    }

    pub fn change(&self) -> &ValueChange<[f32; 3]> {
        &self.change
    }

    fn apply(&self, scene: &mut SceneGraph, value: [f32; 3]) -> CommandResult {
        let object = scene
            .get_mut(self.object)
            .ok_or(CommandError::ObjectNotFound(self.object))?;
        self.channel.set(&mut object.transform, value);
        Ok(())
    }

    fn decode(channel: TransformChannel, target: Option<ObjectId>, state: CommandState) -> Result<Self, CommandError> {
        Ok(Self {
            object: require_target(channel.kind(), target)?,
            channel,
            change: decode_state(channel.kind(), state)?,
        })
    }
}

impl Command for SetTransformCommand {
    fn kind(&self) -> &'static str {
        self.channel.kind()
    }

    fn description(&self) -> String {
        match self.channel {
            TransformChannel::Position => "Set Position".to_string(),
            TransformChannel::Rotation => "Set Rotation".to_string(),
            TransformChannel::Scale => "Set Scale".to_string(),
        }
    }

    fn updatable(&self) -> bool {
        true
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some(self.channel.attribute())
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        self.apply(scene, self.change.new_value)
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        self.apply(scene, self.change.old_value)
    }

    fn merge(&mut self, newer: &dyn Command) -> bool {
        match newer.as_any().downcast_ref::<Self>() {
            Some(newer) if newer.object == self.object && newer.channel == self.channel => {
                self.change.absorb(&newer.change);
                true
            }
            _ => false,
        }
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(self.kind(), &self.change)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn decode_position(
    _registry: &CommandRegistry,
    target: Option<ObjectId>,
    state: CommandState,
) -> Result<Box<dyn Command>, CommandError> {
    Ok(Box::new(SetTransformCommand::decode(TransformChannel::Position, target, state)?))
}

pub(crate) fn decode_rotation(
    _registry: &CommandRegistry,
    target: Option<ObjectId>,
    state: CommandState,
) -> Result<Box<dyn Command>, CommandError> {
    Ok(Box::new(SetTransformCommand::decode(TransformChannel::Rotation, target, state)?))
}

pub(crate) fn decode_scale(
    _registry: &CommandRegistry,
    target: Option<ObjectId>,
    state: CommandState,
) -> Result<Box<dyn Command>, CommandError> {
    Ok(Box::new(SetTransformCommand::decode(TransformChannel::Scale, target, state)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::SceneObject;

    #[test]
    fn test_set_position_undo() {
        let mut scene = SceneGraph::new();
        let id = scene.add(SceneObject::group("G"), None).unwrap();

        let mut cmd = SetTransformCommand::position(&scene, id, [1.0, 2.0, 3.0]).unwrap();
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.get(id).unwrap().transform.position, [1.0, 2.0, 3.0]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.get(id).unwrap().transform.position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_merge_same_channel_only() {
        let mut scene = SceneGraph::new();
        let id = scene.add(SceneObject::group("G"), None).unwrap();

        let mut first = SetTransformCommand::scale(&scene, id, [2.0; 3]).unwrap();
        first.execute(&mut scene).unwrap();
        let mut second = SetTransformCommand::scale(&scene, id, [3.0; 3]).unwrap();
        second.execute(&mut scene).unwrap();
        let rotate = SetTransformCommand::rotation(&scene, id, [0.0, 1.0, 0.0]).unwrap();

        assert!(first.merge(&second));
        assert!(!first.merge(&rotate));
        assert_eq!(first.change(), &ValueChange::new([1.0; 3], [3.0; 3]));

        first.undo(&mut scene).unwrap();
        assert_eq!(scene.get(id).unwrap().transform.scale, [1.0; 3]);
    }
}
