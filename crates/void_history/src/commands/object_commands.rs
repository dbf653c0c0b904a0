//! Object structure commands (add, remove, move).

use std::any::Any;

use serde::{Deserialize, Serialize};
use void_scene::{IdentityResolver, ObjectId, ObjectNode, Placement, SceneGraph};

use super::command::{
    decode_state, encode_state, require_target, Command, CommandError, CommandResult,
    CommandState, DecodeCommand,
};
use crate::codec::CommandRegistry;

fn resolve_parent(resolver: &dyn IdentityResolver, placement: &Placement) -> CommandResult {
    match placement.parent {
        Some(parent) if !resolver.contains(parent) => Err(CommandError::ObjectNotFound(parent)),
        _ => Ok(()),
    }
}

fn check_target(kind: &str, target: Option<ObjectId>, object: ObjectId) -> CommandResult {
    match target {
        Some(id) if id != object => Err(CommandError::malformed(
            kind,
            format!("targetId {} does not match object {}", id, object),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtreeState {
    object: ObjectNode,
    placement: Placement,
}

/// Command to insert an object subtree at an exact position.
pub struct AddObjectCommand {
    node: ObjectNode,
    placement: Placement,
}

impl AddObjectCommand {
    /// Append `object` as the last child of `parent`.
    pub fn new(
        scene: &SceneGraph,
        object: impl Into<ObjectNode>,
        parent: Option<ObjectId>,
    ) -> Result<Self, CommandError> {
        let index = scene.children_of(parent)?.len();
        Ok(Self::at(object, Placement { parent, index }))
    }

    pub fn at(object: impl Into<ObjectNode>, placement: Placement) -> Self {
        Self {
            node: object.into(),
            placement,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.node.id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

impl Command for AddObjectCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Add Object: {}", self.node.name)
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.node.id)
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.insert(self.node.clone(), self.placement)?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.remove(self.node.id)?;
        Ok(())
    }

    // The object itself may be gone from the live graph; only the
    // parent it is inserted under has to exist.
    fn resolve(&self, resolver: &dyn IdentityResolver) -> CommandResult {
        resolve_parent(resolver, &self.placement)
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(
            Self::KIND,
            &SubtreeState {
                object: self.node.clone(),
                placement: self.placement,
            },
        )
    }

    fn captured_objects(&self) -> Vec<&ObjectNode> {
        vec![&self.node]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for AddObjectCommand {
    const KIND: &'static str = "AddObject";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let state: SubtreeState = decode_state(Self::KIND, state)?;
        check_target(Self::KIND, target, state.object.id)?;
        Ok(Self::at(state.object, state.placement))
    }
}

/// Command to remove an object and its subtree.
///
/// The subtree is captured by value so undo reinserts an exact copy at
/// the same parent and sibling index.
pub struct RemoveObjectCommand {
    node: ObjectNode,
    placement: Placement,
}

impl RemoveObjectCommand {
    pub fn new(scene: &SceneGraph, object: ObjectId) -> Result<Self, CommandError> {
        Ok(Self {
            node: scene.snapshot(object)?,
            placement: scene.placement(object)?,
        })
    }

    pub fn object_id(&self) -> ObjectId {
        self.node.id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

impl Command for RemoveObjectCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Remove Object: {}", self.node.name)
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.node.id)
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.remove(self.node.id)?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        scene.insert(self.node.clone(), self.placement)?;
        Ok(())
    }

    fn resolve(&self, resolver: &dyn IdentityResolver) -> CommandResult {
        if !resolver.contains(self.node.id) {
            return Err(CommandError::ObjectNotFound(self.node.id));
        }
        resolve_parent(resolver, &self.placement)
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        encode_state(
            Self::KIND,
            &SubtreeState {
                object: self.node.clone(),
                placement: self.placement,
            },
        )
    }

    fn captured_objects(&self) -> Vec<&ObjectNode> {
        vec![&self.node]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for RemoveObjectCommand {
    const KIND: &'static str = "RemoveObject";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let state: SubtreeState = decode_state(Self::KIND, state)?;
        check_target(Self::KIND, target, state.object.id)?;
        Ok(Self {
            node: state.object,
            placement: state.placement,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveState {
    old_placement: Placement,
    new_placement: Placement,
}

/// Command to reparent or reorder an object.
pub struct MoveObjectCommand {
    object: ObjectId,
    name: String,
    old_placement: Placement,
    new_placement: Placement,
}

impl MoveObjectCommand {
    /// Move `object` under `parent`, just before the sibling `before`,
    /// or to the end when `before` is `None`.
    pub fn new(
        scene: &SceneGraph,
        object: ObjectId,
        parent: Option<ObjectId>,
        before: Option<ObjectId>,
    ) -> Result<Self, CommandError> {
        let old_placement = scene.placement(object)?;
        let siblings = scene.children_of(parent)?;
        let mut index = match before {
            Some(sibling) => siblings.iter().position(|&c| c == sibling).ok_or_else(|| {
                CommandError::InvalidOperation(format!("{} is not a child of the new parent", sibling))
            })?,
            None => siblings.len(),
        };
        // Indices are counted after the object leaves its old slot
        if parent == old_placement.parent && old_placement.index < index {
            index -= 1;
        }
        Self::to_index(scene, object, parent, index)
    }

    /// Move `object` to `index` among `parent`'s children, counted after
    /// the object has left its old slot.
    pub fn to_index(
        scene: &SceneGraph,
        object: ObjectId,
        parent: Option<ObjectId>,
        index: usize,
    ) -> Result<Self, CommandError> {
        let name = scene
            .get(object)
            .map(|o| o.name.clone())
            .ok_or(CommandError::ObjectNotFound(object))?;
        if let Some(parent) = parent {
            if parent == object || scene.is_ancestor(object, parent) {
                return Err(CommandError::InvalidOperation(format!(
                    "cannot move {} into its own subtree",
                    name
                )));
            }
        }
        Ok(Self {
            object,
            name,
            old_placement: scene.placement(object)?,
            new_placement: Placement { parent, index },
        })
    }

    pub fn old_placement(&self) -> Placement {
        self.old_placement
    }

    pub fn new_placement(&self) -> Placement {
        self.new_placement
    }
}

impl Command for MoveObjectCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        format!("Move Object: {}", self.name)
    }

    fn target(&self) -> Option<ObjectId> {
        Some(self.object)
    }

    fn attribute(&self) -> Option<&str> {
        Some("parent")
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        let Placement { parent, index } = self.new_placement;
        scene.move_object(self.object, parent, index)?;
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        let Placement { parent, index } = self.old_placement;
        scene.move_object(self.object, parent, index)?;
        Ok(())
    }

    fn resolve(&self, resolver: &dyn IdentityResolver) -> CommandResult {
        if !resolver.contains(self.object) {
            return Err(CommandError::ObjectNotFound(self.object));
        }
        resolve_parent(resolver, &self.old_placement)?;
        resolve_parent(resolver, &self.new_placement)
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        let mut state = encode_state(
            Self::KIND,
            &MoveState {
                old_placement: self.old_placement,
                new_placement: self.new_placement,
            },
        )?;
        state.insert("name".to_string(), self.name.clone().into());
        Ok(state)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for MoveObjectCommand {
    const KIND: &'static str = "MoveObject";

    fn decode(
        _registry: &CommandRegistry,
        target: Option<ObjectId>,
        mut state: CommandState,
    ) -> Result<Self, CommandError> {
        let object = require_target(Self::KIND, target)?;
        let name = match state.remove("name") {
            Some(serde_json::Value::String(name)) => name,
            _ => return Err(CommandError::malformed(Self::KIND, "missing name")),
        };
        let state: MoveState = decode_state(Self::KIND, state)?;
        Ok(Self {
            object,
            name,
            old_placement: state.old_placement,
            new_placement: state.new_placement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::{Geometry, Material, SceneObject};

    fn scene() -> (SceneGraph, ObjectId, ObjectId, ObjectId) {
        let mut scene = SceneGraph::new();
        let a = scene.add(SceneObject::group("A"), None).unwrap();
        let b = scene.add(SceneObject::group("B"), None).unwrap();
        let c = scene.add(SceneObject::group("C"), None).unwrap();
        (scene, a, b, c)
    }

    #[test]
    fn test_add_then_undo() {
        let (mut scene, a, b, c) = scene();
        let box1 = SceneObject::mesh("Box1", Geometry::cube(1.0), Material::default());
        let mut cmd = AddObjectCommand::at(box1, Placement::root(1));
        let id = cmd.object_id();

        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, id, b, c]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, b, c]);
    }

    #[test]
    fn test_remove_restores_exact_position() {
        let (mut scene, a, b, c) = scene();
        let mut cmd = RemoveObjectCommand::new(&scene, b).unwrap();
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, c]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, b, c]);
    }

    #[test]
    fn test_move_before_sibling_same_parent() {
        let (mut scene, a, b, c) = scene();
        // Move A before C: A leaves slot 0, so it lands at index 1
        let mut cmd = MoveObjectCommand::new(&scene, a, None, Some(c)).unwrap();
        assert_eq!(cmd.new_placement(), Placement::root(1));
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[b, a, c]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, b, c]);
    }

    #[test]
    fn test_move_into_other_parent() {
        let (mut scene, a, b, c) = scene();
        let mut cmd = MoveObjectCommand::new(&scene, c, Some(a), None).unwrap();
        cmd.execute(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, b]);
        assert_eq!(scene.children_of(Some(a)).unwrap(), &[c]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.roots(), &[a, b, c]);

        assert!(MoveObjectCommand::new(&scene, a, Some(a), None).is_err());
    }

    #[test]
    fn test_add_decode_rejects_mismatched_target() {
        let cmd = AddObjectCommand::at(SceneObject::group("G"), Placement::root(0));
        let state = cmd.encode().unwrap();
        let registry = CommandRegistry::new();
        assert!(AddObjectCommand::decode(&registry, Some(ObjectId::new()), state.clone()).is_err());
        let decoded = AddObjectCommand::decode(&registry, Some(cmd.object_id()), state).unwrap();
        assert_eq!(decoded.object_id(), cmd.object_id());
    }
}
