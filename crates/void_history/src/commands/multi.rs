//! Grouped commands applied and reverted as one history entry.

use std::any::Any;

use serde::{Deserialize, Serialize};
use void_scene::{IdentityResolver, ObjectId, ObjectNode, SceneGraph};

use super::command::{decode_state, encode_state, Command, CommandError, CommandResult, CommandState, DecodeCommand};
use crate::codec::{CommandRegistry, SerializedCommand};

#[derive(Serialize, Deserialize)]
struct MultiState {
    name: String,
    cmds: Vec<SerializedCommand>,
}

/// A group of commands executed in order and undone in reverse order.
///
/// If a member fails, the members already applied are reverted before
/// the error is returned, so the group is all-or-nothing.
pub struct MultiCmds {
    name: String,
    commands: Vec<Box<dyn Command>>,
}

impl MultiCmds {
    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }
}

impl Command for MultiCmds {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn description(&self) -> String {
        self.name.clone()
    }

    fn target(&self) -> Option<ObjectId> {
        None
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> CommandResult {
        for i in 0..self.commands.len() {
            if let Err(e) = self.commands[i].execute(scene) {
                for applied in self.commands[..i].iter_mut().rev() {
                    if let Err(undo_err) = applied.undo(scene) {
                        log::warn!("Failed to roll back '{}': {}", applied.description(), undo_err);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneGraph) -> CommandResult {
        let len = self.commands.len();
        for i in (0..len).rev() {
            if let Err(e) = self.commands[i].undo(scene) {
                for reverted in self.commands[i + 1..].iter_mut() {
                    if let Err(redo_err) = reverted.execute(scene) {
                        log::warn!("Failed to reapply '{}': {}", reverted.description(), redo_err);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn resolve(&self, resolver: &dyn IdentityResolver) -> CommandResult {
        self.commands.iter().try_for_each(|c| c.resolve(resolver))
    }

    fn encode(&self) -> Result<CommandState, CommandError> {
        let cmds = self
            .commands
            .iter()
            .map(|c| SerializedCommand::from_command(0, &c.description(), c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        encode_state(
            Self::KIND,
            &MultiState {
                name: self.name.clone(),
                cmds,
            },
        )
    }

    fn captured_objects(&self) -> Vec<&ObjectNode> {
        self.commands.iter().flat_map(|c| c.captured_objects()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodeCommand for MultiCmds {
    const KIND: &'static str = "MultiCmds";

    fn decode(
        registry: &CommandRegistry,
        _target: Option<ObjectId>,
        state: CommandState,
    ) -> Result<Self, CommandError> {
        let state: MultiState = decode_state(Self::KIND, state)?;
        let commands = state
            .cmds
            .iter()
            .map(|record| registry.decode(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(state.name, commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddObjectCommand, SetTransformCommand};
    use void_scene::{Placement, SceneObject};

    #[test]
    fn test_failed_member_rolls_back() {
        let mut scene = SceneGraph::new();
        let id = scene.add(SceneObject::group("G"), None).unwrap();

        let moved = SetTransformCommand::position(&scene, id, [5.0, 0.0, 0.0]).unwrap();
        // Index 9 is out of range at the root
        let bad_add = AddObjectCommand::at(SceneObject::group("H"), Placement::root(9));
        let mut group = MultiCmds::new("Broken", vec![Box::new(moved), Box::new(bad_add)]);

        assert!(group.execute(&mut scene).is_err());
        assert_eq!(scene.get(id).unwrap().transform.position, [0.0, 0.0, 0.0]);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_undo_in_reverse() {
        let mut scene = SceneGraph::new();
        let parent = SceneObject::group("Parent");
        let parent_id = parent.id;
        let add_parent = AddObjectCommand::at(parent, Placement::root(0));
        let add_child = AddObjectCommand::at(SceneObject::group("Child"), Placement::under(parent_id, 0));
        let mut group = MultiCmds::new("Build", vec![Box::new(add_parent), Box::new(add_child)]);

        group.execute(&mut scene).unwrap();
        assert_eq!(scene.len(), 2);
        // Child must be removed before its parent
        group.undo(&mut scene).unwrap();
        assert!(scene.is_empty());
        assert_eq!(group.captured_objects().len(), 2);
    }
}
