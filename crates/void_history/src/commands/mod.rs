//! Command pattern implementation for undo/redo support.
//!
//! Every undoable scene edit is a [`Command`]. Each kind also implements
//! [`DecodeCommand`] (or registers a decode function) so that persisted
//! records can be turned back into commands.

mod command;
mod geometry_commands;
mod multi;
mod object_commands;
mod transform_commands;
mod value_commands;

pub use command::{
    decode_state,
    encode_state,
    require_target,
    Command,
    CommandError,
    CommandResult,
    CommandState,
    DecodeCommand,
    ValueChange,
};
pub use geometry_commands::{SetGeometryCommand, SetMaterialCommand};
pub use multi::MultiCmds;
pub use object_commands::{AddObjectCommand, MoveObjectCommand, RemoveObjectCommand};
pub use transform_commands::{SetTransformCommand, TransformChannel};
pub use value_commands::{SetColorValueCommand, SetMapValueCommand, SetPropertyValueCommand};

pub(crate) use transform_commands::{decode_position, decode_rotation, decode_scale};
