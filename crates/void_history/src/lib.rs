//! Void Engine Command History
//!
//! Reversible, serializable scene edits and the undo/redo timeline built
//! on top of them.
//!
//! ## Architecture
//!
//! ```text
//! UI gesture → Command → Editor::execute → SceneGraph
//!                                        ↘ History (push / merge)
//! ```
//!
//! Every command stores the state it needs to apply and revert itself,
//! addressed by persistent [`void_scene::ObjectId`]s. The history can be
//! written to JSON and read back in a later session, where each record
//! is re-attached to the live graph through an
//! [`void_scene::IdentityResolver`].

pub mod codec;
pub mod commands;
pub mod core;
mod error;

pub use error::{HistoryError, Result};

pub use crate::core::{
    Editor,
    EntrySummary,
    History,
    HistoryConfig,
    HistoryEvent,
    MergeHint,
    SubscriberId,
};

pub use commands::{
    Command,
    CommandError,
    CommandResult,
};

pub use codec::{
    CommandRegistry,
    LoadReport,
    LoadWarning,
    ProjectFile,
    SerializedCommand,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
