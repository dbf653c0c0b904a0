//! Error types for scene graph operations

use thiserror::Error;

use crate::id::ObjectId;
use crate::resources::{ResourceHandle, ResourceKind};

/// Scene graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// No object with this id is in the graph
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// An object with this id is already in the graph
    #[error("Object already exists: {0}")]
    DuplicateObject(ObjectId),

    /// Reparenting would make an object its own ancestor
    #[error("Cannot parent {object} under its own descendant {parent}")]
    CyclicParent { object: ObjectId, parent: ObjectId },

    /// Sibling index past the end of the child list
    #[error("Sibling index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Material attribute addressed on an object without a material
    #[error("Object {0} has no material")]
    MissingMaterial(ObjectId),

    /// Value rejected by the attribute it was written to
    #[error("Invalid value for '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    /// Resource handle unknown or already released
    #[error("Resource not live: {0:?}")]
    ResourceNotFound(ResourceHandle),

    /// No resource of this kind bound to the object
    #[error("No {kind:?} resource bound to {object}")]
    ResourceNotBound { object: ObjectId, kind: ResourceKind },
}

/// Result type for scene graph operations
pub type Result<T> = std::result::Result<T, SceneError>;
