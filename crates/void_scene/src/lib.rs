//! # void_scene - Editable Scene Graph
//!
//! The object graph the editor history operates on:
//!
//! - **Persistent identity**: every object carries an [`ObjectId`] assigned
//!   once at creation and kept across save/load
//! - **Hierarchy**: ordered parent/child structure with exact sibling indices
//! - **Leaf attributes**: transform, scalar properties, colors, material,
//!   texture maps and geometry descriptors
//! - **Derived state**: bounds recomputed whenever geometry is swapped
//! - **Resources**: renderer-side buffers tracked per object and released
//!   synchronously when geometry or materials are replaced
//!
//! The graph is looked up by id through the [`IdentityResolver`] trait so
//! that persisted commands never hold live references.

pub mod document;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod id;
pub mod material;
pub mod object;
pub mod resources;

pub use document::{ObjectNode, SceneData};
pub use error::{Result, SceneError};
pub use geometry::{Aabb, BufferGeometry, Geometry};
pub use graph::{IdentityResolver, Placement, SceneGraph};
pub use id::{ObjectId, TextureId};
pub use material::{Color, Material, MaterialKind, TextureRef};
pub use object::{AttributePath, CameraKind, LightKind, ObjectKind, PropertyValue, SceneObject, Transform};
pub use resources::{ResourceHandle, ResourceKind, ResourceTracker};
