//! Renderer-side resources bound to scene objects.
//!
//! The tracker stands in for GPU buffers: every object with geometry or a
//! material owns one live handle per kind. Handles are released
//! synchronously when the owning attribute is swapped or the object leaves
//! the graph, so a renderer running later in the same frame never sees a
//! stale handle.

use std::collections::HashMap;

use crate::error::{Result, SceneError};
use crate::id::ObjectId;

/// Opaque handle to an uploaded resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

/// What a resource holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
}

/// Tracks live resources and their owning objects.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    next_handle: u64,
    live: HashMap<ResourceHandle, ResourceKind>,
    bindings: HashMap<(ObjectId, ResourceKind), ResourceHandle>,
    released: u64,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a resource for `object`, replacing any previous binding.
    ///
    /// A replaced binding that was never released is leaked, not freed.
    pub fn attach(&mut self, object: ObjectId, kind: ResourceKind) -> ResourceHandle {
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.live.insert(handle, kind);
        if let Some(previous) = self.bindings.insert((object, kind), handle) {
            if self.live.contains_key(&previous) {
                log::warn!("Leaked {:?} resource {:?} of {}", kind, previous, object);
            }
        }
        handle
    }

    /// Release the resource of `kind` bound to `object`.
    ///
    /// The binding is dropped even when releasing fails.
    pub fn detach(&mut self, object: ObjectId, kind: ResourceKind) -> Result<()> {
        let handle = self
            .bindings
            .remove(&(object, kind))
            .ok_or(SceneError::ResourceNotBound { object, kind })?;
        self.release(handle)
    }

    /// Release a handle directly.
    pub fn release(&mut self, handle: ResourceHandle) -> Result<()> {
        if self.live.remove(&handle).is_none() {
            return Err(SceneError::ResourceNotFound(handle));
        }
        self.released += 1;
        Ok(())
    }

    pub fn handle(&self, object: ObjectId, kind: ResourceKind) -> Option<ResourceHandle> {
        self.bindings.get(&(object, kind)).copied()
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Number of live resources.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    /// Total releases since creation.
    pub fn released_count(&self) -> u64 {
        self.released
    }
}
