//! The scene graph and identity resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{ObjectNode, SceneData};
use crate::error::{Result, SceneError};
use crate::geometry::Geometry;
use crate::id::ObjectId;
use crate::material::{Color, Material, TextureRef};
use crate::object::{PropertyValue, SceneObject};
use crate::resources::{ResourceKind, ResourceTracker};

/// Maps a persistent id to the live object currently carrying it.
///
/// Deserialized commands resolve their targets through this trait and
/// never keep references across calls.
pub trait IdentityResolver {
    fn object_by_id(&self, id: ObjectId) -> Option<&SceneObject>;

    fn contains(&self, id: ObjectId) -> bool {
        self.object_by_id(id).is_some()
    }
}

/// Exact position of an object: its parent (`None` for the scene root)
/// and its index among that parent's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default)]
    pub parent: Option<ObjectId>,
    pub index: usize,
}

impl Placement {
    pub fn root(index: usize) -> Self {
        Self { parent: None, index }
    }

    pub fn under(parent: ObjectId, index: usize) -> Self {
        Self { parent: Some(parent), index }
    }
}

/// Ordered object hierarchy.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: HashMap<ObjectId, SceneObject>,
    roots: Vec<ObjectId>,
    resources: ResourceTracker,
}

impl IdentityResolver for SceneGraph {
    fn object_by_id(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from a scene document.
    ///
    /// The whole batch is inserted before this returns, so anything that
    /// resolves ids afterwards sees the finished graph.
    pub fn from_data(data: &SceneData) -> Result<Self> {
        let mut graph = Self::new();
        for node in &data.objects {
            let index = graph.roots.len();
            graph.insert(node.clone(), Placement::root(index))?;
        }
        Ok(graph)
    }

    /// Capture the whole graph as a document.
    pub fn to_data(&self) -> SceneData {
        SceneData {
            objects: self.roots.iter().map(|&id| self.capture(id)).collect(),
            ..SceneData::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object and release its resources.
    pub fn clear(&mut self) {
        let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        for id in ids {
            if let Some(object) = self.objects.remove(&id) {
                self.release_resources(&object);
            }
        }
        self.roots.clear();
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceTracker {
        &mut self.resources
    }

    /// Children of `parent`, or the root list for `None`.
    pub fn children_of(&self, parent: Option<ObjectId>) -> Result<&[ObjectId]> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => self
                .objects
                .get(&id)
                .map(|o| o.children.as_slice())
                .ok_or(SceneError::ObjectNotFound(id)),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ObjectId>) -> Result<&mut Vec<ObjectId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(id) => self
                .objects
                .get_mut(&id)
                .map(|o| &mut o.children)
                .ok_or(SceneError::ObjectNotFound(id)),
        }
    }

    /// Current parent and sibling index of an object.
    pub fn placement(&self, id: ObjectId) -> Result<Placement> {
        let object = self.objects.get(&id).ok_or(SceneError::ObjectNotFound(id))?;
        let index = self
            .children_of(object.parent)?
            .iter()
            .position(|&c| c == id)
            .ok_or(SceneError::ObjectNotFound(id))?;
        Ok(Placement { parent: object.parent, index })
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = self.objects.get(&id).and_then(|o| o.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.objects.get(&parent).and_then(|o| o.parent);
        }
        false
    }

    /// Append a single object under `parent`.
    pub fn add(&mut self, object: SceneObject, parent: Option<ObjectId>) -> Result<ObjectId> {
        let index = self.children_of(parent)?.len();
        let node = ObjectNode::from(object);
        self.insert(node, Placement { parent, index })
    }

    /// Insert a captured subtree at an exact position.
    ///
    /// Nothing is modified unless the whole subtree can be inserted.
    pub fn insert(&mut self, node: ObjectNode, placement: Placement) -> Result<ObjectId> {
        let len = self.children_of(placement.parent)?.len();
        if placement.index > len {
            return Err(SceneError::IndexOutOfRange { index: placement.index, len });
        }
        let ids = node.ids();
        for (i, id) in ids.iter().enumerate() {
            if self.objects.contains_key(id) || ids[..i].contains(id) {
                return Err(SceneError::DuplicateObject(*id));
            }
        }

        self.insert_subtree(&node, placement.parent);
        self.siblings_mut(placement.parent)?.insert(placement.index, node.id);
        Ok(node.id)
    }

    fn insert_subtree(&mut self, node: &ObjectNode, parent: Option<ObjectId>) {
        let mut object = node.to_object();
        object.parent = parent;
        object.children = node.children.iter().map(|c| c.id).collect();
        if object.geometry.is_some() {
            self.resources.attach(object.id, ResourceKind::Geometry);
        }
        if object.material.is_some() {
            self.resources.attach(object.id, ResourceKind::Material);
        }
        self.objects.insert(object.id, object);
        for child in &node.children {
            self.insert_subtree(child, Some(node.id));
        }
    }

    /// Capture an object's subtree by value without removing it.
    pub fn snapshot(&self, id: ObjectId) -> Result<ObjectNode> {
        if !self.objects.contains_key(&id) {
            return Err(SceneError::ObjectNotFound(id));
        }
        Ok(self.capture(id))
    }

    fn capture(&self, id: ObjectId) -> ObjectNode {
        let object = &self.objects[&id];
        let children = object
            .children
            .iter()
            .filter(|c| self.objects.contains_key(c))
            .map(|&c| self.capture(c))
            .collect();
        ObjectNode::from_object(object, children)
    }

    /// Remove an object and its subtree, returning both and where they were.
    pub fn remove(&mut self, id: ObjectId) -> Result<(ObjectNode, Placement)> {
        let placement = self.placement(id)?;
        let node = self.capture(id);
        self.siblings_mut(placement.parent)?.remove(placement.index);
        for removed in node.ids() {
            if let Some(object) = self.objects.remove(&removed) {
                self.release_resources(&object);
            }
        }
        Ok((node, placement))
    }

    /// Move an object to `index` among `parent`'s children.
    ///
    /// The index is interpreted after the object has left its old slot.
    /// Returns the previous placement.
    pub fn move_object(
        &mut self,
        id: ObjectId,
        parent: Option<ObjectId>,
        index: usize,
    ) -> Result<Placement> {
        let old = self.placement(id)?;
        if let Some(new_parent) = parent {
            if !self.objects.contains_key(&new_parent) {
                return Err(SceneError::ObjectNotFound(new_parent));
            }
            if new_parent == id || self.is_ancestor(id, new_parent) {
                return Err(SceneError::CyclicParent { object: id, parent: new_parent });
            }
        }
        let mut len = self.children_of(parent)?.len();
        if parent == old.parent {
            len -= 1;
        }
        if index > len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }

        self.siblings_mut(old.parent)?.remove(old.index);
        self.siblings_mut(parent)?.insert(index, id);
        if let Some(object) = self.objects.get_mut(&id) {
            object.parent = parent;
        }
        Ok(old)
    }

    /// Swap an object's geometry.
    ///
    /// The previous geometry's resources are released first, then bounds
    /// are recomputed for the new descriptor. Returns the old descriptor.
    pub fn set_geometry(&mut self, id: ObjectId, geometry: Option<Geometry>) -> Result<Option<Geometry>> {
        let had_geometry = self.object(id)?.geometry.is_some();
        if had_geometry {
            self.release(id, ResourceKind::Geometry);
        }
        let uploads = geometry.is_some();
        let previous = self.object_mut(id)?.replace_geometry(geometry);
        if uploads {
            self.resources.attach(id, ResourceKind::Geometry);
        }
        Ok(previous)
    }

    /// Swap an object's whole material, releasing the old one's resources.
    pub fn set_material(&mut self, id: ObjectId, material: Option<Material>) -> Result<Option<Material>> {
        let had_material = self.object(id)?.material.is_some();
        if had_material {
            self.release(id, ResourceKind::Material);
        }
        let uploads = material.is_some();
        let previous = self.object_mut(id)?.replace_material(material);
        if uploads {
            self.resources.attach(id, ResourceKind::Material);
        }
        Ok(previous)
    }

    pub fn property(&self, id: ObjectId, path: &str) -> Result<Option<PropertyValue>> {
        self.object(id)?.property(path)
    }

    pub fn set_property(&mut self, id: ObjectId, path: &str, value: Option<PropertyValue>) -> Result<()> {
        self.object_mut(id)?.set_property(path, value)
    }

    pub fn color(&self, id: ObjectId, path: &str) -> Result<Option<Color>> {
        self.object(id)?.color(path)
    }

    pub fn set_color(&mut self, id: ObjectId, path: &str, color: Option<Color>) -> Result<()> {
        self.object_mut(id)?.set_color(path, color)
    }

    pub fn map(&self, id: ObjectId, slot: &str) -> Result<Option<TextureRef>> {
        self.object(id)?.map(slot)
    }

    pub fn set_map(&mut self, id: ObjectId, slot: &str, texture: Option<TextureRef>) -> Result<()> {
        self.object_mut(id)?.set_map(slot, texture)
    }

    fn object(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects.get(&id).ok_or(SceneError::ObjectNotFound(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.objects.get_mut(&id).ok_or(SceneError::ObjectNotFound(id))
    }

    fn release_resources(&mut self, object: &SceneObject) {
        if object.geometry.is_some() {
            self.release(object.id, ResourceKind::Geometry);
        }
        if object.material.is_some() {
            self.release(object.id, ResourceKind::Material);
        }
    }

    /// Release failures leak the resource; the graph stays consistent.
    fn release(&mut self, id: ObjectId, kind: ResourceKind) {
        if let Err(e) = self.resources.detach(id, kind) {
            log::warn!("Failed to release {:?} of {}: {}", kind, id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::object::LightKind;

    fn sample() -> (SceneGraph, ObjectId, ObjectId, ObjectId) {
        let mut graph = SceneGraph::new();
        let a = graph.add(SceneObject::group("A"), None).unwrap();
        let b = graph
            .add(SceneObject::mesh("B", Geometry::cube(1.0), Material::default()), None)
            .unwrap();
        let c = graph.add(SceneObject::light("C", LightKind::Point), Some(a)).unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_add_and_placement() {
        let (graph, a, b, c) = sample();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.roots(), &[a, b]);
        assert_eq!(graph.placement(b).unwrap(), Placement::root(1));
        assert_eq!(graph.placement(c).unwrap(), Placement::under(a, 0));
        assert!(graph.contains(c));
        assert!(graph.is_ancestor(a, c));
    }

    #[test]
    fn test_remove_and_reinsert_at_same_index() {
        let (mut graph, a, b, _) = sample();
        let (node, placement) = graph.remove(a).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(node.len(), 2);
        assert_eq!(placement, Placement::root(0));
        assert_eq!(graph.roots(), &[b]);

        graph.insert(node, placement).unwrap();
        assert_eq!(graph.roots(), &[a, b]);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_insert_rejects_duplicates_and_bad_index() {
        let (mut graph, a, _, _) = sample();
        let snapshot = graph.snapshot(a).unwrap();
        assert_eq!(
            graph.insert(snapshot, Placement::root(0)),
            Err(SceneError::DuplicateObject(a))
        );

        let fresh = ObjectNode::from(SceneObject::group("D"));
        assert_eq!(
            graph.insert(fresh, Placement::root(7)),
            Err(SceneError::IndexOutOfRange { index: 7, len: 2 })
        );
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_move_object() {
        let (mut graph, a, b, c) = sample();
        let old = graph.move_object(b, Some(a), 0).unwrap();
        assert_eq!(old, Placement::root(1));
        assert_eq!(graph.children_of(Some(a)).unwrap(), &[b, c]);
        assert_eq!(graph.get(b).unwrap().parent(), Some(a));

        assert_eq!(
            graph.move_object(a, Some(c), 0),
            Err(SceneError::CyclicParent { object: a, parent: c })
        );
        // Same parent: index counts without the moving object
        graph.move_object(b, Some(a), 1).unwrap();
        assert_eq!(graph.children_of(Some(a)).unwrap(), &[c, b]);
    }

    #[test]
    fn test_set_geometry_swaps_resources_and_bounds() {
        let (mut graph, _, b, _) = sample();
        let before = graph.resources().handle(b, ResourceKind::Geometry).unwrap();

        let old = graph.set_geometry(b, Some(Geometry::sphere(2.0))).unwrap();
        assert_eq!(old, Some(Geometry::cube(1.0)));
        assert!(!graph.resources().is_live(before));
        let after = graph.resources().handle(b, ResourceKind::Geometry).unwrap();
        assert!(graph.resources().is_live(after));

        let object = graph.get(b).unwrap();
        assert_eq!(object.bounds().unwrap().max, [2.0, 2.0, 2.0]);
        assert!(object.is_pickable());
    }

    #[test]
    fn test_disposal_failure_is_not_fatal() {
        let (mut graph, _, b, _) = sample();
        let handle = graph.resources().handle(b, ResourceKind::Geometry).unwrap();
        graph.resources_mut().release(handle).unwrap();

        graph.set_geometry(b, Some(Geometry::sphere(1.0))).unwrap();
        assert_eq!(graph.get(b).unwrap().geometry(), Some(&Geometry::sphere(1.0)));
        assert_eq!(graph.resources().live_count_of(ResourceKind::Geometry), 1);
    }

    #[test]
    fn test_remove_releases_resources() {
        let (mut graph, _, b, _) = sample();
        assert_eq!(graph.resources().live_count(), 2);
        let (node, placement) = graph.remove(b).unwrap();
        assert_eq!(graph.resources().live_count(), 0);
        graph.insert(node, placement).unwrap();
        assert_eq!(graph.resources().live_count(), 2);
    }

    #[test]
    fn test_data_round_trip() {
        let (graph, a, b, c) = sample();
        let data = graph.to_data();
        assert_eq!(data.object_count(), 3);

        let rebuilt = SceneGraph::from_data(&data).unwrap();
        assert_eq!(rebuilt.roots(), &[a, b]);
        assert_eq!(rebuilt.get(c), graph.get(c));
        assert_eq!(rebuilt.get(b), graph.get(b));
    }
}
