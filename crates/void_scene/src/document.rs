//! Serializable scene documents.
//!
//! An [`ObjectNode`] is a subtree captured by value: the object, every
//! leaf attribute and its children in order. Commands use it to reinsert
//! removed objects exactly, and [`SceneData`] uses it for whole scenes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::id::ObjectId;
use crate::material::{Color, Material};
use crate::object::{ObjectKind, PropertyValue, SceneObject, Transform};

/// Scene file data structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default = "default_version")]
    pub version: String,
    /// Root objects in order, each with its subtree
    #[serde(default)]
    pub objects: Vec<ObjectNode>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for SceneData {
    fn default() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
        }
    }
}

impl SceneData {
    /// Total object count including descendants.
    pub fn object_count(&self) -> usize {
        self.objects.iter().map(ObjectNode::len).sum()
    }
}

/// An object and its descendants, by value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNode {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub colors: BTreeMap<String, Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ObjectNode>,
}

fn default_visible() -> bool {
    true
}

impl ObjectNode {
    /// Capture a single object with the given child nodes.
    pub fn from_object(object: &SceneObject, children: Vec<ObjectNode>) -> Self {
        Self {
            id: object.id,
            name: object.name.clone(),
            kind: object.kind.clone(),
            transform: object.transform,
            visible: object.visible,
            properties: object.properties.clone(),
            colors: object.colors.clone(),
            material: object.material.clone(),
            geometry: object.geometry.clone(),
            children,
        }
    }

    /// Rebuild the object this node describes, without hierarchy links.
    pub fn to_object(&self) -> SceneObject {
        let mut object = SceneObject::with_id(self.id, self.kind.clone(), self.name.clone());
        object.transform = self.transform;
        object.visible = self.visible;
        object.properties = self.properties.clone();
        object.colors = self.colors.clone();
        object.material = self.material.clone();
        object.replace_geometry(self.geometry.clone());
        object
    }

    /// Number of objects in this subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ObjectNode::len).sum::<usize>()
    }

    /// Ids of this subtree in pre-order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::with_capacity(self.len());
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<ObjectId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Find a node in this subtree.
    pub fn find(&self, id: ObjectId) -> Option<&ObjectNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

impl From<SceneObject> for ObjectNode {
    fn from(object: SceneObject) -> Self {
        Self::from_object(&object, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::LightKind;

    fn tree() -> ObjectNode {
        let mut root = ObjectNode::from(SceneObject::group("Root"));
        let mut arm = ObjectNode::from(SceneObject::group("Arm"));
        arm.children.push(ObjectNode::from(SceneObject::light("Lamp", LightKind::Point)));
        root.children.push(arm);
        root.children.push(ObjectNode::from(SceneObject::group("Leg")));
        root
    }

    #[test]
    fn test_subtree_len_and_ids() {
        let root = tree();
        assert_eq!(root.len(), 4);
        let ids = root.ids();
        assert_eq!(ids[0], root.id);
        assert_eq!(ids[1], root.children[0].id);
        assert_eq!(ids[2], root.children[0].children[0].id);
    }

    #[test]
    fn test_find() {
        let root = tree();
        let lamp = root.children[0].children[0].id;
        assert_eq!(root.find(lamp).map(|n| n.name.as_str()), Some("Lamp"));
        assert!(root.find(ObjectId::new()).is_none());
    }

    #[test]
    fn test_node_json_round_trip() {
        let root = tree();
        let json = serde_json::to_string(&root).unwrap();
        let back: ObjectNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn test_to_object_recomputes_bounds() {
        let mesh = SceneObject::mesh("Box", Geometry::cube(2.0), Material::default());
        let node = ObjectNode::from(mesh.clone());
        let rebuilt = node.to_object();
        assert_eq!(rebuilt, mesh);
        assert!(rebuilt.bounds().is_some());
    }
}
