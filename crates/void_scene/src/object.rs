//! Scene objects and their leaf attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::geometry::{Aabb, Geometry};
use crate::id::ObjectId;
use crate::material::{Color, Material, TextureRef};

/// Light type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
    Spot,
    Hemisphere,
}

/// Camera projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    Perspective,
    Orthographic,
}

/// What an object is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Group,
    Mesh,
    Light { light: LightKind },
    Camera { camera: CameraKind },
    /// Particle systems, fire, water and similar effect objects
    Effect { effect: String },
}

impl ObjectKind {
    pub fn name(&self) -> &str {
        match self {
            ObjectKind::Group => "Group",
            ObjectKind::Mesh => "Mesh",
            ObjectKind::Light { .. } => "Light",
            ObjectKind::Camera { .. } => "Camera",
            ObjectKind::Effect { effect } => effect,
        }
    }
}

/// Local transform (position, Euler rotation in radians, scale).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Scalar or enum attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// Address of a leaf attribute: `intensity` lives on the object,
/// `material.opacity` on its material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributePath<'a> {
    Object(&'a str),
    Material(&'a str),
}

impl<'a> AttributePath<'a> {
    pub fn parse(path: &'a str) -> Self {
        match path.strip_prefix("material.") {
            Some(slot) => AttributePath::Material(slot),
            None => AttributePath::Object(path),
        }
    }
}

/// A node of the scene graph.
///
/// Hierarchy links and the geometry/bounds pair are only changed through
/// [`SceneGraph`](crate::SceneGraph), which keeps them consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub visible: bool,
    /// Scalar attributes (`intensity`, `castShadow`, `fov`, ...)
    pub properties: BTreeMap<String, PropertyValue>,
    /// Object-level colors (light `color`, hemisphere `groundColor`, ...)
    pub colors: BTreeMap<String, Color>,
    pub(crate) material: Option<Material>,
    pub(crate) geometry: Option<Geometry>,
    pub(crate) bounds: Option<Aabb>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
}

impl SceneObject {
    /// Create an object with a freshly allocated id.
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::with_id(ObjectId::new(), kind, name)
    }

    /// Create an object reusing a persistent id.
    pub fn with_id(id: ObjectId, kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            transform: Transform::new(),
            visible: true,
            properties: BTreeMap::new(),
            colors: BTreeMap::new(),
            material: None,
            geometry: None,
            bounds: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Group, name)
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::new(ObjectKind::Mesh, name)
            .with_geometry(geometry)
            .with_material(material)
    }

    pub fn light(name: impl Into<String>, light: LightKind) -> Self {
        Self::new(ObjectKind::Light { light }, name)
            .with_color("color", Color::WHITE)
            .with_property("intensity", 1.0)
    }

    pub fn camera(name: impl Into<String>, camera: CameraKind) -> Self {
        Self::new(ObjectKind::Camera { camera }, name)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_color(mut self, slot: impl Into<String>, color: Color) -> Self {
        self.colors.insert(slot.into(), color);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.replace_geometry(Some(geometry));
        self
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Cached local bounds of the current geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Whether picking can hit this object: visible, and either it has no
    /// geometry or its cached bounds match the geometry it carries.
    pub fn is_pickable(&self) -> bool {
        self.visible
            && match &self.geometry {
                Some(geometry) => self.bounds.is_some() && self.bounds == geometry.bounds(),
                None => true,
            }
    }

    /// Swap geometry and recompute bounds, returning the previous descriptor.
    pub(crate) fn replace_geometry(&mut self, geometry: Option<Geometry>) -> Option<Geometry> {
        let previous = std::mem::replace(&mut self.geometry, geometry);
        self.bounds = self.geometry.as_ref().and_then(Geometry::bounds);
        previous
    }

    pub(crate) fn replace_material(&mut self, material: Option<Material>) -> Option<Material> {
        std::mem::replace(&mut self.material, material)
    }

    /// Read a scalar attribute. `name` and `visible` are built in.
    pub fn property(&self, path: &str) -> Result<Option<PropertyValue>> {
        match AttributePath::parse(path) {
            AttributePath::Object("name") => Ok(Some(PropertyValue::Text(self.name.clone()))),
            AttributePath::Object("visible") => Ok(Some(PropertyValue::Bool(self.visible))),
            AttributePath::Object(name) => Ok(self.properties.get(name).cloned()),
            AttributePath::Material(slot) => Ok(self.material_ref()?.values.get(slot).cloned()),
        }
    }

    /// Write a scalar attribute; `None` removes it.
    pub fn set_property(&mut self, path: &str, value: Option<PropertyValue>) -> Result<()> {
        match AttributePath::parse(path) {
            AttributePath::Object("name") => match value {
                Some(PropertyValue::Text(name)) => self.name = name,
                _ => return Err(invalid(path, "expected text")),
            },
            AttributePath::Object("visible") => match value {
                Some(PropertyValue::Bool(visible)) => self.visible = visible,
                _ => return Err(invalid(path, "expected bool")),
            },
            AttributePath::Object(name) => set_or_remove(&mut self.properties, name, value),
            AttributePath::Material(slot) => {
                set_or_remove(&mut self.material_mut()?.values, slot, value)
            }
        }
        Ok(())
    }

    pub fn color(&self, path: &str) -> Result<Option<Color>> {
        match AttributePath::parse(path) {
            AttributePath::Object(slot) => Ok(self.colors.get(slot).copied()),
            AttributePath::Material(slot) => Ok(self.material_ref()?.colors.get(slot).copied()),
        }
    }

    pub fn set_color(&mut self, path: &str, color: Option<Color>) -> Result<()> {
        match AttributePath::parse(path) {
            AttributePath::Object(slot) => set_or_remove(&mut self.colors, slot, color),
            AttributePath::Material(slot) => {
                set_or_remove(&mut self.material_mut()?.colors, slot, color)
            }
        }
        Ok(())
    }

    /// Texture bound to a material slot.
    pub fn map(&self, slot: &str) -> Result<Option<TextureRef>> {
        Ok(self.material_ref()?.maps.get(slot).cloned())
    }

    pub fn set_map(&mut self, slot: &str, texture: Option<TextureRef>) -> Result<()> {
        set_or_remove(&mut self.material_mut()?.maps, slot, texture);
        Ok(())
    }

    fn material_ref(&self) -> Result<&Material> {
        self.material.as_ref().ok_or(SceneError::MissingMaterial(self.id))
    }

    pub(crate) fn material_mut(&mut self) -> Result<&mut Material> {
        let id = self.id;
        self.material.as_mut().ok_or(SceneError::MissingMaterial(id))
    }
}

fn set_or_remove<V>(map: &mut BTreeMap<String, V>, key: &str, value: Option<V>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), value);
        }
        None => {
            map.remove(key);
        }
    }
}

fn invalid(attribute: &str, reason: &str) -> SceneError {
    SceneError::InvalidValue {
        attribute: attribute.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_path_parse() {
        assert_eq!(AttributePath::parse("intensity"), AttributePath::Object("intensity"));
        assert_eq!(AttributePath::parse("material.opacity"), AttributePath::Material("opacity"));
    }

    #[test]
    fn test_builtin_properties() {
        let mut obj = SceneObject::group("Root");
        assert_eq!(obj.property("name").unwrap(), Some(PropertyValue::from("Root")));

        obj.set_property("visible", Some(false.into())).unwrap();
        assert!(!obj.visible);
        assert!(obj.set_property("visible", Some(PropertyValue::Float(1.0))).is_err());
        assert!(obj.set_property("name", None).is_err());
    }

    #[test]
    fn test_property_remove() {
        let mut obj = SceneObject::light("Sun", LightKind::Directional);
        assert_eq!(obj.property("intensity").unwrap(), Some(PropertyValue::Float(1.0)));
        obj.set_property("intensity", None).unwrap();
        assert_eq!(obj.property("intensity").unwrap(), None);
    }

    #[test]
    fn test_material_path_requires_material() {
        let mut obj = SceneObject::group("Empty");
        assert_eq!(
            obj.property("material.opacity"),
            Err(SceneError::MissingMaterial(obj.id))
        );
        assert!(obj.set_color("material.color", Some(Color::BLACK)).is_err());
    }

    #[test]
    fn test_geometry_keeps_bounds_in_sync() {
        let mut obj = SceneObject::mesh("Box", Geometry::cube(2.0), Material::default());
        assert!(obj.is_pickable());
        assert_eq!(obj.bounds().unwrap().max, [1.0, 1.0, 1.0]);

        let old = obj.replace_geometry(Some(Geometry::sphere(3.0)));
        assert_eq!(old, Some(Geometry::cube(2.0)));
        assert_eq!(obj.bounds().unwrap().max, [3.0, 3.0, 3.0]);
        assert!(obj.is_pickable());
    }

    #[test]
    fn test_property_value_untagged() {
        let v: PropertyValue = serde_json::from_str("0.5").unwrap();
        assert_eq!(v, PropertyValue::Float(0.5));
        let v: PropertyValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, PropertyValue::Int(3));
        let v: PropertyValue = serde_json::from_str("\"hi\"").unwrap();
        assert_eq!(v.as_str(), Some("hi"));
    }
}
