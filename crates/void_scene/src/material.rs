//! Materials, colors and texture references.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::id::TextureId;
use crate::object::PropertyValue;

/// RGB color in canonical `0xRRGGBB` form.
///
/// Stored and serialized as an integer so edits round-trip without the
/// precision loss of a display string or float triple. Deserializing
/// rejects anything wider than 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(u32);

impl Color {
    pub const WHITE: Color = Color(0xffffff);
    pub const BLACK: Color = Color(0x000000);

    /// Create from a hex value; bits above 24 are dropped.
    pub const fn from_hex(hex: u32) -> Self {
        Self(hex & 0x00ff_ffff)
    }

    /// Create from normalized RGB components.
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        Self((channel(r) << 16) | (channel(g) << 8) | channel(b))
    }

    pub const fn hex(&self) -> u32 {
        self.0
    }

    /// Normalized RGB components.
    pub fn to_rgb(&self) -> [f32; 3] {
        [
            ((self.0 >> 16) & 0xff) as f32 / 255.0,
            ((self.0 >> 8) & 0xff) as f32 / 255.0,
            (self.0 & 0xff) as f32 / 255.0,
        ]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:06x})", self.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = u32::deserialize(deserializer)?;
        if hex > 0x00ff_ffff {
            return Err(de::Error::custom(format!("color {:#x} is not 0xRRGGBB", hex)));
        }
        Ok(Self(hex))
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

/// Reference to a texture by identity. Pixel data never travels with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureRef {
    pub id: TextureId,
    /// Source file the texture was imported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl TextureRef {
    pub fn new(id: TextureId) -> Self {
        Self { id, source_file: None }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_file = Some(source.into());
        self
    }
}

/// Shading model of a material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Basic,
    Lambert,
    Phong,
    #[default]
    Standard,
    Physical,
}

/// Surface material of a mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub kind: MaterialKind,
    /// Color slots (`color`, `emissive`, `specular`, ...)
    #[serde(default)]
    pub colors: BTreeMap<String, Color>,
    /// Scalar slots (`opacity`, `roughness`, `transparent`, ...)
    #[serde(default)]
    pub values: BTreeMap<String, PropertyValue>,
    /// Texture slots (`map`, `normalMap`, ...)
    #[serde(default)]
    pub maps: BTreeMap<String, TextureRef>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new(MaterialKind::Standard)
    }
}

impl Material {
    /// Create a material with the usual defaults for its kind.
    pub fn new(kind: MaterialKind) -> Self {
        let mut material = Self {
            kind,
            colors: BTreeMap::new(),
            values: BTreeMap::new(),
            maps: BTreeMap::new(),
        };
        material.colors.insert("color".to_string(), Color::WHITE);
        material.values.insert("opacity".to_string(), PropertyValue::Float(1.0));
        material.values.insert("transparent".to_string(), PropertyValue::Bool(false));
        if matches!(kind, MaterialKind::Standard | MaterialKind::Physical) {
            material.colors.insert("emissive".to_string(), Color::BLACK);
            material.values.insert("roughness".to_string(), PropertyValue::Float(1.0));
            material.values.insert("metalness".to_string(), PropertyValue::Float(0.0));
        }
        material
    }

    pub fn with_color(mut self, slot: impl Into<String>, color: Color) -> Self {
        self.colors.insert(slot.into(), color);
        self
    }

    pub fn with_value(mut self, slot: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(slot.into(), value.into());
        self
    }

    pub fn with_map(mut self, slot: impl Into<String>, texture: TextureRef) -> Self {
        self.maps.insert(slot.into(), texture);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_and_display() {
        let c = Color::from_hex(0xff8000);
        assert_eq!(c.hex(), 0xff8000);
        assert_eq!(c.to_string(), "#ff8000");
        assert_eq!(Color::from_hex(0x12ff0000).hex(), 0xff0000);
    }

    #[test]
    fn test_color_from_rgb() {
        assert_eq!(Color::from_rgb(1.0, 0.0, 0.0), Color::from_hex(0xff0000));
        assert_eq!(Color::from_rgb(0.0, 1.0, 0.0).to_rgb(), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_color_serializes_as_number() {
        let json = serde_json::to_string(&Color::from_hex(0x00ff00)).unwrap();
        assert_eq!(json, "65280");
        assert_eq!(serde_json::from_str::<Color>("65280").unwrap(), Color::from_hex(0x00ff00));
    }

    #[test]
    fn test_color_rejects_wide_values() {
        assert!(serde_json::from_str::<Color>("3735928559").is_err());
        assert!(serde_json::from_str::<Color>("16777216").is_err());
        assert_eq!(serde_json::from_str::<Color>("16777215").unwrap(), Color::WHITE);
    }

    #[test]
    fn test_standard_material_defaults() {
        let m = Material::default();
        assert_eq!(m.colors.get("color"), Some(&Color::WHITE));
        assert_eq!(m.values.get("opacity"), Some(&PropertyValue::Float(1.0)));
        assert!(m.colors.contains_key("emissive"));
        assert!(m.maps.is_empty());

        let basic = Material::new(MaterialKind::Basic);
        assert!(!basic.values.contains_key("roughness"));
    }
}
