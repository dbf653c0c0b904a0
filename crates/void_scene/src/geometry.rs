//! Geometry descriptors and their derived bounds.
//!
//! Geometry is kept in parametric form whenever the editor created it from
//! a primitive, and as baked vertex buffers otherwise. Either way the
//! descriptor is plain data, so commands can capture it by value.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Box centered on the origin with the given half extents.
    pub fn centered(half: [f32; 3]) -> Self {
        Self {
            min: [-half[0], -half[1], -half[2]],
            max: half,
        }
    }

    /// Smallest box containing all points, or `None` for an empty set.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for p in rest {
            for axis in 0..3 {
                aabb.min[axis] = aabb.min[axis].min(p[axis]);
                aabb.max[axis] = aabb.max[axis].max(p[axis]);
            }
        }
        Some(aabb)
    }
}

/// Baked vertex data for geometry without a parametric form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferGeometry {
    pub positions: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<u32>,
}

/// Full geometry descriptor of a mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Plane {
        width: f32,
        height: f32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Buffer(BufferGeometry),
}

impl Geometry {
    pub fn cube(size: f32) -> Self {
        Geometry::Box { width: size, height: size, depth: size }
    }

    pub fn sphere(radius: f32) -> Self {
        Geometry::Sphere { radius, width_segments: 32, height_segments: 16 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Geometry::Box { .. } => "Box",
            Geometry::Sphere { .. } => "Sphere",
            Geometry::Cylinder { .. } => "Cylinder",
            Geometry::Plane { .. } => "Plane",
            Geometry::Torus { .. } => "Torus",
            Geometry::Buffer(_) => "Buffer",
        }
    }

    pub fn is_parametric(&self) -> bool {
        !matches!(self, Geometry::Buffer(_))
    }

    /// Local-space bounds. `None` for an empty buffer.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Geometry::Box { width, height, depth } => {
                Some(Aabb::centered([width * 0.5, height * 0.5, depth * 0.5]))
            }
            Geometry::Sphere { radius, .. } => Some(Aabb::centered([*radius; 3])),
            Geometry::Cylinder { radius_top, radius_bottom, height, .. } => {
                let r = radius_top.max(*radius_bottom);
                Some(Aabb::centered([r, height * 0.5, r]))
            }
            Geometry::Plane { width, height } => {
                Some(Aabb::centered([width * 0.5, height * 0.5, 0.0]))
            }
            // Lies in the XY plane, like the primitive it mirrors.
            Geometry::Torus { radius, tube, .. } => {
                Some(Aabb::centered([radius + tube, radius + tube, *tube]))
            }
            Geometry::Buffer(buffer) => Aabb::from_points(&buffer.positions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_bounds() {
        let b = Geometry::Box { width: 2.0, height: 4.0, depth: 6.0 }.bounds().unwrap();
        assert_eq!(b.min, [-1.0, -2.0, -3.0]);
        assert_eq!(b.max, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_buffer_bounds() {
        let geometry = Geometry::Buffer(BufferGeometry {
            positions: vec![[0.0, 1.0, 2.0], [-1.0, 5.0, 0.5]],
            indices: Vec::new(),
        });
        let b = geometry.bounds().unwrap();
        assert_eq!(b.min, [-1.0, 1.0, 0.5]);
        assert_eq!(b.max, [0.0, 5.0, 2.0]);
        assert!(!geometry.is_parametric());

        assert!(Geometry::Buffer(BufferGeometry::default()).bounds().is_none());
    }

    #[test]
    fn test_sphere_bounds() {
        let b = Geometry::sphere(1.0).bounds().unwrap();
        assert_eq!(b, Aabb::centered([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_geometry_serde_tag() {
        let json = serde_json::to_value(Geometry::cube(1.0)).unwrap();
        assert_eq!(json["type"], "box");
        let buffer = Geometry::Buffer(BufferGeometry {
            positions: vec![[1.0, 2.0, 3.0]],
            indices: vec![0],
        });
        let json = serde_json::to_string(&buffer).unwrap();
        let back: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buffer);
    }
}
