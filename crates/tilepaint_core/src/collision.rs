//! Collider data for painted tiles
//!
//! This module provides the plain collision types shared by the engine and
//! the collider reducer:
//! - `Bounds` - Axis-aligned box with corner-coincidence tests
//! - `ColliderKind` - 2D or 3D box collider
//! - `TileCollider` - A tile's box collider and the properties that decide
//!   whether two colliders may be merged

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Axis-aligned bounding box in grid-local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: [f32; 3],
    pub size: [f32; 3],
}

impl Bounds {
    pub fn new(center: [f32; 3], size: [f32; 3]) -> Self {
        Self { center, size }
    }

    pub fn from_min_max(min: [f32; 3], max: [f32; 3]) -> Self {
        let mut center = [0.0; 3];
        let mut size = [0.0; 3];
        for i in 0..3 {
            center[i] = (min[i] + max[i]) * 0.5;
            size[i] = max[i] - min[i];
        }
        Self { center, size }
    }

    pub fn min(&self) -> [f32; 3] {
        [
            self.center[0] - self.size[0] * 0.5,
            self.center[1] - self.size[1] * 0.5,
            self.center[2] - self.size[2] * 0.5,
        ]
    }

    pub fn max(&self) -> [f32; 3] {
        [
            self.center[0] + self.size[0] * 0.5,
            self.center[1] + self.size[1] * 0.5,
            self.center[2] + self.size[2] * 0.5,
        ]
    }

    /// The 8 corners (degenerate boxes repeat corners)
    pub fn corners(&self) -> [[f32; 3]; 8] {
        let (min, max) = (self.min(), self.max());
        let mut corners = [[0.0; 3]; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = [
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ];
        }
        corners
    }

    /// Smallest box containing both `self` and `other`
    pub fn encapsulate(&self, other: &Bounds) -> Bounds {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for i in 0..3 {
            min[i] = a_min[i].min(b_min[i]);
            max[i] = a_max[i].max(b_max[i]);
        }
        Bounds::from_min_max(min, max)
    }

    /// Number of `other`'s corners lying on one of `self`'s corners
    pub fn coincident_corner_count(&self, other: &Bounds, threshold: f32) -> usize {
        let ours = self.corners();
        other
            .corners()
            .iter()
            .filter(|b| ours.iter().any(|a| points_coincide(a, b, threshold)))
            .count()
    }

    /// Two boxes merge only when they are face-adjacent and the same size
    /// across the shared face: exactly 4 corners coincide.
    pub fn can_merge_with(&self, other: &Bounds, threshold: f32) -> bool {
        self.coincident_corner_count(other, threshold) == 4
    }

    /// Component-wise comparison within `threshold`
    pub fn approx_eq(&self, other: &Bounds, threshold: f32) -> bool {
        points_coincide(&self.min(), &other.min(), threshold)
            && points_coincide(&self.max(), &other.max(), threshold)
    }
}

fn points_coincide(a: &[f32; 3], b: &[f32; 3], threshold: f32) -> bool {
    (0..3).all(|i| (a[i] - b[i]).abs() <= threshold)
}

/// Collider shape family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ColliderKind {
    Box2D,
    #[default]
    Box3D,
}

impl ColliderKind {
    /// Get the display name of this collider kind
    pub fn name(&self) -> &'static str {
        match self {
            ColliderKind::Box2D => "Box 2D",
            ColliderKind::Box3D => "Box 3D",
        }
    }
}

/// A box collider attached to (or implied by) a tile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileCollider {
    #[serde(default)]
    pub kind: ColliderKind,
    #[serde(default)]
    pub is_trigger: bool,
    /// Physics material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub layer: u8,
    pub bounds: Bounds,
}

impl TileCollider {
    /// Create a solid, non-trigger collider with the given bounds
    pub fn new(kind: ColliderKind, bounds: Bounds) -> Self {
        Self {
            kind,
            is_trigger: false,
            material: None,
            tag: None,
            layer: 0,
            bounds,
        }
    }

    pub fn with_material(mut self, material: Uuid) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    /// Same kind, trigger state and physics material
    pub fn is_compatible_with(&self, other: &TileCollider) -> bool {
        self.kind == other.kind && self.is_trigger == other.is_trigger && self.material == other.material
    }
}
