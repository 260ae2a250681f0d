//! The brush sum type and the properties every brush carries

use crate::alias::AliasBrush;
use crate::oriented::OrientedBrush;
use crate::tileset_brush::{AutotileBrush, TilesetBrush};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tilepaint_core::ContentOverrides;
use uuid::Uuid;

/// Which neighbouring tiles count as connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Coalesce {
    None,
    /// Tiles painted with the same brush
    #[default]
    Own,
    /// Tiles painted with any other brush
    Other,
    /// Any painted tile
    OwnAndOther,
    /// Tiles whose brush belongs to one of the coalescing groups
    Groups,
    OwnAndGroups,
}

/// Coalescing settings of a brush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoalescingRules {
    #[serde(default)]
    pub coalesce: Coalesce,
    /// Persisted form of the group set, written by `before_serialize`
    #[serde(default)]
    groups: Vec<i32>,
    /// Single group written by older versions
    #[serde(default, rename = "coalescing_group", skip_serializing)]
    legacy_group: Option<i32>,
    /// Tiles painted with a different rotation still connect
    #[serde(default = "default_true")]
    pub with_rotated: bool,
    /// Cells beyond the grid edge connect
    #[serde(default)]
    pub with_border: bool,
    #[serde(skip)]
    group_set: HashSet<i32>,
}

fn default_true() -> bool {
    true
}

impl Default for CoalescingRules {
    fn default() -> Self {
        Self {
            coalesce: Coalesce::default(),
            groups: Vec::new(),
            legacy_group: None,
            with_rotated: true,
            with_border: false,
            group_set: HashSet::new(),
        }
    }
}

impl CoalescingRules {
    pub fn new(coalesce: Coalesce) -> Self {
        Self {
            coalesce,
            ..Self::default()
        }
    }

    pub fn add_group(&mut self, group: i32) -> bool {
        self.group_set.insert(group)
    }

    pub fn remove_group(&mut self, group: i32) -> bool {
        self.group_set.remove(&group)
    }

    pub fn has_group(&self, group: i32) -> bool {
        self.group_set.contains(&group)
    }

    /// Groups in ascending order
    pub fn groups(&self) -> Vec<i32> {
        let mut groups: Vec<i32> = self.group_set.iter().copied().collect();
        groups.sort_unstable();
        groups
    }

    /// Flatten the group set into its persisted array
    pub fn before_serialize(&mut self) {
        self.groups = self.groups();
    }

    /// Rebuild the group set, folding in the legacy single-group field
    pub fn after_deserialize(&mut self) {
        if let Some(group) = self.legacy_group.take() {
            if !self.groups.contains(&group) {
                self.groups.push(group);
            }
        }
        self.group_set = self.groups.iter().copied().collect();
    }
}

/// How instantiated content is scaled
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "scale")]
pub enum ScaleMode {
    /// Keep the template's own scale
    #[default]
    DontTouch,
    /// Scale to the grid's cell size
    UseCellSize,
    Custom([f32; 3]),
}

/// Placement of content within its cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    #[serde(default)]
    pub scale_mode: ScaleMode,
    /// Offset from the cell centre
    #[serde(default)]
    pub offset: [f32; 3],
    /// Use the template's stored scale under `ScaleMode::DontTouch`
    #[serde(default)]
    pub apply_prefab_transform: bool,
    #[serde(default = "unit_scale")]
    pub prefab_scale: [f32; 3],
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::default(),
            offset: [0.0; 3],
            apply_prefab_transform: false,
            prefab_scale: unit_scale(),
        }
    }
}

/// Settings shared by every brush kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrushProperties {
    /// Group this brush belongs to for `Coalesce::Groups`
    #[serde(default)]
    pub group: i32,
    #[serde(default)]
    pub coalescing: CoalescingRules,
    /// User flags copied onto painted tiles
    #[serde(default)]
    pub user_flags: u16,
    #[serde(default)]
    pub solid: bool,
    /// Tiles never move at runtime, making their colliders reducible
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub transform: TransformSettings,
    #[serde(default)]
    pub overrides: ContentOverrides,
}

/// Brush variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BrushKind {
    /// Paints nothing but still occupies the cell
    Empty,
    Tileset(TilesetBrush),
    Autotile(AutotileBrush),
    Oriented(OrientedBrush),
    Alias(AliasBrush),
}

impl BrushKind {
    pub fn name(&self) -> &'static str {
        match self {
            BrushKind::Empty => "an empty brush",
            BrushKind::Tileset(_) => "a tileset brush",
            BrushKind::Autotile(_) => "an autotile brush",
            BrushKind::Oriented(_) => "an oriented brush",
            BrushKind::Alias(_) => "an alias brush",
        }
    }
}

/// A reusable template deciding what a painted cell receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: BrushProperties,
    pub kind: BrushKind,
}

impl Brush {
    pub fn new(name: impl Into<String>, kind: BrushKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            properties: BrushProperties::default(),
            kind,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, BrushKind::Empty)
    }

    pub fn tileset(name: impl Into<String>, brush: TilesetBrush) -> Self {
        Self::new(name, BrushKind::Tileset(brush))
    }

    pub fn autotile(name: impl Into<String>, brush: AutotileBrush) -> Self {
        Self::new(name, BrushKind::Autotile(brush))
    }

    pub fn oriented(name: impl Into<String>, brush: OrientedBrush) -> Self {
        Self::new(name, BrushKind::Oriented(brush))
    }

    pub fn alias(name: impl Into<String>, target: Uuid) -> Self {
        Self::new(name, BrushKind::Alias(AliasBrush::new(target)))
    }

    pub fn with_properties(mut self, properties: BrushProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn as_oriented(&self) -> Option<&OrientedBrush> {
        match &self.kind {
            BrushKind::Oriented(oriented) => Some(oriented),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasBrush> {
        match &self.kind {
            BrushKind::Alias(alias) => Some(alias),
            _ => None,
        }
    }

    pub fn is_oriented(&self) -> bool {
        matches!(self.kind, BrushKind::Oriented(_))
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.kind, BrushKind::Alias(_))
    }

    pub(crate) fn before_serialize(&mut self) {
        self.properties.coalescing.before_serialize();
    }

    pub(crate) fn after_deserialize(&mut self) {
        self.properties.coalescing.after_deserialize();
        if let BrushKind::Oriented(oriented) = &mut self.kind {
            oriented.after_deserialize();
        }
    }
}
