//! Brush and tileset storage
//!
//! The catalog owns every brush and tileset and is the only place brushes are
//! mutated in ways that could break the nesting rules: an alias never targets
//! another alias, and an oriented brush never places another oriented brush
//! (directly or through an alias).

use crate::alias::revert_coalescing;
use crate::brush::{Brush, BrushKind, BrushProperties};
use crate::error::BrushError;
use crate::oriented::{OrientedBrush, Variation, WeightedVariation, MAX_VARIATIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tilepaint_core::{Tileset, UserFlagLabels};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrushCatalog {
    #[serde(default)]
    brushes: HashMap<Uuid, Brush>,
    #[serde(default)]
    tilesets: HashMap<Uuid, Tileset>,
    #[serde(default)]
    flag_labels: UserFlagLabels,
}

impl BrushCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Tilesets ───────────────────────────────────────────────────────────

    pub fn add_tileset(&mut self, tileset: Tileset) -> Uuid {
        let id = tileset.id;
        self.tilesets.insert(id, tileset);
        id
    }

    pub fn tileset(&self, id: Uuid) -> Option<&Tileset> {
        self.tilesets.get(&id)
    }

    pub fn tilesets(&self) -> impl Iterator<Item = &Tileset> {
        self.tilesets.values()
    }

    // ─── Brushes ────────────────────────────────────────────────────────────

    /// Add a brush after checking it against the nesting and tileset rules
    pub fn insert(&mut self, brush: Brush) -> Result<Uuid, BrushError> {
        if self.brushes.contains_key(&brush.id) {
            return Err(BrushError::DuplicateBrush(brush.id));
        }
        self.validate(&brush)?;
        let id = brush.id;
        self.brushes.insert(id, brush);
        Ok(id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Brush> {
        self.brushes.remove(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Brush> {
        self.brushes.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.brushes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }

    pub fn brushes(&self) -> impl Iterator<Item = &Brush> {
        self.brushes.values()
    }

    /// Brushes ordered by name, then id
    pub fn sorted_by_name(&self) -> Vec<&Brush> {
        let mut brushes: Vec<&Brush> = self.brushes.values().collect();
        brushes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        brushes
    }

    pub fn properties_mut(&mut self, id: Uuid) -> Result<&mut BrushProperties, BrushError> {
        self.brushes
            .get_mut(&id)
            .map(|brush| &mut brush.properties)
            .ok_or(BrushError::UnknownBrush(id))
    }

    pub(crate) fn brush(&self, id: Uuid) -> Result<&Brush, BrushError> {
        self.brushes.get(&id).ok_or(BrushError::UnknownBrush(id))
    }

    /// Oriented brush `id`, for editing its orientation list
    pub fn oriented_mut(&mut self, id: Uuid) -> Result<&mut OrientedBrush, BrushError> {
        match self.brushes.get_mut(&id).map(|brush| &mut brush.kind) {
            Some(BrushKind::Oriented(oriented)) => Ok(oriented),
            Some(_) => Err(BrushError::WrongKind {
                id,
                expected: "an oriented brush",
            }),
            None => Err(BrushError::UnknownBrush(id)),
        }
    }

    // ─── Validation ─────────────────────────────────────────────────────────

    fn validate(&self, brush: &Brush) -> Result<(), BrushError> {
        match &brush.kind {
            BrushKind::Empty => {}
            BrushKind::Tileset(tileset_brush) => {
                let tileset = self
                    .tileset(tileset_brush.tileset)
                    .ok_or(BrushError::UnknownTileset(tileset_brush.tileset))?;
                if !tileset.contains(tileset_brush.tile_index) {
                    return Err(BrushError::TileIndexOutOfRange {
                        index: tileset_brush.tile_index,
                        count: tileset.tile_count(),
                    });
                }
            }
            BrushKind::Autotile(autotile) => {
                let tileset = self
                    .tileset(autotile.tileset)
                    .ok_or(BrushError::UnknownTileset(autotile.tileset))?;
                if autotile.end_tile() > tileset.tile_count() {
                    return Err(BrushError::TileIndexOutOfRange {
                        index: autotile.end_tile() - 1,
                        count: tileset.tile_count(),
                    });
                }
            }
            BrushKind::Oriented(oriented) => {
                if oriented
                    .orientations()
                    .iter()
                    .any(|o| o.variation_count() > MAX_VARIATIONS)
                {
                    return Err(BrushError::TooManyVariations(MAX_VARIATIONS));
                }
                for variation in oriented.all_variations() {
                    self.check_variation(brush.id, variation)?;
                }
                // Nobody may already place this brush as a variation
                if self.brushes.values().any(|other| places_brush(other, brush.id)) {
                    return Err(BrushError::NestedOrientedBrush);
                }
                if self.aliases_targeting(brush.id).any(|alias| self.is_placed(alias)) {
                    return Err(BrushError::NestedOrientedBrush);
                }
            }
            BrushKind::Alias(alias) => {
                if let Some(target) = alias.target {
                    self.check_alias_target(brush.id, target)?;
                }
                if self.aliases_targeting(brush.id).next().is_some() {
                    return Err(BrushError::NestedAlias);
                }
                if self.is_placed(brush.id) && self.targets_oriented(alias.target) {
                    return Err(BrushError::NestedOrientedBrush);
                }
            }
        }
        Ok(())
    }

    fn check_alias_target(&self, alias: Uuid, target: Uuid) -> Result<(), BrushError> {
        if target == alias || self.get(target).is_some_and(Brush::is_alias) {
            return Err(BrushError::NestedAlias);
        }
        Ok(())
    }

    /// A variation may place templates and non-oriented brushes only
    fn check_variation(&self, oriented: Uuid, variation: &Variation) -> Result<(), BrushError> {
        let Variation::Brush(id) = *variation else {
            return Ok(());
        };
        if id == oriented {
            return Err(BrushError::NestedOrientedBrush);
        }
        let nested = self.brush(id)?;
        match &nested.kind {
            BrushKind::Oriented(_) => Err(BrushError::NestedOrientedBrush),
            BrushKind::Alias(alias) if self.targets_oriented(alias.target) || alias.target == Some(oriented) => {
                Err(BrushError::NestedOrientedBrush)
            }
            _ => Ok(()),
        }
    }

    fn targets_oriented(&self, target: Option<Uuid>) -> bool {
        target
            .and_then(|id| self.get(id))
            .is_some_and(Brush::is_oriented)
    }

    fn aliases_targeting(&self, target: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.brushes
            .values()
            .filter(move |b| b.as_alias().is_some_and(|a| a.target == Some(target)))
            .map(|b| b.id)
    }

    /// Whether any oriented brush places `id` as a variation
    fn is_placed(&self, id: Uuid) -> bool {
        self.brushes.values().any(|other| places_brush(other, id))
    }

    // ─── Guarded mutation ───────────────────────────────────────────────────

    /// Insert a variation into orientation `mask` of oriented brush `brush`
    /// and propagate it to the orientation's rotation group.
    pub fn insert_variation(
        &mut self,
        brush: Uuid,
        mask: u8,
        index: Option<usize>,
        variation: Variation,
        weight: u8,
    ) -> Result<(), BrushError> {
        let entry = WeightedVariation::new(variation, weight)?;
        self.oriented_mut(brush)?;
        self.check_variation(brush, &variation)?;

        let oriented = self.oriented_mut(brush)?;
        oriented.orientation_mut(mask)?.insert_variation(index, entry)?;
        oriented.sync_grouped_variations(mask)?;
        Ok(())
    }

    pub fn remove_variation(
        &mut self,
        brush: Uuid,
        mask: u8,
        index: usize,
    ) -> Result<WeightedVariation, BrushError> {
        let oriented = self.oriented_mut(brush)?;
        let removed = oriented.orientation_mut(mask)?.remove_variation(index)?;
        oriented.sync_grouped_variations(mask)?;
        Ok(removed)
    }

    pub fn set_variation_weight(
        &mut self,
        brush: Uuid,
        mask: u8,
        index: usize,
        weight: u8,
    ) -> Result<(), BrushError> {
        let oriented = self.oriented_mut(brush)?;
        oriented.orientation_mut(mask)?.set_variation_weight(index, weight)?;
        oriented.sync_grouped_variations(mask)?;
        Ok(())
    }

    /// Point alias `alias` at `target` (or clear it)
    pub fn set_alias_target(&mut self, alias: Uuid, target: Option<Uuid>) -> Result<(), BrushError> {
        if !self.brush(alias)?.is_alias() {
            return Err(BrushError::WrongKind {
                id: alias,
                expected: "an alias brush",
            });
        }
        if let Some(target) = target {
            self.check_alias_target(alias, target)?;
            if self.is_placed(alias) && self.targets_oriented(Some(target)) {
                return Err(BrushError::NestedOrientedBrush);
            }
        }
        if let Some(BrushKind::Alias(brush)) = self.brushes.get_mut(&alias).map(|b| &mut b.kind) {
            brush.target = target;
        }
        Ok(())
    }

    pub fn set_alias_overrides(
        &mut self,
        alias: Uuid,
        override_transforms: bool,
        override_flags: bool,
    ) -> Result<(), BrushError> {
        match self.brushes.get_mut(&alias).map(|b| &mut b.kind) {
            Some(BrushKind::Alias(brush)) => {
                brush.override_transforms = override_transforms;
                brush.override_flags = override_flags;
                Ok(())
            }
            Some(_) => Err(BrushError::WrongKind {
                id: alias,
                expected: "an alias brush",
            }),
            None => Err(BrushError::UnknownBrush(alias)),
        }
    }

    /// Copy coalescing settings from the alias's target onto the alias
    pub fn revert_alias_coalescing(&mut self, alias: Uuid) -> Result<(), BrushError> {
        let target = self
            .brush(alias)?
            .as_alias()
            .ok_or(BrushError::WrongKind {
                id: alias,
                expected: "an alias brush",
            })?
            .target;
        let Some(target) = target else {
            return Ok(());
        };
        let target_properties = self.brush(target)?.properties.clone();
        let properties = self.properties_mut(alias)?;
        revert_coalescing(properties, &target_properties);
        Ok(())
    }

    // ─── Flag labels ────────────────────────────────────────────────────────

    pub fn flag_labels(&self) -> &UserFlagLabels {
        &self.flag_labels
    }

    pub fn set_flag_labels(&mut self, labels: Vec<String>) -> Result<(), BrushError> {
        self.flag_labels = UserFlagLabels::new(labels)?;
        Ok(())
    }

    // ─── Serialization hooks ────────────────────────────────────────────────

    /// Flatten runtime caches into their persisted form
    pub fn before_serialize(&mut self) {
        for brush in self.brushes.values_mut() {
            brush.before_serialize();
        }
    }

    /// Rebuild runtime caches and migrate legacy fields after loading
    pub fn after_deserialize(&mut self) {
        for brush in self.brushes.values_mut() {
            brush.after_deserialize();
        }
    }
}

fn places_brush(brush: &Brush, id: Uuid) -> bool {
    brush
        .as_oriented()
        .is_some_and(|o| o.all_variations().any(|v| *v == Variation::Brush(id)))
}
