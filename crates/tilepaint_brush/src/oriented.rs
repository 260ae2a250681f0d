//! Oriented brushes
//!
//! An [`OrientedBrush`] maps neighbour masks to [`BrushOrientation`]s, each of
//! which lists weighted variations. Painting resolves the requested mask to
//! the closest defined orientation according to the brush's [`FallbackMode`],
//! then picks one variation.

use crate::error::BrushError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tilepaint_core::orientation::{
    count_strong_connections, count_weak_connections, masks_with_rotational_symmetry, ISOLATED,
};
use uuid::Uuid;

/// Highest weight a variation may carry
pub const MAX_VARIATION_WEIGHT: u8 = 100;

/// Most variations one orientation may list; tile records store the index as a `u8`
pub const MAX_VARIATIONS: usize = u8::MAX as usize + 1;

/// Content an orientation may place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum Variation {
    /// External content template, instantiated by the content factory
    Template(Uuid),
    /// Another brush (never an oriented brush)
    Brush(Uuid),
}

/// A variation together with its selection weight (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedVariation {
    pub variation: Variation,
    pub weight: u8,
}

impl WeightedVariation {
    pub fn new(variation: Variation, weight: u8) -> Result<Self, BrushError> {
        if weight > MAX_VARIATION_WEIGHT {
            return Err(BrushError::InvalidWeight(weight));
        }
        Ok(Self { variation, weight })
    }
}

/// Content for one neighbour pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushOrientation {
    mask: u8,
    /// Linked to the other rotations of its pattern
    #[serde(default)]
    has_rotational_symmetry: bool,
    /// Quarter turns from the pattern the group was authored with
    #[serde(default)]
    rotation_index: u8,
    #[serde(default)]
    variations: Vec<WeightedVariation>,
}

impl BrushOrientation {
    fn new(mask: u8, has_rotational_symmetry: bool, rotation_index: u8) -> Self {
        Self {
            mask,
            has_rotational_symmetry,
            rotation_index,
            variations: Vec::new(),
        }
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn has_rotational_symmetry(&self) -> bool {
        self.has_rotational_symmetry
    }

    pub fn rotation_index(&self) -> u8 {
        self.rotation_index
    }

    pub fn variations(&self) -> &[WeightedVariation] {
        &self.variations
    }

    pub fn variation_count(&self) -> usize {
        self.variations.len()
    }

    pub fn variation(&self, index: usize) -> Option<&WeightedVariation> {
        self.variations.get(index)
    }

    pub fn contains(&self, variation: &Variation) -> bool {
        self.variations.iter().any(|v| v.variation == *variation)
    }

    pub fn index_of(&self, variation: &Variation) -> Option<usize> {
        self.variations.iter().position(|v| v.variation == *variation)
    }

    /// Insert at `index`, or append when `index` is `None`
    pub(crate) fn insert_variation(
        &mut self,
        index: Option<usize>,
        variation: WeightedVariation,
    ) -> Result<(), BrushError> {
        if self.contains(&variation.variation) {
            return Err(BrushError::DuplicateVariation);
        }
        let count = self.variations.len();
        if count >= MAX_VARIATIONS {
            return Err(BrushError::TooManyVariations(MAX_VARIATIONS));
        }
        match index {
            Some(index) if index > count => Err(BrushError::VariationIndexOutOfRange { index, count }),
            Some(index) => {
                self.variations.insert(index, variation);
                Ok(())
            }
            None => {
                self.variations.push(variation);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_variation(&mut self, index: usize) -> Result<WeightedVariation, BrushError> {
        let count = self.variations.len();
        if index >= count {
            return Err(BrushError::VariationIndexOutOfRange { index, count });
        }
        Ok(self.variations.remove(index))
    }

    pub(crate) fn set_variation_weight(&mut self, index: usize, weight: u8) -> Result<(), BrushError> {
        if weight > MAX_VARIATION_WEIGHT {
            return Err(BrushError::InvalidWeight(weight));
        }
        let count = self.variations.len();
        let entry = self
            .variations
            .get_mut(index)
            .ok_or(BrushError::VariationIndexOutOfRange { index, count })?;
        entry.weight = weight;
        Ok(())
    }
}

/// How a mask without an exact orientation is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackMode {
    /// Best strong match agreeing on at least 2 sides, weak bits break ties
    #[default]
    NextBest,
    /// Only orientations agreeing on all 4 sides, else the default orientation
    UseDefault,
    /// Only orientations agreeing on all 8 neighbours, else the default orientation
    UseDefaultStrict,
}

/// Direct-index table from mask to orientation slot.
///
/// Rebuilt explicitly after every change to the orientation list. While
/// dirty, lookups answer `None` and callers scan the list instead.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationLookup {
    table: Vec<Option<u16>>,
    dirty: bool,
}

impl Default for OrientationLookup {
    fn default() -> Self {
        Self {
            table: vec![None; 256],
            dirty: true,
        }
    }
}

impl OrientationLookup {
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn rebuild(&mut self, orientations: &[BrushOrientation]) {
        self.table.iter_mut().for_each(|slot| *slot = None);
        for (index, orientation) in orientations.iter().enumerate() {
            self.table[orientation.mask as usize] = Some(index as u16);
        }
        self.dirty = false;
    }

    fn get(&self, mask: u8) -> Option<Option<usize>> {
        if self.dirty {
            return None;
        }
        Some(self.table[mask as usize].map(usize::from))
    }
}

/// Weighted random pick over `variations`.
///
/// Zero-weight entries are never picked while any entry has a positive
/// weight. When every weight is zero the last entry is returned.
pub fn pick_random_variation_index(
    variations: &[WeightedVariation],
    rng: &mut impl Rng,
) -> Option<usize> {
    if variations.is_empty() {
        return None;
    }

    let total: u32 = variations.iter().map(|v| v.weight as u32).sum();
    if total == 0 {
        return Some(variations.len() - 1);
    }

    let mut pick = rng.gen_range(0..total);
    for (index, entry) in variations.iter().enumerate() {
        let weight = entry.weight as u32;
        if pick < weight {
            return Some(index);
        }
        pick -= weight;
    }

    Some(variations.len() - 1)
}

/// A brush whose content depends on the connectivity of neighbouring tiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientedBrush {
    /// Kept sorted by mask; iteration order decides fallback ties
    #[serde(default)]
    orientations: Vec<BrushOrientation>,
    #[serde(default)]
    pub default_orientation_mask: u8,
    #[serde(default)]
    pub fallback_mode: FallbackMode,
    /// Re-apply this brush's flags after a nested brush prepared the tile
    #[serde(default)]
    pub force_override_flags: bool,
    #[serde(skip)]
    lookup: OrientationLookup,
}

impl Default for OrientedBrush {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientedBrush {
    pub fn new() -> Self {
        let mut brush = Self {
            orientations: Vec::new(),
            default_orientation_mask: ISOLATED,
            fallback_mode: FallbackMode::default(),
            force_override_flags: false,
            lookup: OrientationLookup::default(),
        };
        brush.rebuild_lookup();
        brush
    }

    pub fn with_fallback(mut self, fallback_mode: FallbackMode) -> Self {
        self.fallback_mode = fallback_mode;
        self
    }

    pub fn orientations(&self) -> &[BrushOrientation] {
        &self.orientations
    }

    pub fn lookup(&self) -> &OrientationLookup {
        &self.lookup
    }

    pub fn invalidate_lookup(&mut self) {
        self.lookup.invalidate();
    }

    pub fn rebuild_lookup(&mut self) {
        self.lookup.rebuild(&self.orientations);
    }

    fn position(&self, mask: u8) -> Option<usize> {
        match self.lookup.get(mask) {
            Some(slot) => slot,
            None => self.orientations.iter().position(|o| o.mask == mask),
        }
    }

    pub fn find_orientation(&self, mask: u8) -> Option<&BrushOrientation> {
        self.position(mask).map(|index| &self.orientations[index])
    }

    pub fn has_orientation(&self, mask: u8) -> bool {
        self.position(mask).is_some()
    }

    pub(crate) fn orientation_mut(&mut self, mask: u8) -> Result<&mut BrushOrientation, BrushError> {
        let index = self.position(mask).ok_or(BrushError::UnknownOrientation(mask))?;
        Ok(&mut self.orientations[index])
    }

    /// Define an orientation.
    ///
    /// With `rotational_symmetry` the other rotations of the pattern are
    /// added too, linked so they always share one variation list.
    pub fn add_orientation(&mut self, mask: u8, rotational_symmetry: bool) -> Result<(), BrushError> {
        let masks = if rotational_symmetry {
            let mut masks = masks_with_rotational_symmetry(mask);
            // Two-fold patterns repeat; the first occurrence keeps its rotation index
            let mut seen = Vec::with_capacity(masks.len());
            masks.retain(|m| {
                let fresh = !seen.contains(m);
                seen.push(*m);
                fresh
            });
            masks
        } else {
            vec![mask]
        };

        if let Some(existing) = masks.iter().find(|m| self.has_orientation(**m)) {
            return Err(BrushError::DuplicateOrientation(*existing));
        }

        let all = masks_with_rotational_symmetry(mask);
        for m in masks {
            let rotation_index = all.iter().position(|x| *x == m).unwrap_or(0) as u8;
            self.orientations
                .push(BrushOrientation::new(m, rotational_symmetry, rotation_index));
        }
        self.orientations.sort_by_key(|o| o.mask);

        self.invalidate_lookup();
        self.rebuild_lookup();
        Ok(())
    }

    /// Remove an orientation and, when grouped, its rotated siblings.
    /// Unknown masks are ignored.
    pub fn remove_orientation(&mut self, mask: u8) {
        let Some(orientation) = self.find_orientation(mask) else {
            return;
        };

        let group = if orientation.has_rotational_symmetry {
            masks_with_rotational_symmetry(mask)
        } else {
            vec![mask]
        };
        let grouped = orientation.has_rotational_symmetry;
        self.orientations
            .retain(|o| !(o.mask == mask || (grouped && o.has_rotational_symmetry && group.contains(&o.mask))));

        self.invalidate_lookup();
        self.rebuild_lookup();
    }

    /// Copy the variation list of `mask` onto the other orientations of its
    /// rotation group. Returns the number of orientations updated.
    pub fn sync_grouped_variations(&mut self, mask: u8) -> Result<usize, BrushError> {
        let source = self
            .find_orientation(mask)
            .ok_or(BrushError::UnknownOrientation(mask))?;
        if !source.has_rotational_symmetry {
            return Ok(0);
        }
        let variations = source.variations.clone();
        let group = masks_with_rotational_symmetry(mask);

        let mut updated = 0;
        for orientation in self.orientations.iter_mut() {
            if orientation.mask != mask
                && orientation.has_rotational_symmetry
                && group.contains(&orientation.mask)
            {
                orientation.variations = variations.clone();
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Resolve `requested` to the mask of a defined orientation.
    ///
    /// Exact matches win. Otherwise the fallback mode scans orientations in
    /// mask order; the default orientation mask is returned when nothing
    /// qualifies.
    pub fn find_closest_orientation_mask(&self, requested: u8) -> u8 {
        if self.has_orientation(requested) {
            return requested;
        }

        let mut best = self.default_orientation_mask;
        match self.fallback_mode {
            FallbackMode::NextBest => {
                let mut best_strong = 2;
                let mut best_weak = 0;
                for orientation in &self.orientations {
                    let strong = count_strong_connections(orientation.mask, requested);
                    let weak = count_weak_connections(orientation.mask, requested);
                    if strong > best_strong || (strong == best_strong && weak > best_weak) {
                        best_strong = strong;
                        best_weak = weak;
                        best = orientation.mask;
                    }
                }
            }
            FallbackMode::UseDefault => {
                let mut best_weak: Option<u32> = None;
                for orientation in &self.orientations {
                    if count_strong_connections(orientation.mask, requested) != 4 {
                        continue;
                    }
                    let weak = count_weak_connections(orientation.mask, requested);
                    if best_weak.map_or(true, |current| weak > current) {
                        best_weak = Some(weak);
                        best = orientation.mask;
                    }
                }
            }
            FallbackMode::UseDefaultStrict => {
                for orientation in &self.orientations {
                    if count_strong_connections(orientation.mask, requested) == 4
                        && count_weak_connections(orientation.mask, requested) == 4
                    {
                        best = orientation.mask;
                    }
                }
            }
        }
        best
    }

    /// Orientation painting `requested` would use
    pub fn resolve_orientation(&self, requested: u8) -> Option<&BrushOrientation> {
        self.find_orientation(self.find_closest_orientation_mask(requested))
    }

    /// Number of variations available when painting `mask`
    pub fn count_tile_variations(&self, mask: u8) -> usize {
        self.resolve_orientation(mask)
            .map_or(0, BrushOrientation::variation_count)
    }

    /// Every variation referenced by any orientation
    pub fn all_variations(&self) -> impl Iterator<Item = &Variation> + '_ {
        self.orientations
            .iter()
            .flat_map(|o| o.variations.iter().map(|v| &v.variation))
    }

    /// Restore ordering and rebuild the lookup table after loading
    pub fn after_deserialize(&mut self) {
        self.orientations.sort_by_key(|o| o.mask);
        self.invalidate_lookup();
        self.rebuild_lookup();
    }
}
