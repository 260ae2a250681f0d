//! Brush resolution
//!
//! Every brush operation is a recursive walk over the brush sum type:
//! - Oriented brushes resolve the neighbour mask to an orientation, pick a
//!   variation and hand nested brush variations the rest of the work
//! - Alias brushes forward everything to their target
//! - Tileset, autotile and empty brushes do the work themselves
//!
//! Missing references (unknown brush ids, undefined orientations, aliases
//! without a target) are logged and leave the tile without content.

use crate::brush::{Brush, BrushKind, BrushProperties, ScaleMode};
use crate::catalog::BrushCatalog;
use crate::coalesce::orientation_mask_at;
use crate::error::BrushError;
use crate::oriented::{pick_random_variation_index, Variation, MAX_VARIATIONS};
use rand::Rng;
use tilepaint_core::{
    ContentFactory, ContentHandle, ContentRequest, ContentSource, TileGrid, TileRecord,
    TileTransform,
};
use tracing::warn;
use uuid::Uuid;

/// Longest delegation chain resolution follows (alias → oriented → alias → target)
pub const MAX_DELEGATION_DEPTH: u8 = 3;

/// How the variation of an oriented brush is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariationPick {
    /// Weighted random pick
    #[default]
    Random,
    /// Exactly this index; out of range is an error
    Index(u8),
    /// This index if the resolved orientation has it, otherwise random
    Preferred(u8),
}

/// The cell being prepared and the brush the caller painted it with.
///
/// Connectivity is always judged against the painted brush, also while a
/// nested brush finishes the preparation.
#[derive(Debug, Clone, Copy)]
pub struct PaintContext<'a> {
    pub grid: &'a TileGrid,
    pub row: u32,
    pub column: u32,
    pub brush: &'a Brush,
}

/// Where content is being created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSite {
    pub row: u32,
    pub column: u32,
    pub chunk_root: Option<ContentHandle>,
}

fn apply_flags(tile: &mut TileRecord, properties: &BrushProperties) {
    tile.set_user_flags(properties.user_flags);
    tile.set_solid(properties.solid);
}

impl BrushCatalog {
    /// Neighbour mask of `(row, column)` for a tile painted with `brush`
    pub fn orientation_mask(
        &self,
        grid: &TileGrid,
        row: u32,
        column: u32,
        brush: &Brush,
        painted_rotation: u8,
    ) -> u8 {
        orientation_mask_at(grid, row, column, brush, painted_rotation, |id| {
            self.get(id).map(|other| other.properties.group)
        })
    }

    // ─── Prepare ────────────────────────────────────────────────────────────

    /// Fill in the orientation, variation, tileset cell, rotation and flags
    /// of `tile`, which must already carry the painted brush and rotation.
    pub fn prepare_tile_data<R: Rng>(
        &self,
        ctx: &PaintContext<'_>,
        tile: &mut TileRecord,
        pick: VariationPick,
        rng: &mut R,
    ) -> Result<(), BrushError> {
        self.prepare_with(ctx.brush, ctx, tile, pick, rng, 0)
    }

    fn prepare_with<R: Rng>(
        &self,
        brush: &Brush,
        ctx: &PaintContext<'_>,
        tile: &mut TileRecord,
        pick: VariationPick,
        rng: &mut R,
        depth: u8,
    ) -> Result<(), BrushError> {
        if depth > MAX_DELEGATION_DEPTH {
            warn!(brush = %brush.id, "brush delegation too deep, tile left unresolved");
            return Ok(());
        }
        apply_flags(tile, &brush.properties);

        match &brush.kind {
            BrushKind::Empty => {
                tile.tileset = None;
                tile.tileset_index = None;
                tile.set_procedural(false);
            }
            BrushKind::Tileset(tileset_brush) => {
                tile.tileset = Some(tileset_brush.tileset);
                tile.tileset_index = Some(tileset_brush.tile_index);
                tile.set_procedural(tileset_brush.procedural);
            }
            BrushKind::Autotile(autotile) => {
                let mask = self.orientation_mask(
                    ctx.grid,
                    ctx.row,
                    ctx.column,
                    ctx.brush,
                    tile.painted_rotation,
                );
                tile.orientation_mask = mask;
                tile.tileset = Some(autotile.tileset);
                tile.tileset_index = Some(autotile.tile_index(mask));
                tile.set_procedural(autotile.procedural);
            }
            BrushKind::Oriented(oriented) => {
                tile.tileset = None;
                tile.tileset_index = None;
                tile.set_procedural(false);

                let mask = self.orientation_mask(
                    ctx.grid,
                    ctx.row,
                    ctx.column,
                    ctx.brush,
                    tile.painted_rotation,
                );
                tile.orientation_mask = mask;
                tile.variation_index = 0;

                // Reported at creation time
                let Some(orientation) = oriented.resolve_orientation(mask) else {
                    return Ok(());
                };

                let count = orientation.variation_count();
                let index = match pick {
                    VariationPick::Random => {
                        pick_random_variation_index(orientation.variations(), rng).unwrap_or(0)
                    }
                    VariationPick::Index(index) => {
                        let index = index as usize;
                        if index >= count {
                            return Err(BrushError::VariationIndexOutOfRange { index, count });
                        }
                        index
                    }
                    VariationPick::Preferred(index) if (index as usize) < count => index as usize,
                    VariationPick::Preferred(_) => {
                        pick_random_variation_index(orientation.variations(), rng).unwrap_or(0)
                    }
                };
                // Lists loaded from disk bypass the insertion cap
                tile.variation_index = u8::try_from(index)
                    .map_err(|_| BrushError::TooManyVariations(MAX_VARIATIONS))?;
                tile.rotation = (tile.rotation + orientation.rotation_index()) % 4;

                if let Some(Variation::Brush(nested)) = orientation.variation(index).map(|v| v.variation) {
                    match self.get(nested) {
                        Some(nested) => {
                            self.prepare_with(nested, ctx, tile, VariationPick::Random, rng, depth + 1)?
                        }
                        None => warn!(brush = %brush.id, %nested, "variation references an unknown brush"),
                    }
                    if oriented.force_override_flags {
                        apply_flags(tile, &brush.properties);
                    }
                }
            }
            BrushKind::Alias(alias) => {
                match self.alias_target(brush, alias.target) {
                    Some(target) => self.prepare_with(target, ctx, tile, pick, rng, depth + 1)?,
                    None => {
                        tile.tileset = None;
                        tile.tileset_index = None;
                    }
                }
                if alias.override_flags {
                    apply_flags(tile, &brush.properties);
                }
            }
        }
        Ok(())
    }

    /// Target of an alias, warning when it is missing or itself an alias
    fn alias_target(&self, alias: &Brush, target: Option<Uuid>) -> Option<&Brush> {
        let Some(target) = target else {
            warn!(brush = %alias.id, "alias brush has no target");
            return None;
        };
        match self.get(target) {
            Some(brush) if brush.is_alias() => {
                warn!(brush = %alias.id, %target, "alias brush targets another alias");
                None
            }
            Some(brush) => Some(brush),
            None => {
                warn!(brush = %alias.id, %target, "alias brush targets an unknown brush");
                None
            }
        }
    }

    // ─── Create ─────────────────────────────────────────────────────────────

    /// Instantiate content for a prepared tile. `None` when the brush paints
    /// nothing (empty brush, procedural tile, missing reference).
    pub fn create_tile(
        &self,
        brush: &Brush,
        tile: &TileRecord,
        site: TileSite,
        factory: &mut dyn ContentFactory,
    ) -> Option<ContentHandle> {
        self.create_with(brush, tile, site, factory, 0)
    }

    fn create_with(
        &self,
        brush: &Brush,
        tile: &TileRecord,
        site: TileSite,
        factory: &mut dyn ContentFactory,
        depth: u8,
    ) -> Option<ContentHandle> {
        if depth > MAX_DELEGATION_DEPTH {
            warn!(brush = %brush.id, "brush delegation too deep, no content created");
            return None;
        }

        let content = match &brush.kind {
            BrushKind::Empty => None,
            BrushKind::Tileset(tileset_brush) => self.create_tileset_content(
                tileset_brush.tileset,
                tile.tileset_index.unwrap_or(tileset_brush.tile_index),
                tileset_brush.attached_template,
                tile,
                site,
                factory,
            ),
            BrushKind::Autotile(autotile) => self.create_tileset_content(
                autotile.tileset,
                tile.tileset_index
                    .unwrap_or_else(|| autotile.tile_index(tile.orientation_mask)),
                autotile.attached_template,
                tile,
                site,
                factory,
            ),
            BrushKind::Oriented(oriented) => {
                let Some(orientation) = oriented.resolve_orientation(tile.orientation_mask) else {
                    warn!(
                        brush = %brush.id,
                        mask = tile.orientation_mask,
                        "no orientation for mask, tile left without content"
                    );
                    return None;
                };
                let Some(entry) = orientation.variation(tile.variation_index as usize) else {
                    warn!(
                        brush = %brush.id,
                        index = tile.variation_index,
                        count = orientation.variation_count(),
                        "variation index out of range, tile left without content"
                    );
                    return None;
                };
                match entry.variation {
                    Variation::Template(template) => {
                        instantiate(ContentSource::Template(template), tile, site, factory)
                    }
                    Variation::Brush(nested) => match self.get(nested) {
                        Some(nested) => self.create_with(nested, tile, site, factory, depth + 1),
                        None => {
                            warn!(brush = %brush.id, %nested, "variation references an unknown brush");
                            None
                        }
                    },
                }
            }
            BrushKind::Alias(alias) => self
                .alias_target(brush, alias.target)
                .and_then(|target| self.create_with(target, tile, site, factory, depth + 1)),
        };

        // Post-processing runs after delegation so outer brushes win
        if let Some(handle) = content {
            if !brush.properties.overrides.is_empty() {
                factory.apply_overrides(handle, &brush.properties.overrides);
            }
        }
        content
    }

    fn create_tileset_content(
        &self,
        tileset: Uuid,
        index: u32,
        attached_template: Option<Uuid>,
        tile: &TileRecord,
        site: TileSite,
        factory: &mut dyn ContentFactory,
    ) -> Option<ContentHandle> {
        if let Some(template) = attached_template {
            return instantiate(ContentSource::Template(template), tile, site, factory);
        }
        if tile.is_procedural() {
            return None;
        }
        instantiate(ContentSource::TilesetCell { tileset, index }, tile, site, factory)
    }

    // ─── Transform ──────────────────────────────────────────────────────────

    /// Local transform of the content painted for `tile` at `(row, column)`
    pub fn apply_transforms(
        &self,
        brush: &Brush,
        tile: &TileRecord,
        grid: &TileGrid,
        row: u32,
        column: u32,
    ) -> Option<TileTransform> {
        self.transform_with(brush, brush, tile, grid, row, column, 0)
    }

    fn transform_with(
        &self,
        brush: &Brush,
        transformer: &Brush,
        tile: &TileRecord,
        grid: &TileGrid,
        row: u32,
        column: u32,
        depth: u8,
    ) -> Option<TileTransform> {
        if depth > MAX_DELEGATION_DEPTH {
            warn!(brush = %brush.id, "brush delegation too deep, transform skipped");
            return None;
        }

        match &brush.kind {
            BrushKind::Oriented(oriented) => {
                let orientation = oriented.resolve_orientation(tile.orientation_mask)?;
                match orientation.variation(tile.variation_index as usize).map(|v| v.variation) {
                    Some(Variation::Brush(nested)) => {
                        let nested = self.get(nested)?;
                        self.transform_with(nested, nested, tile, grid, row, column, depth + 1)
                    }
                    _ => Some(compute_transform(&transformer.properties, tile, grid, row, column)),
                }
            }
            BrushKind::Alias(alias) => {
                let target = self.alias_target(brush, alias.target)?;
                let transformer = if alias.override_transforms { brush } else { target };
                self.transform_with(target, transformer, tile, grid, row, column, depth + 1)
            }
            _ => Some(compute_transform(&transformer.properties, tile, grid, row, column)),
        }
    }

    /// Offset of `actual` from the transform the brush would compute
    pub fn calculate_manual_offset(
        &self,
        brush: &Brush,
        tile: &TileRecord,
        grid: &TileGrid,
        row: u32,
        column: u32,
        actual: &TileTransform,
    ) -> Option<[f32; 3]> {
        let computed = self.apply_transforms(brush, tile, grid, row, column)?;
        Some([
            actual.position[0] - computed.position[0],
            actual.position[1] - computed.position[1],
            actual.position[2] - computed.position[2],
        ])
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Number of variations painting `mask` with `brush` can produce
    pub fn count_tile_variations(&self, brush: &Brush, mask: u8) -> usize {
        self.count_with(brush, mask, 0)
    }

    fn count_with(&self, brush: &Brush, mask: u8, depth: u8) -> usize {
        if depth > MAX_DELEGATION_DEPTH {
            return 0;
        }
        match &brush.kind {
            BrushKind::Empty => 0,
            BrushKind::Tileset(_) | BrushKind::Autotile(_) => 1,
            BrushKind::Oriented(oriented) => oriented.count_tile_variations(mask),
            BrushKind::Alias(alias) => self
                .alias_target(brush, alias.target)
                .map_or(0, |target| self.count_with(target, mask, depth + 1)),
        }
    }

    /// Render material of the content `brush` paints
    pub fn material(&self, brush: &Brush) -> Option<Uuid> {
        self.material_with(brush, 0)
    }

    fn material_with(&self, brush: &Brush, depth: u8) -> Option<Uuid> {
        if depth > MAX_DELEGATION_DEPTH {
            return None;
        }
        match &brush.kind {
            BrushKind::Empty => None,
            BrushKind::Tileset(tileset_brush) => self.tileset(tileset_brush.tileset)?.material,
            BrushKind::Autotile(autotile) => self.tileset(autotile.tileset)?.material,
            BrushKind::Oriented(oriented) => {
                let orientation = oriented.find_orientation(oriented.default_orientation_mask)?;
                orientation.variations().iter().find_map(|entry| match entry.variation {
                    Variation::Brush(nested) => self
                        .get(nested)
                        .and_then(|nested| self.material_with(nested, depth + 1)),
                    Variation::Template(_) => None,
                })
            }
            BrushKind::Alias(alias) => self
                .alias_target(brush, alias.target)
                .and_then(|target| self.material_with(target, depth + 1)),
        }
    }
}

fn instantiate(
    source: ContentSource,
    tile: &TileRecord,
    site: TileSite,
    factory: &mut dyn ContentFactory,
) -> Option<ContentHandle> {
    factory.instantiate(&ContentRequest {
        source,
        row: site.row,
        column: site.column,
        tile,
        chunk_root: site.chunk_root,
    })
}

fn compute_transform(
    properties: &BrushProperties,
    tile: &TileRecord,
    grid: &TileGrid,
    row: u32,
    column: u32,
) -> TileTransform {
    let settings = &properties.transform;
    let centre = grid.local_point(row, column);
    let scale = match settings.scale_mode {
        ScaleMode::DontTouch if settings.apply_prefab_transform => settings.prefab_scale,
        ScaleMode::DontTouch => [1.0; 3],
        ScaleMode::UseCellSize => grid.cell_size,
        ScaleMode::Custom(scale) => scale,
    };
    TileTransform {
        position: [
            centre[0] + settings.offset[0],
            centre[1] + settings.offset[1],
            centre[2] + settings.offset[2],
        ],
        quarter_turns: tile.rotation % 4,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oriented::OrientedBrush;
    use crate::tileset_brush::{AutotileBrush, AutotileLayout, TilesetBrush};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use tilepaint_core::orientation::neighbors::*;
    use tilepaint_core::orientation::{ISOLATED, SURROUNDED};
    use tilepaint_core::testing::RecordingFactory;
    use tilepaint_core::{ContentOverrides, Tileset};

    fn seeded_rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn site(row: u32, column: u32) -> TileSite {
        TileSite {
            row,
            column,
            chunk_root: None,
        }
    }

    fn prepare(catalog: &BrushCatalog, grid: &TileGrid, brush: Uuid, row: u32, column: u32, rotation: u8) -> TileRecord {
        let brush = catalog.get(brush).unwrap();
        let mut tile = TileRecord::painted_with(brush.id, rotation);
        let ctx = PaintContext { grid, row, column, brush };
        catalog
            .prepare_tile_data(&ctx, &mut tile, VariationPick::Random, &mut seeded_rng())
            .unwrap();
        tile
    }

    fn fill(grid: &mut TileGrid, factory: &mut RecordingFactory, brush: Uuid, cells: &[(u32, u32)]) {
        for &(row, column) in cells {
            grid.set_tile_from(row, column, &TileRecord::painted_with(brush, 0), factory)
                .unwrap();
        }
    }

    #[test]
    fn test_tileset_brush_prepares_cell() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Terrain".to_string(), 16, 4, 4));
        let mut brush = Brush::tileset("Grass", TilesetBrush::new(tileset, 5).procedural(true));
        brush.properties.user_flags = 0b101;
        brush.properties.solid = true;
        let id = catalog.insert(brush).unwrap();
        let grid = TileGrid::new(4, 4, 2, 2).unwrap();

        let tile = prepare(&catalog, &grid, id, 1, 1, 0);
        assert_eq!(tile.tileset, Some(tileset));
        assert_eq!(tile.tileset_index, Some(5));
        assert!(tile.is_procedural());
        assert!(tile.is_solid());
        assert_eq!(tile.user_flags(), 0b101);

        // Procedural tiles are drawn by the chunk mesh
        let mut factory = RecordingFactory::default();
        let brush = catalog.get(id).unwrap();
        assert_eq!(catalog.create_tile(brush, &tile, site(1, 1), &mut factory), None);
        assert!(factory.instantiated.is_empty());
    }

    #[test]
    fn test_autotile_picks_cell_from_neighbours() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Walls".to_string(), 16, 8, 8));
        let id = catalog
            .insert(Brush::autotile("Wall", AutotileBrush::new(tileset, AutotileLayout::Basic, 16)))
            .unwrap();
        let mut grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let mut factory = RecordingFactory::default();
        fill(&mut grid, &mut factory, id, &[(0, 1), (1, 0)]);

        let tile = prepare(&catalog, &grid, id, 1, 1, 0);
        assert_eq!(tile.orientation_mask, N | W);
        assert_eq!(tile.tileset_index, Some(16 + 1 + 8));

        let brush = catalog.get(id).unwrap();
        let handle = catalog.create_tile(brush, &tile, site(1, 1), &mut factory);
        assert!(handle.is_some());
        assert_eq!(
            factory.instantiated.last().unwrap().2,
            ContentSource::TilesetCell { tileset, index: 25 }
        );
    }

    fn oriented_catalog() -> (BrushCatalog, Uuid, Uuid, Uuid) {
        let mut catalog = BrushCatalog::new();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(ISOLATED, false).unwrap();
        oriented.add_orientation(SURROUNDED, false).unwrap();
        let id = catalog.insert(Brush::oriented("Hedge", oriented)).unwrap();
        let isolated = Uuid::new_v4();
        let surrounded = Uuid::new_v4();
        catalog
            .insert_variation(id, ISOLATED, None, Variation::Template(isolated), 100)
            .unwrap();
        catalog
            .insert_variation(id, SURROUNDED, None, Variation::Template(surrounded), 100)
            .unwrap();
        (catalog, id, isolated, surrounded)
    }

    #[test]
    fn test_oriented_resolves_neighbourhood() {
        let (catalog, id, isolated, surrounded) = oriented_catalog();
        let mut grid = TileGrid::new(10, 10, 4, 4).unwrap();
        let mut factory = RecordingFactory::default();
        let brush = catalog.get(id).unwrap();

        let tile = prepare(&catalog, &grid, id, 5, 5, 0);
        assert_eq!(tile.orientation_mask, ISOLATED);
        catalog.create_tile(brush, &tile, site(5, 5), &mut factory).unwrap();
        assert_eq!(factory.instantiated[0].2, ContentSource::Template(isolated));

        let ring: Vec<(u32, u32)> = (4..=6)
            .flat_map(|r| (4..=6).map(move |c| (r, c)))
            .filter(|&cell| cell != (5, 5))
            .collect();
        fill(&mut grid, &mut factory, id, &ring);

        let tile = prepare(&catalog, &grid, id, 5, 5, 0);
        assert_eq!(tile.orientation_mask, SURROUNDED);
        catalog.create_tile(brush, &tile, site(5, 5), &mut factory).unwrap();
        assert_eq!(factory.instantiated[1].2, ContentSource::Template(surrounded));
    }

    #[test]
    fn test_explicit_variation_index() {
        let (mut catalog, id, _, _) = oriented_catalog();
        catalog
            .insert_variation(id, ISOLATED, None, Variation::Template(Uuid::new_v4()), 0)
            .unwrap();
        let grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let brush = catalog.get(id).unwrap();
        let ctx = PaintContext { grid: &grid, row: 1, column: 1, brush };

        let mut tile = TileRecord::painted_with(id, 0);
        catalog
            .prepare_tile_data(&ctx, &mut tile, VariationPick::Index(1), &mut seeded_rng())
            .unwrap();
        assert_eq!(tile.variation_index, 1);

        let mut tile = TileRecord::painted_with(id, 0);
        let result = catalog.prepare_tile_data(&ctx, &mut tile, VariationPick::Index(2), &mut seeded_rng());
        assert_eq!(result, Err(BrushError::VariationIndexOutOfRange { index: 2, count: 2 }));

        // A stale preferred index falls back to a weighted pick
        let mut tile = TileRecord::painted_with(id, 0);
        catalog
            .prepare_tile_data(&ctx, &mut tile, VariationPick::Preferred(9), &mut seeded_rng())
            .unwrap();
        assert_eq!(tile.variation_index, 0);
    }

    #[test]
    fn test_last_of_full_variation_list() {
        let (mut catalog, id, _, _) = oriented_catalog();
        let mut last = Uuid::nil();
        for _ in 1..MAX_VARIATIONS {
            last = Uuid::new_v4();
            catalog
                .insert_variation(id, ISOLATED, None, Variation::Template(last), 1)
                .unwrap();
        }
        assert_eq!(
            catalog.insert_variation(id, ISOLATED, None, Variation::Template(Uuid::new_v4()), 1),
            Err(BrushError::TooManyVariations(MAX_VARIATIONS))
        );

        let grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let brush = catalog.get(id).unwrap();
        let ctx = PaintContext { grid: &grid, row: 1, column: 1, brush };
        let mut tile = TileRecord::painted_with(id, 0);
        catalog
            .prepare_tile_data(&ctx, &mut tile, VariationPick::Index(u8::MAX), &mut seeded_rng())
            .unwrap();
        assert_eq!(tile.variation_index, u8::MAX);

        let mut factory = RecordingFactory::default();
        catalog.create_tile(brush, &tile, site(1, 1), &mut factory).unwrap();
        assert_eq!(factory.instantiated[0].2, ContentSource::Template(last));
    }

    #[test]
    fn test_stale_variation_index_creates_nothing() {
        let (mut catalog, id, _, _) = oriented_catalog();
        let grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let mut tile = prepare(&catalog, &grid, id, 1, 1, 0);
        assert_eq!(tile.variation_index, 0);

        // The record outlives the variation it pointed at
        catalog.remove_variation(id, ISOLATED, 0).unwrap();
        tile.variation_index = 3;
        let brush = catalog.get(id).unwrap();
        let mut factory = RecordingFactory::default();
        assert_eq!(catalog.create_tile(brush, &tile, site(1, 1), &mut factory), None);
        assert!(factory.instantiated.is_empty());
    }

    #[test]
    fn test_grouped_orientation_advances_rotation() {
        let mut catalog = BrushCatalog::new();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(N, true).unwrap();
        let id = catalog.insert(Brush::oriented("End", oriented)).unwrap();
        catalog
            .insert_variation(id, N, None, Variation::Template(Uuid::new_v4()), 100)
            .unwrap();

        let mut grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let mut factory = RecordingFactory::default();
        fill(&mut grid, &mut factory, id, &[(1, 2)]);

        // Connected to the east: the N orientation turned once clockwise
        let tile = prepare(&catalog, &grid, id, 1, 1, 0);
        assert_eq!(tile.orientation_mask, E);
        assert_eq!(tile.rotation, 1);

        // Painted rotated three quarter turns, rotation wraps
        let tile = prepare(&catalog, &grid, id, 1, 1, 3);
        assert_eq!(tile.orientation_mask, S);
        assert_eq!(tile.rotation, (3 + 2) % 4);
    }

    #[test]
    fn test_nested_brush_variation() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Props".to_string(), 16, 4, 4));
        let mut nested = Brush::tileset("Rock", TilesetBrush::new(tileset, 3));
        nested.properties.user_flags = 0b10;
        nested.properties.transform.scale_mode = ScaleMode::Custom([2.0, 2.0, 2.0]);
        let nested = catalog.insert(nested).unwrap();

        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(ISOLATED, false).unwrap();
        let mut outer = Brush::oriented("Rocks", oriented);
        outer.properties.user_flags = 0b1;
        outer.properties.overrides = ContentOverrides {
            tag: Some("Rock".to_string()),
            ..ContentOverrides::default()
        };
        let outer = catalog.insert(outer).unwrap();
        catalog
            .insert_variation(outer, ISOLATED, None, Variation::Brush(nested), 100)
            .unwrap();

        let grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let tile = prepare(&catalog, &grid, outer, 1, 1, 0);
        assert_eq!(tile.tileset_index, Some(3));
        // Flags come from the nested brush
        assert_eq!(tile.user_flags(), 0b10);

        let mut factory = RecordingFactory::default();
        let brush = catalog.get(outer).unwrap();
        let handle = catalog.create_tile(brush, &tile, site(1, 1), &mut factory).unwrap();
        assert_eq!(factory.instantiated[0].2, ContentSource::TilesetCell { tileset, index: 3 });
        assert_eq!(factory.overrides[&handle].tag.as_deref(), Some("Rock"));

        // Geometry comes from the nested brush as well
        let transform = catalog.apply_transforms(brush, &tile, &grid, 1, 1).unwrap();
        assert_eq!(transform.scale, [2.0, 2.0, 2.0]);

        catalog.oriented_mut(outer).unwrap().force_override_flags = true;
        let tile = prepare(&catalog, &grid, outer, 1, 1, 0);
        assert_eq!(tile.user_flags(), 0b1);
    }

    #[test]
    fn test_missing_orientation_degrades() {
        let mut catalog = BrushCatalog::new();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(SURROUNDED, false).unwrap();
        let id = catalog.insert(Brush::oriented("Sparse", oriented)).unwrap();
        let grid = TileGrid::new(3, 3, 3, 3).unwrap();

        // Isolated falls back to the default mask, which is not defined
        let tile = prepare(&catalog, &grid, id, 1, 1, 0);
        let mut factory = RecordingFactory::default();
        let brush = catalog.get(id).unwrap();
        assert_eq!(catalog.create_tile(brush, &tile, site(1, 1), &mut factory), None);
        assert_eq!(catalog.apply_transforms(brush, &tile, &grid, 1, 1), None);
    }

    #[test]
    fn test_alias_forwards_to_target() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Walls".to_string(), 16, 8, 8));
        let mut target = Brush::autotile("Wall", AutotileBrush::new(tileset, AutotileLayout::Extended, 0));
        target.properties.transform.offset = [0.0, 0.5, 0.0];
        let target = catalog.insert(target).unwrap();
        let mut alias = Brush::alias("Wall alias", target);
        alias.properties.transform.offset = [3.0, 0.0, 0.0];
        let alias = catalog.insert(alias).unwrap();

        let grid = TileGrid::new(3, 3, 3, 3).unwrap();
        let direct = prepare(&catalog, &grid, target, 1, 1, 2);
        let via_alias = prepare(&catalog, &grid, alias, 1, 1, 2);
        assert!(via_alias.same_geometry(&direct));

        let target_brush = catalog.get(target).unwrap();
        let alias_brush = catalog.get(alias).unwrap();
        let expected = catalog.apply_transforms(target_brush, &direct, &grid, 1, 1).unwrap();
        assert_eq!(catalog.apply_transforms(alias_brush, &via_alias, &grid, 1, 1), Some(expected));
        assert_eq!(catalog.count_tile_variations(alias_brush, ISOLATED), 1);

        // With overridden transforms the alias's own offset applies
        catalog.set_alias_overrides(alias, true, false).unwrap();
        let alias_brush = catalog.get(alias).unwrap();
        let transform = catalog.apply_transforms(alias_brush, &via_alias, &grid, 1, 1).unwrap();
        let centre = grid.local_point(1, 1);
        assert_eq!(transform.position, [centre[0] + 3.0, centre[1], centre[2]]);
    }

    #[test]
    fn test_alias_flag_overrides() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Floor".to_string(), 16, 4, 4));
        let mut target = Brush::tileset("Stone", TilesetBrush::new(tileset, 2));
        target.properties.user_flags = 0b0000_0000_0000_0011;
        target.properties.solid = true;
        let target = catalog.insert(target).unwrap();
        let mut alias = Brush::alias("Slippery stone", target);
        alias.properties.user_flags = 0b1000_0000_0000_0100;
        alias.properties.solid = false;
        let alias = catalog.insert(alias).unwrap();
        let grid = TileGrid::new(3, 3, 3, 3).unwrap();

        // By default the target's flags win
        let tile = prepare(&catalog, &grid, alias, 1, 1, 0);
        assert_eq!(tile.user_flags(), 0b0000_0000_0000_0011);
        assert!(tile.is_solid());

        catalog.set_alias_overrides(alias, false, true).unwrap();
        let tile = prepare(&catalog, &grid, alias, 1, 1, 0);
        assert_eq!(tile.user_flags(), 0b1000_0000_0000_0100);
        assert!(!tile.is_solid());
        assert!(tile.user_flag(16).unwrap());
        assert!(!tile.user_flag(1).unwrap());
        // Geometry still comes from the target
        assert_eq!(tile.tileset_index, Some(2));
    }

    #[test]
    fn test_alias_without_target() {
        let mut catalog = BrushCatalog::new();
        let base = catalog.insert(Brush::empty("Base")).unwrap();
        let alias = catalog.insert(Brush::alias("Alias", base)).unwrap();
        catalog.set_alias_target(alias, None).unwrap();

        let grid = TileGrid::new(1, 1, 1, 1).unwrap();
        let tile = prepare(&catalog, &grid, alias, 0, 0, 0);
        let brush = catalog.get(alias).unwrap();
        let mut factory = RecordingFactory::default();
        assert_eq!(catalog.create_tile(brush, &tile, site(0, 0), &mut factory), None);
        assert_eq!(catalog.count_tile_variations(brush, ISOLATED), 0);
    }

    #[test]
    fn test_manual_offset() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Props".to_string(), 16, 4, 4));
        let id = catalog.insert(Brush::tileset("Crate", TilesetBrush::new(tileset, 0))).unwrap();
        let mut grid = TileGrid::new(4, 4, 4, 4).unwrap();
        grid.cell_size = [2.0, 2.0, 1.0];

        let tile = prepare(&catalog, &grid, id, 1, 2, 0);
        let brush = catalog.get(id).unwrap();
        let mut actual = catalog.apply_transforms(brush, &tile, &grid, 1, 2).unwrap();
        assert_eq!(actual.position, [5.0, -3.0, 0.0]);
        actual.position[0] += 0.25;
        let offset = catalog
            .calculate_manual_offset(brush, &tile, &grid, 1, 2, &actual)
            .unwrap();
        assert_eq!(offset, [0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_material_lookup() {
        let mut catalog = BrushCatalog::new();
        let material = Uuid::new_v4();
        let tileset = catalog.add_tileset(Tileset::new("Lit".to_string(), 16, 4, 4).with_material(material));
        let plain = catalog.insert(Brush::tileset("Plain", TilesetBrush::new(tileset, 1))).unwrap();
        let alias = catalog.insert(Brush::alias("Alias", plain)).unwrap();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(ISOLATED, false).unwrap();
        let outer = catalog.insert(Brush::oriented("Outer", oriented)).unwrap();
        catalog
            .insert_variation(outer, ISOLATED, None, Variation::Brush(alias), 100)
            .unwrap();

        assert_eq!(catalog.material(catalog.get(alias).unwrap()), Some(material));
        assert_eq!(catalog.material(catalog.get(outer).unwrap()), Some(material));
        assert_eq!(catalog.material(&Brush::empty("None")), None);
    }
}
