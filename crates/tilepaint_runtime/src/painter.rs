//! Painting engine
//!
//! `TilePainter` drives a single cell through prepare → write → commit:
//! the brush fills a scratch record, the record is copied into the grid and
//! its content is rebuilt. Inside a bulk edit the commit is deferred and the
//! record is only flagged dirty; the outermost `end_bulk_edit` commits every
//! dirty record once.

use crate::config::PainterSettings;
use crate::error::PaintError;
use rand::Rng;
use tilepaint_brush::{Brush, BrushCatalog, BrushError, BrushKind, PaintContext, TileSite, VariationPick};
use tilepaint_core::orientation::OFFSETS;
use tilepaint_core::{
    flags, BulkEditTransition, ChunkCoord, ContentFactory, ProceduralTile, TileGrid, TileRecord,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// UV rectangle used when a procedural tile's atlas cell cannot be found
const FULL_UV: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// What to paint into a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintArgs {
    pub brush: Uuid,
    /// Quarter turns clockwise (0-3)
    pub rotation: u8,
    pub variation: VariationPick,
}

impl PaintArgs {
    pub fn new(brush: Uuid) -> Self {
        Self {
            brush,
            rotation: 0,
            variation: VariationPick::Random,
        }
    }

    pub fn with_rotation(mut self, rotation: u8) -> Self {
        self.rotation = rotation % 4;
        self
    }

    pub fn with_variation(mut self, variation: VariationPick) -> Self {
        self.variation = variation;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOptions {
    /// Rebuild content even when the prepared record is unchanged
    pub force: bool,
    /// Keep the variation index while the resolved orientation is unchanged
    pub preserve_variations: bool,
}

/// Paints, erases and refreshes tiles of a [`TileGrid`] with brushes from a
/// [`BrushCatalog`], creating content through a [`ContentFactory`].
pub struct TilePainter<'a, R: Rng> {
    catalog: &'a BrushCatalog,
    factory: &'a mut dyn ContentFactory,
    rng: R,
    settings: PainterSettings,
}

impl<'a, R: Rng> TilePainter<'a, R> {
    pub fn new(catalog: &'a BrushCatalog, factory: &'a mut dyn ContentFactory, rng: R) -> Self {
        Self {
            catalog,
            factory,
            rng,
            settings: PainterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PainterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PainterSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &'a BrushCatalog {
        self.catalog
    }

    // ─── Paint / erase ──────────────────────────────────────────────────────

    /// Paint `(row, column)` with `args.brush`.
    ///
    /// Outside a bulk edit the content is rebuilt on every call, even when the
    /// cell already holds an identical tile.
    pub fn paint(
        &mut self,
        grid: &mut TileGrid,
        row: u32,
        column: u32,
        args: PaintArgs,
    ) -> Result<(), PaintError> {
        let catalog = self.catalog;
        let brush = catalog
            .get(args.brush)
            .ok_or(BrushError::UnknownBrush(args.brush))?;
        grid.get_tile(row, column)?;

        let mut scratch = TileRecord::painted_with(brush.id, args.rotation);
        let ctx = PaintContext {
            grid,
            row,
            column,
            brush,
        };
        catalog.prepare_tile_data(&ctx, &mut scratch, args.variation, &mut self.rng)?;
        self.apply_prepared(grid, row, column, &scratch)?;

        // The painted tile is already written, so finish even if a neighbour fails
        let refreshed = if self.settings.refresh_surrounding {
            self.refresh_surrounding(grid, row, column).map(|_| ())
        } else {
            Ok(())
        };
        self.finish(grid);
        refreshed
    }

    /// Erase `(row, column)`. Returns `false` when the cell was already empty.
    pub fn erase(&mut self, grid: &mut TileGrid, row: u32, column: u32) -> Result<bool, PaintError> {
        let Some(tile) = grid.get_tile(row, column)? else {
            return Ok(false);
        };
        let was_procedural = tile.is_procedural();

        if grid.is_bulk_editing() {
            // Content stays until the commit
            if let Some(tile) = grid.get_tile_mut(row, column)? {
                tile.brush = None;
            }
            grid.mark_dirty(row, column);
        } else if let Some(content) = grid.clear_tile(row, column)? {
            self.factory.destroy(content);
        }
        if was_procedural {
            grid.mark_procedural_dirty(row, column);
        }

        let refreshed = if self.settings.refresh_surrounding {
            self.refresh_surrounding(grid, row, column).map(|_| ())
        } else {
            Ok(())
        };
        self.finish(grid);
        grid.erase_empty_chunks(&mut *self.factory, false);
        refreshed.map(|_| true)
    }

    // ─── Refresh ────────────────────────────────────────────────────────────

    /// Re-prepare the tile at `(row, column)` against its current neighbours.
    ///
    /// Returns `true` when the tile was rewritten. Unless `options.force` is
    /// set, a tile whose prepared record is unchanged is left alone.
    pub fn refresh_tile(
        &mut self,
        grid: &mut TileGrid,
        row: u32,
        column: u32,
        options: RefreshOptions,
    ) -> Result<bool, PaintError> {
        let refreshed = self.refresh_one(grid, row, column, options);
        self.finish(grid);
        refreshed
    }

    /// Refresh the 8 neighbours of `(row, column)`; returns how many changed
    pub fn refresh_surrounding_tiles(
        &mut self,
        grid: &mut TileGrid,
        row: u32,
        column: u32,
    ) -> Result<usize, PaintError> {
        let refreshed = self.refresh_surrounding(grid, row, column);
        self.finish(grid);
        refreshed
    }

    /// Refresh every painted tile inside one bulk edit
    pub fn refresh_all_tiles(
        &mut self,
        grid: &mut TileGrid,
        options: RefreshOptions,
    ) -> Result<usize, PaintError> {
        let positions: Vec<(u32, u32)> = grid.tiles().map(|(row, column, _)| (row, column)).collect();
        self.bulk_edit(grid, |painter, grid| -> Result<usize, PaintError> {
            let mut refreshed = 0;
            for (row, column) in positions {
                if painter.refresh_one(grid, row, column, options)? {
                    refreshed += 1;
                }
            }
            Ok(refreshed)
        })
    }

    fn refresh_surrounding(&mut self, grid: &mut TileGrid, row: u32, column: u32) -> Result<usize, PaintError> {
        let options = RefreshOptions {
            force: false,
            preserve_variations: self.settings.preserve_variations_on_refresh,
        };
        let mut refreshed = 0;
        for (_, dr, dc) in OFFSETS {
            let (r, c) = (row as i64 + dr as i64, column as i64 + dc as i64);
            if !grid.in_bounds(r, c) {
                continue;
            }
            if self.refresh_one(grid, r as u32, c as u32, options)? {
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    fn refresh_one(
        &mut self,
        grid: &mut TileGrid,
        row: u32,
        column: u32,
        options: RefreshOptions,
    ) -> Result<bool, PaintError> {
        let Some(current) = grid.get_tile(row, column)?.cloned() else {
            return Ok(false);
        };
        let Some(brush_id) = current.brush else {
            return Ok(false);
        };
        let catalog = self.catalog;
        let Some(brush) = catalog.get(brush_id) else {
            warn!(row, column, brush = %brush_id, "tile references an unknown brush, refresh skipped");
            return Ok(false);
        };

        let mask = catalog.orientation_mask(grid, row, column, brush, current.painted_rotation);
        let pick = if options.preserve_variations
            && same_orientation(catalog, brush, current.orientation_mask, mask)
        {
            VariationPick::Preferred(current.variation_index)
        } else {
            VariationPick::Random
        };

        let mut scratch = TileRecord::painted_with(brush_id, current.painted_rotation);
        let ctx = PaintContext {
            grid,
            row,
            column,
            brush,
        };
        catalog.prepare_tile_data(&ctx, &mut scratch, pick, &mut self.rng)?;

        if !options.force && unchanged(&current, &scratch) {
            return Ok(false);
        }
        self.apply_prepared(grid, row, column, &scratch)?;
        Ok(true)
    }

    // ─── Commit ─────────────────────────────────────────────────────────────

    /// Copy a prepared record into the grid, then commit it or flag it dirty
    fn apply_prepared(
        &mut self,
        grid: &mut TileGrid,
        row: u32,
        column: u32,
        prepared: &TileRecord,
    ) -> Result<(), PaintError> {
        let tile = grid.tile_slot_mut(row, column, &mut *self.factory)?;
        let was_procedural = tile.is_procedural();
        let content = tile.content.take();
        let dirty = tile.is_dirty();
        tile.copy_from(prepared);
        tile.content = content;
        tile.set_dirty(dirty);

        if was_procedural {
            grid.mark_procedural_dirty(row, column);
        }
        if grid.is_bulk_editing() {
            grid.mark_dirty(row, column);
            Ok(())
        } else {
            self.commit_tile(grid, row, column)
        }
    }

    /// Rebuild the content of `(row, column)` from its record, or clear the
    /// record when its brush was removed
    fn commit_tile(&mut self, grid: &mut TileGrid, row: u32, column: u32) -> Result<(), PaintError> {
        let tile = grid.tile_slot_mut(row, column, &mut *self.factory)?;
        if let Some(content) = tile.content.take() {
            self.factory.destroy(content);
        }
        tile.set_dirty(false);
        let Some(brush_id) = tile.brush else {
            tile.clear();
            return Ok(());
        };
        let snapshot = tile.clone();

        let catalog = self.catalog;
        let Some(brush) = catalog.get(brush_id) else {
            warn!(row, column, brush = %brush_id, "tile references an unknown brush, no content created");
            return Ok(());
        };
        let site = TileSite {
            row,
            column,
            chunk_root: grid.chunk_at(row, column).and_then(|chunk| chunk.root),
        };
        let content = catalog.create_tile(brush, &snapshot, site, &mut *self.factory);
        if let Some(handle) = content {
            if let Some(transform) = catalog.apply_transforms(brush, &snapshot, grid, row, column) {
                self.factory.set_transform(handle, &transform);
            }
        }

        if let Some(tile) = grid.get_tile_mut(row, column)? {
            tile.content = content;
        }
        if snapshot.is_procedural() {
            grid.mark_procedural_dirty(row, column);
        }
        Ok(())
    }

    fn commit_dirty(&mut self, grid: &mut TileGrid) -> usize {
        let mut committed = 0;
        for (row, column) in grid.dirty_tiles() {
            match self.commit_tile(grid, row, column) {
                Ok(()) => committed += 1,
                Err(err) => warn!(row, column, %err, "failed to commit dirty tile"),
            }
        }
        grid.clear_chunk_dirty_flags();
        let meshes = self.rebuild_procedural_meshes(grid);
        let erased = if grid.chunk_erasure_pending() {
            grid.erase_empty_chunks(&mut *self.factory, true)
        } else {
            0
        };
        debug!(committed, meshes, erased, "bulk edit committed");
        committed
    }

    /// Work done after each operation outside a bulk edit
    fn finish(&mut self, grid: &mut TileGrid) {
        if !grid.is_bulk_editing() {
            self.rebuild_procedural_meshes(grid);
        }
    }

    /// Regenerate the mesh of every chunk flagged procedural-dirty
    pub fn rebuild_procedural_meshes(&mut self, grid: &mut TileGrid) -> usize {
        let stale: Vec<ChunkCoord> = grid
            .chunks()
            .filter(|(_, chunk)| chunk.procedural_dirty)
            .map(|(coord, _)| coord)
            .collect();

        for &coord in &stale {
            let tiles = self.procedural_tiles(grid, coord);
            self.factory.rebuild_procedural_mesh(coord, &tiles);
            if let Some(chunk) = grid.chunk_mut(coord) {
                chunk.procedural_dirty = false;
            }
        }
        stale.len()
    }

    fn procedural_tiles(&self, grid: &TileGrid, coord: ChunkCoord) -> Vec<ProceduralTile> {
        let Some(chunk) = grid.chunk(coord) else {
            return Vec::new();
        };
        chunk
            .occupied_indices()
            .filter_map(|i| {
                let tile = chunk.tile(i)?;
                if !tile.is_procedural() || tile.brush.is_none() {
                    return None;
                }
                let tileset = tile.tileset?;
                let index = tile.tileset_index?;
                let uv = self
                    .catalog
                    .tileset(tileset)
                    .and_then(|atlas| atlas.uv_rect(index))
                    .unwrap_or(FULL_UV);
                let (row, column) = grid.tile_position(coord, i);
                Some(ProceduralTile {
                    row,
                    column,
                    tileset,
                    index,
                    rotation: tile.rotation,
                    uv,
                })
            })
            .collect()
    }

    // ─── Bulk edit ──────────────────────────────────────────────────────────

    pub fn begin_bulk_edit(&mut self, grid: &mut TileGrid) {
        grid.begin_bulk_edit();
    }

    /// Leave one level of bulk editing; the outermost level commits every
    /// dirty tile and returns how many were committed
    pub fn end_bulk_edit(&mut self, grid: &mut TileGrid) -> usize {
        match grid.end_bulk_edit() {
            BulkEditTransition::Committing => self.commit_dirty(grid),
            BulkEditTransition::StillBatching | BulkEditTransition::Unbalanced => 0,
        }
    }

    /// Run `edit` inside a bulk edit that is always closed afterwards
    pub fn bulk_edit<T>(
        &mut self,
        grid: &mut TileGrid,
        edit: impl FnOnce(&mut Self, &mut TileGrid) -> T,
    ) -> T {
        self.begin_bulk_edit(grid);
        let result = edit(self, grid);
        self.end_bulk_edit(grid);
        result
    }

    // ─── Maintenance ────────────────────────────────────────────────────────

    /// Repaint tiles that have a brush but lost their content.
    ///
    /// Not allowed during a bulk edit; the call is then logged and ignored.
    pub fn scan_broken_tiles(&mut self, grid: &mut TileGrid) -> Result<usize, PaintError> {
        if grid.is_bulk_editing() {
            error!("cannot scan for broken tiles during a bulk edit");
            return Ok(0);
        }

        let catalog = self.catalog;
        let broken: Vec<(u32, u32)> = grid
            .tiles()
            .filter(|(_, _, tile)| tile.content.is_none() && !tile.is_procedural())
            .filter(|(_, _, tile)| {
                tile.brush
                    .and_then(|id| catalog.get(id))
                    .map_or(false, |brush| !matches!(brush.kind, BrushKind::Empty))
            })
            .map(|(row, column, _)| (row, column))
            .collect();

        let options = RefreshOptions {
            force: true,
            preserve_variations: true,
        };
        let mut repaired = 0;
        for &(row, column) in &broken {
            self.refresh_one(grid, row, column, options)?;
            if grid.get_tile(row, column)?.map_or(false, |tile| tile.content.is_some()) {
                repaired += 1;
            }
        }
        self.finish(grid);
        debug!(broken = broken.len(), repaired, "scanned for broken tiles");
        Ok(repaired)
    }

    /// Destroy every chunk that holds no tiles, regardless of the grid hint
    pub fn erase_empty_chunks(&mut self, grid: &mut TileGrid) -> usize {
        grid.erase_empty_chunks(&mut *self.factory, true)
    }
}

/// Records produce identical content
fn unchanged(current: &TileRecord, prepared: &TileRecord) -> bool {
    current.same_geometry(prepared)
        && (current.flags & !flags::DIRTY) == (prepared.flags & !flags::DIRTY)
}

/// Both masks resolve to the same orientation of `brush`
fn same_orientation(catalog: &BrushCatalog, brush: &Brush, previous: u8, current: u8) -> bool {
    if previous == current {
        return true;
    }
    let oriented = match &brush.kind {
        BrushKind::Oriented(oriented) => Some(oriented),
        BrushKind::Alias(alias) => alias
            .target
            .and_then(|target| catalog.get(target))
            .and_then(Brush::as_oriented),
        _ => None,
    };
    oriented.map_or(false, |oriented| {
        oriented.find_closest_orientation_mask(previous)
            == oriented.find_closest_orientation_mask(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use tilepaint_brush::{OrientedBrush, TilesetBrush, Variation};
    use tilepaint_core::orientation::neighbors::*;
    use tilepaint_core::orientation::ISOLATED;
    use tilepaint_core::testing::RecordingFactory;
    use tilepaint_core::{ContentSource, GridError, Tileset};

    struct Fence {
        catalog: BrushCatalog,
        brush: Uuid,
        isolated: Uuid,
        east: Uuid,
        west: Uuid,
    }

    fn fence() -> Fence {
        let mut catalog = BrushCatalog::new();
        let mut oriented = OrientedBrush::new();
        for mask in [ISOLATED, E, W, E | W] {
            oriented.add_orientation(mask, false).unwrap();
        }
        let brush = catalog.insert(Brush::oriented("Fence", oriented)).unwrap();
        let isolated = Uuid::new_v4();
        let east = Uuid::new_v4();
        let west = Uuid::new_v4();
        for (mask, template) in [(ISOLATED, isolated), (E, east), (W, west), (E | W, Uuid::new_v4())] {
            catalog
                .insert_variation(brush, mask, None, Variation::Template(template), 100)
                .unwrap();
        }
        Fence {
            catalog,
            brush,
            isolated,
            east,
            west,
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_paint_creates_content() {
        let fence = fence();
        let mut grid = TileGrid::new(3, 3, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.paint(&mut grid, 1, 1, PaintArgs::new(fence.brush)).unwrap();
        drop(painter);

        let tile = grid.get_tile(1, 1).unwrap().unwrap();
        let handle = tile.content.unwrap();
        assert_eq!(tile.orientation_mask, ISOLATED);
        assert_eq!(factory.instantiated, vec![(1, 1, ContentSource::Template(fence.isolated))]);
        assert_eq!(factory.transforms[&handle].position, grid.local_point(1, 1));
    }

    #[test]
    fn test_paint_refreshes_neighbours() {
        let fence = fence();
        let mut grid = TileGrid::new(3, 3, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.paint(&mut grid, 1, 1, PaintArgs::new(fence.brush)).unwrap();
        painter.paint(&mut grid, 1, 2, PaintArgs::new(fence.brush)).unwrap();
        drop(painter);

        assert_eq!(
            factory.instantiated,
            vec![
                (1, 1, ContentSource::Template(fence.isolated)),
                (1, 2, ContentSource::Template(fence.west)),
                (1, 1, ContentSource::Template(fence.east)),
            ]
        );
        assert_eq!(factory.destroyed.len(), 1);
        assert_eq!(factory.live.len(), 2);
        assert_eq!(grid.get_tile(1, 1).unwrap().unwrap().orientation_mask, E);
    }

    #[test]
    fn test_paint_out_of_range() {
        let fence = fence();
        let mut grid = TileGrid::new(3, 3, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        let err = painter.paint(&mut grid, 3, 0, PaintArgs::new(fence.brush)).unwrap_err();
        assert!(matches!(err, PaintError::Grid(GridError::OutOfRange { .. })));

        let unknown = Uuid::new_v4();
        let err = painter.paint(&mut grid, 0, 0, PaintArgs::new(unknown)).unwrap_err();
        assert!(matches!(err, PaintError::Brush(BrushError::UnknownBrush(id)) if id == unknown));
        drop(painter);
        assert!(factory.instantiated.is_empty());
    }

    #[test]
    fn test_bulk_edit_commits_once() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.begin_bulk_edit(&mut grid);
        for _ in 0..5 {
            painter.paint(&mut grid, 0, 0, PaintArgs::new(fence.brush)).unwrap();
        }
        assert!(grid.get_tile(0, 0).unwrap().unwrap().is_dirty());
        assert_eq!(painter.end_bulk_edit(&mut grid), 1);

        for _ in 0..5 {
            painter.paint(&mut grid, 3, 3, PaintArgs::new(fence.brush)).unwrap();
        }
        drop(painter);

        assert_eq!(factory.instantiations_at(0, 0), 1);
        assert_eq!(factory.instantiations_at(3, 3), 5);
        assert!(!grid.get_tile(0, 0).unwrap().unwrap().is_dirty());
        assert!(grid.chunks().all(|(_, chunk)| !chunk.dirty));
    }

    #[test]
    fn test_nested_bulk_edit() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        let committed = painter.bulk_edit(&mut grid, |painter, grid| {
            painter.paint(grid, 0, 0, PaintArgs::new(fence.brush)).unwrap();
            painter.begin_bulk_edit(grid);
            painter.paint(grid, 0, 1, PaintArgs::new(fence.brush)).unwrap();
            painter.end_bulk_edit(grid)
        });
        assert_eq!(committed, 0);
        assert!(!grid.is_bulk_editing());

        // Unbalanced end is logged and ignored
        assert_eq!(painter.end_bulk_edit(&mut grid), 0);
        assert_eq!(grid.bulk_edit_depth(), 0);
        drop(painter);

        assert_eq!(factory.instantiations_at(0, 0), 1);
        assert_eq!(factory.instantiations_at(0, 1), 1);
        assert_eq!(grid.get_tile(0, 0).unwrap().unwrap().orientation_mask, E);
    }

    #[test]
    fn test_erase_destroys_content_and_chunk() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.paint(&mut grid, 0, 0, PaintArgs::new(fence.brush)).unwrap();
        painter.paint(&mut grid, 0, 1, PaintArgs::new(fence.brush)).unwrap();
        assert!(painter.erase(&mut grid, 0, 1).unwrap());
        assert!(!painter.erase(&mut grid, 0, 1).unwrap());

        // The remaining neighbour went back to isolated
        let tile = grid.get_tile(0, 0).unwrap().unwrap();
        assert_eq!(tile.orientation_mask, ISOLATED);

        assert!(painter.erase(&mut grid, 0, 0).unwrap());
        drop(painter);
        assert!(factory.live.is_empty());
        assert_eq!(grid.allocated_chunk_count(), 0);
        assert_eq!(factory.chunk_roots_destroyed, 1);
    }

    #[test]
    fn test_erase_in_bulk_edit_is_deferred() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.paint(&mut grid, 2, 2, PaintArgs::new(fence.brush)).unwrap();
        painter.begin_bulk_edit(&mut grid);
        painter.erase(&mut grid, 2, 2).unwrap();
        assert!(grid.chunk_erasure_pending());
        assert_eq!(grid.allocated_chunk_count(), 1);
        painter.end_bulk_edit(&mut grid);
        drop(painter);

        assert!(factory.live.is_empty());
        assert_eq!(grid.get_tile(2, 2).unwrap(), None);
        assert_eq!(grid.allocated_chunk_count(), 0);
    }

    #[test]
    fn test_erase_keeps_chunks_without_hint() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        grid.hint_erase_empty_chunks = false;
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        painter.paint(&mut grid, 0, 0, PaintArgs::new(fence.brush)).unwrap();
        painter.erase(&mut grid, 0, 0).unwrap();
        assert_eq!(grid.allocated_chunk_count(), 1);
        assert_eq!(painter.erase_empty_chunks(&mut grid), 1);
        assert_eq!(grid.allocated_chunk_count(), 0);
    }

    #[test]
    fn test_refresh_preserves_variation() {
        let mut catalog = BrushCatalog::new();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(ISOLATED, false).unwrap();
        let brush = catalog.insert(Brush::oriented("Flowers", oriented)).unwrap();
        for _ in 0..3 {
            catalog
                .insert_variation(brush, ISOLATED, None, Variation::Template(Uuid::new_v4()), 100)
                .unwrap();
        }

        let mut grid = TileGrid::new(4, 4, 4, 4).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&catalog, &mut factory, rng());
        let args = PaintArgs::new(brush).with_variation(VariationPick::Index(2));
        painter.paint(&mut grid, 1, 1, args).unwrap();

        // Unchanged neighbourhood, nothing to do
        let mut options = RefreshOptions {
            force: false,
            preserve_variations: true,
        };
        assert!(!painter.refresh_tile(&mut grid, 1, 1, options).unwrap());

        options.force = true;
        for _ in 0..10 {
            assert!(painter.refresh_tile(&mut grid, 1, 1, options).unwrap());
            assert_eq!(grid.get_tile(1, 1).unwrap().unwrap().variation_index, 2);
        }
        drop(painter);
        assert_eq!(factory.instantiations_at(1, 1), 11);
        assert_eq!(factory.live.len(), 1);
    }

    #[test]
    fn test_refresh_all_tiles() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        let settings = PainterSettings {
            refresh_surrounding: false,
            ..PainterSettings::default()
        };
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng()).with_settings(settings);

        painter.paint(&mut grid, 1, 0, PaintArgs::new(fence.brush)).unwrap();
        painter.paint(&mut grid, 1, 1, PaintArgs::new(fence.brush)).unwrap();
        // Neighbours were not refreshed, the first tile is stale
        assert_eq!(grid.get_tile(1, 0).unwrap().unwrap().orientation_mask, ISOLATED);

        let refreshed = painter.refresh_all_tiles(&mut grid, RefreshOptions::default()).unwrap();
        drop(painter);
        assert_eq!(refreshed, 1);
        assert_eq!(grid.get_tile(1, 0).unwrap().unwrap().orientation_mask, E);
        assert_eq!(factory.instantiations_at(1, 0), 2);
        assert_eq!(factory.instantiations_at(1, 1), 1);
    }

    #[test]
    fn test_scan_broken_tiles() {
        let fence = fence();
        let mut grid = TileGrid::new(4, 4, 2, 2).unwrap();
        let mut factory = RecordingFactory::default();
        factory.refuse_instantiation = true;
        {
            let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());
            painter.paint(&mut grid, 0, 0, PaintArgs::new(fence.brush)).unwrap();
            painter.paint(&mut grid, 3, 3, PaintArgs::new(fence.brush)).unwrap();
        }
        assert!(grid.tiles().all(|(_, _, tile)| tile.content.is_none()));

        factory.refuse_instantiation = false;
        let mut painter = TilePainter::new(&fence.catalog, &mut factory, rng());

        grid.begin_bulk_edit();
        assert_eq!(painter.scan_broken_tiles(&mut grid).unwrap(), 0);
        painter.end_bulk_edit(&mut grid);

        assert_eq!(painter.scan_broken_tiles(&mut grid).unwrap(), 2);
        assert_eq!(painter.scan_broken_tiles(&mut grid).unwrap(), 0);
        drop(painter);
        assert!(grid.tiles().all(|(_, _, tile)| tile.content.is_some()));
    }

    #[test]
    fn test_procedural_meshes() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Ground".to_string(), 16, 4, 4));
        let brush = catalog
            .insert(Brush::tileset("Dirt", TilesetBrush::new(tileset, 2).procedural(true)))
            .unwrap();

        let mut grid = TileGrid::new(4, 4, 4, 4).unwrap();
        let mut factory = RecordingFactory::default();
        let mut painter = TilePainter::new(&catalog, &mut factory, rng());
        let chunk = ChunkCoord { row: 0, column: 0 };

        painter.paint(&mut grid, 0, 0, PaintArgs::new(brush)).unwrap();
        painter.paint(&mut grid, 0, 1, PaintArgs::new(brush)).unwrap();
        painter.bulk_edit(&mut grid, |painter, grid| {
            painter.paint(grid, 1, 0, PaintArgs::new(brush)).unwrap();
            painter.paint(grid, 1, 1, PaintArgs::new(brush)).unwrap();
        });
        painter.erase(&mut grid, 0, 0).unwrap();
        drop(painter);

        assert!(factory.instantiated.is_empty());
        assert_eq!(
            factory.mesh_rebuilds,
            vec![(chunk, 1), (chunk, 2), (chunk, 4), (chunk, 3)]
        );
        assert!(!grid.chunk(chunk).unwrap().procedural_dirty);
    }

    #[test]
    fn test_failed_neighbour_refresh_still_finishes() {
        let mut catalog = BrushCatalog::new();
        let tileset = catalog.add_tileset(Tileset::new("Ground".to_string(), 16, 4, 4));
        let dirt = catalog
            .insert(Brush::tileset("Dirt", TilesetBrush::new(tileset, 2).procedural(true)))
            .unwrap();
        let mut oriented = OrientedBrush::new();
        oriented.add_orientation(ISOLATED, false).unwrap();
        let bush = catalog.insert(Brush::oriented("Bush", oriented)).unwrap();
        catalog
            .insert_variation(bush, ISOLATED, None, Variation::Template(Uuid::new_v4()), 0)
            .unwrap();

        // A saved catalog whose only weighted variation sits past index 255
        let mut value = serde_json::to_value(&catalog).unwrap();
        let variations = value["brushes"][bush.to_string().as_str()]["kind"]["orientations"][0]
            ["variations"]
            .as_array_mut()
            .unwrap();
        for weight in std::iter::repeat(0).take(255).chain([100]) {
            variations.push(serde_json::json!({
                "variation": { "type": "Template", "id": Uuid::new_v4() },
                "weight": weight,
            }));
        }
        let mut catalog: BrushCatalog = serde_json::from_value(value).unwrap();
        catalog.after_deserialize();

        let mut grid = TileGrid::new(4, 4, 4, 4).unwrap();
        let mut factory = RecordingFactory::default();
        grid.set_tile_from(0, 1, &TileRecord::painted_with(bush, 0), &mut factory)
            .unwrap();
        let settings = PainterSettings {
            preserve_variations_on_refresh: false,
            refresh_surrounding: true,
        };
        let mut painter = TilePainter::new(&catalog, &mut factory, rng()).with_settings(settings);

        let result = painter.paint(&mut grid, 0, 0, PaintArgs::new(dirt));
        drop(painter);

        assert!(matches!(
            result,
            Err(PaintError::Brush(BrushError::TooManyVariations(256)))
        ));
        assert!(grid.get_tile(0, 0).unwrap().unwrap().is_procedural());
        assert_eq!(factory.mesh_rebuilds, vec![(ChunkCoord { row: 0, column: 0 }, 1)]);
    }
}
