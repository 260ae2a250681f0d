//! Chunked tile grid
//!
//! The grid is split into fixed-size chunks that are allocated lazily on the
//! first write inside their range. A chunk index is
//! `(row / chunk_height) * chunk_columns + column / chunk_width`, and a tile's
//! index inside its chunk is `(row % chunk_height) * chunk_width + column % chunk_width`.

use crate::chunk::Chunk;
use crate::content::{ChunkCoord, ContentFactory, ContentHandle};
use crate::error::GridError;
use crate::tile::TileRecord;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Plane the grid's cells are laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TileFacing {
    /// Columns along +X, rows along -Y (side-on 2D)
    #[default]
    Sideways,
    /// Columns along +X, rows along -Z (top-down)
    Upwards,
}

/// Result of leaving a bulk edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkEditTransition {
    /// Still inside an outer bulk edit
    StillBatching,
    /// The outermost bulk edit ended; dirty tiles must be committed now
    Committing,
    /// `end_bulk_edit` without a matching begin; the counter was left at zero
    Unbalanced,
}

/// A `rows × columns` grid of tiles stored in lazily allocated chunks
#[derive(Debug, Clone)]
pub struct TileGrid {
    rows: u32,
    columns: u32,
    chunk_width: u32,
    chunk_height: u32,
    chunk_rows: u32,
    chunk_columns: u32,
    chunks: Vec<Option<Chunk>>,
    /// Size of one cell in local units
    pub cell_size: [f32; 3],
    pub facing: TileFacing,
    /// Permit destroying chunks once they become fully empty
    pub hint_erase_empty_chunks: bool,
    /// Corner-matching tolerance used by collider reduction
    pub snap_threshold: f32,
    bulk_edit_depth: u32,
    chunk_erasure_pending: bool,
}

impl TileGrid {
    pub fn new(
        rows: u32,
        columns: u32,
        chunk_width: u32,
        chunk_height: u32,
    ) -> Result<Self, GridError> {
        if rows == 0 || columns == 0 || chunk_width == 0 || chunk_height == 0 {
            return Err(GridError::InvalidDimensions);
        }

        let chunk_rows = rows.div_ceil(chunk_height);
        let chunk_columns = columns.div_ceil(chunk_width);
        Ok(Self {
            rows,
            columns,
            chunk_width,
            chunk_height,
            chunk_rows,
            chunk_columns,
            chunks: vec![None; chunk_rows as usize * chunk_columns as usize],
            cell_size: [1.0, 1.0, 1.0],
            facing: TileFacing::Sideways,
            hint_erase_empty_chunks: true,
            snap_threshold: 0.001,
            bulk_edit_depth: 0,
            chunk_erasure_pending: false,
        })
    }

    pub fn row_count(&self) -> u32 {
        self.rows
    }

    pub fn column_count(&self) -> u32 {
        self.columns
    }

    pub fn chunk_width(&self) -> u32 {
        self.chunk_width
    }

    pub fn chunk_height(&self) -> u32 {
        self.chunk_height
    }

    pub fn chunk_rows(&self) -> u32 {
        self.chunk_rows
    }

    pub fn chunk_columns(&self) -> u32 {
        self.chunk_columns
    }

    /// Whether a signed `(row, column)` lies on the grid
    pub fn in_bounds(&self, row: i64, column: i64) -> bool {
        row >= 0 && column >= 0 && row < self.rows as i64 && column < self.columns as i64
    }

    fn check_bounds(&self, row: i64, column: i64) -> Result<(u32, u32), GridError> {
        if !self.in_bounds(row, column) {
            return Err(GridError::OutOfRange {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok((row as u32, column as u32))
    }

    /// `(chunk index, intra-chunk index)` of an in-bounds cell
    fn locate(&self, row: u32, column: u32) -> (usize, usize) {
        let chunk_index = (row / self.chunk_height) as usize * self.chunk_columns as usize
            + (column / self.chunk_width) as usize;
        let tile_index = (row % self.chunk_height) as usize * self.chunk_width as usize
            + (column % self.chunk_width) as usize;
        (chunk_index, tile_index)
    }

    fn chunk_coord(&self, chunk_index: usize) -> ChunkCoord {
        let index = chunk_index as u32;
        ChunkCoord {
            row: index / self.chunk_columns,
            column: index % self.chunk_columns,
        }
    }

    /// Grid `(row, column)` of a tile given its chunk and intra-chunk index
    pub fn tile_position(&self, chunk: ChunkCoord, tile_index: usize) -> (u32, u32) {
        let width = self.chunk_width as usize;
        (
            chunk.row * self.chunk_height + (tile_index / width) as u32,
            chunk.column * self.chunk_width + (tile_index % width) as u32,
        )
    }

    /// Tile at `(row, column)`; `Ok(None)` when nothing is painted there
    pub fn get_tile(&self, row: u32, column: u32) -> Result<Option<&TileRecord>, GridError> {
        let (row, column) = self.check_bounds(row as i64, column as i64)?;
        let (chunk_index, tile_index) = self.locate(row, column);
        Ok(self.chunks[chunk_index]
            .as_ref()
            .and_then(|chunk| chunk.tile(tile_index)))
    }

    /// Like [`get_tile`](Self::get_tile) but off-grid positions yield `None`
    pub fn get_tile_or_null(&self, row: i64, column: i64) -> Option<&TileRecord> {
        let (row, column) = self.check_bounds(row, column).ok()?;
        let (chunk_index, tile_index) = self.locate(row, column);
        self.chunks[chunk_index]
            .as_ref()
            .and_then(|chunk| chunk.tile(tile_index))
    }

    /// Mutable non-empty tile at `(row, column)`
    pub fn get_tile_mut(
        &mut self,
        row: u32,
        column: u32,
    ) -> Result<Option<&mut TileRecord>, GridError> {
        let (row, column) = self.check_bounds(row as i64, column as i64)?;
        let (chunk_index, tile_index) = self.locate(row, column);
        Ok(self.chunks[chunk_index]
            .as_mut()
            .and_then(|chunk| chunk.tile_mut(tile_index)))
    }

    /// Record object at `(row, column)`, creating its chunk and slot if needed.
    /// Existing fields (including content) are left untouched.
    pub fn tile_slot_mut(
        &mut self,
        row: u32,
        column: u32,
        factory: &mut dyn ContentFactory,
    ) -> Result<&mut TileRecord, GridError> {
        let (row, column) = self.check_bounds(row as i64, column as i64)?;
        let (chunk_index, tile_index) = self.locate(row, column);
        let chunk = self.ensure_chunk(chunk_index, factory);
        Ok(chunk.slot_mut(tile_index))
    }

    /// Write `source` into `(row, column)`.
    ///
    /// Creates the owning chunk on demand. An existing record object at the
    /// slot is cleared (its content destroyed) and recycled.
    pub fn set_tile_from(
        &mut self,
        row: u32,
        column: u32,
        source: &TileRecord,
        factory: &mut dyn ContentFactory,
    ) -> Result<&mut TileRecord, GridError> {
        let tile = self.tile_slot_mut(row, column, factory)?;
        if let Some(content) = tile.clear() {
            factory.destroy(content);
        }
        tile.copy_from(source);
        Ok(tile)
    }

    /// Clear the record at `(row, column)`, returning the content it owned
    pub fn clear_tile(&mut self, row: u32, column: u32) -> Result<Option<ContentHandle>, GridError> {
        let (row, column) = self.check_bounds(row as i64, column as i64)?;
        let (chunk_index, tile_index) = self.locate(row, column);
        let Some(chunk) = self.chunks[chunk_index].as_mut() else {
            return Ok(None);
        };
        if !chunk.is_allocated(tile_index) {
            return Ok(None);
        }
        Ok(chunk.slot_mut(tile_index).clear())
    }

    fn ensure_chunk(&mut self, chunk_index: usize, factory: &mut dyn ContentFactory) -> &mut Chunk {
        let coord = self.chunk_coord(chunk_index);
        let (width, height) = (self.chunk_width, self.chunk_height);
        self.chunks[chunk_index]
            .get_or_insert_with(|| Chunk::new(width, height, factory.create_chunk_root(coord)))
    }

    /// Chunk owning `(row, column)`, if allocated
    pub fn chunk_at(&self, row: u32, column: u32) -> Option<&Chunk> {
        if !self.in_bounds(row as i64, column as i64) {
            return None;
        }
        let (chunk_index, _) = self.locate(row, column);
        self.chunks[chunk_index].as_ref()
    }

    fn chunk_at_mut(&mut self, row: u32, column: u32) -> Option<&mut Chunk> {
        if !self.in_bounds(row as i64, column as i64) {
            return None;
        }
        let (chunk_index, _) = self.locate(row, column);
        self.chunks[chunk_index].as_mut()
    }

    /// Chunk at chunk coordinates, if allocated
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        if coord.row >= self.chunk_rows || coord.column >= self.chunk_columns {
            return None;
        }
        self.chunks[coord.row as usize * self.chunk_columns as usize + coord.column as usize].as_ref()
    }

    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        if coord.row >= self.chunk_rows || coord.column >= self.chunk_columns {
            return None;
        }
        self.chunks[coord.row as usize * self.chunk_columns as usize + coord.column as usize].as_mut()
    }

    /// Allocated chunks in chunk-index order
    pub fn chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| chunk.as_ref().map(|c| (self.chunk_coord(i), c)))
    }

    /// Number of allocated chunks
    pub fn allocated_chunk_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Non-empty tiles in chunk order, then intra-chunk index order
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32, &TileRecord)> + '_ {
        self.chunks().flat_map(move |(coord, chunk)| {
            chunk.occupied_indices().filter_map(move |i| {
                let (row, column) = self.tile_position(coord, i);
                chunk.tile(i).map(|tile| (row, column, tile))
            })
        })
    }

    /// Flag the record and its chunk dirty for the next commit
    pub fn mark_dirty(&mut self, row: u32, column: u32) {
        if !self.in_bounds(row as i64, column as i64) {
            return;
        }
        let (chunk_index, tile_index) = self.locate(row, column);
        if let Some(chunk) = self.chunks.get_mut(chunk_index).and_then(|c| c.as_mut()) {
            if chunk.is_allocated(tile_index) {
                chunk.slot_mut(tile_index).set_dirty(true);
                chunk.dirty = true;
            }
        }
    }

    /// Positions of dirty records: chunk order, then intra-chunk index order
    pub fn dirty_tiles(&self) -> Vec<(u32, u32)> {
        self.chunks()
            .filter(|(_, chunk)| chunk.dirty)
            .flat_map(|(coord, chunk)| {
                chunk
                    .dirty_indices()
                    .into_iter()
                    .map(move |i| self.tile_position(coord, i))
            })
            .collect()
    }

    /// Clear the dirty flag of every chunk
    pub fn clear_chunk_dirty_flags(&mut self) {
        for chunk in self.chunks.iter_mut().flatten() {
            chunk.dirty = false;
        }
    }

    /// Flag the chunk owning `(row, column)` for a procedural mesh rebuild
    pub fn mark_procedural_dirty(&mut self, row: u32, column: u32) {
        if let Some(chunk) = self.chunk_at_mut(row, column) {
            chunk.procedural_dirty = true;
        }
    }

    // ─── Bulk edit ──────────────────────────────────────────────────────────

    pub fn begin_bulk_edit(&mut self) {
        self.bulk_edit_depth += 1;
    }

    /// Leave one level of bulk editing
    pub fn end_bulk_edit(&mut self) -> BulkEditTransition {
        match self.bulk_edit_depth {
            0 => {
                error!("end_bulk_edit called without a matching begin_bulk_edit");
                BulkEditTransition::Unbalanced
            }
            1 => {
                self.bulk_edit_depth = 0;
                BulkEditTransition::Committing
            }
            _ => {
                self.bulk_edit_depth -= 1;
                BulkEditTransition::StillBatching
            }
        }
    }

    pub fn is_bulk_editing(&self) -> bool {
        self.bulk_edit_depth > 0
    }

    pub fn bulk_edit_depth(&self) -> u32 {
        self.bulk_edit_depth
    }

    // ─── Chunk erasure ──────────────────────────────────────────────────────

    /// Destroy chunks that hold no tiles.
    ///
    /// Requires the grid hint (or `force`). During a bulk edit nothing is
    /// destroyed; the request is remembered and honoured at commit.
    pub fn erase_empty_chunks(&mut self, factory: &mut dyn ContentFactory, force: bool) -> usize {
        if !(force || self.hint_erase_empty_chunks) {
            return 0;
        }
        if self.is_bulk_editing() {
            self.chunk_erasure_pending = true;
            return 0;
        }
        self.chunk_erasure_pending = false;

        let mut erased = 0;
        for slot in self.chunks.iter_mut() {
            let Some(chunk) = slot.as_ref() else {
                continue;
            };
            if !chunk.is_fully_empty() {
                continue;
            }
            if let Some(root) = chunk.root {
                if !factory.chunk_root_is_disposable(root) {
                    continue;
                }
                factory.destroy_chunk_root(root);
            }
            *slot = None;
            erased += 1;
        }
        erased
    }

    /// Whether a chunk erasure was deferred by a bulk edit
    pub fn chunk_erasure_pending(&self) -> bool {
        self.chunk_erasure_pending
    }

    // ─── Geometry ───────────────────────────────────────────────────────────

    /// Local position of the centre of cell `(row, column)`
    pub fn local_point(&self, row: u32, column: u32) -> [f32; 3] {
        let x = (column as f32 + 0.5) * self.cell_size[0];
        let down = (row as f32 + 0.5) * self.cell_size[1];
        match self.facing {
            TileFacing::Sideways => [x, -down, 0.0],
            TileFacing::Upwards => [x, 0.0, -down],
        }
    }
}
