//! Fixed-size block of tile storage

use crate::content::ContentHandle;
use crate::tile::TileRecord;

/// A `width × height` block of tile slots.
///
/// Slots start out unallocated (`None`). Once a slot has held a record the
/// record object stays allocated and is recycled by later paints, even after
/// it has been cleared.
#[derive(Debug, Clone)]
pub struct Chunk {
    width: u32,
    height: u32,
    tiles: Vec<Option<TileRecord>>,
    /// Content holder created by the factory
    pub root: Option<ContentHandle>,
    /// At least one record is dirty and awaits a bulk-edit commit
    pub dirty: bool,
    /// Procedural tiles changed since the mesh was last rebuilt
    pub procedural_dirty: bool,
}

impl Chunk {
    pub fn new(width: u32, height: u32, root: Option<ContentHandle>) -> Self {
        Self {
            width,
            height,
            tiles: vec![None; width as usize * height as usize],
            root,
            dirty: false,
            procedural_dirty: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Non-empty tile at intra-chunk `index`
    pub fn tile(&self, index: usize) -> Option<&TileRecord> {
        self.tiles
            .get(index)
            .and_then(|slot| slot.as_ref())
            .filter(|tile| !tile.is_empty())
    }

    /// Non-empty tile at intra-chunk `index`, mutably
    pub fn tile_mut(&mut self, index: usize) -> Option<&mut TileRecord> {
        self.tiles
            .get_mut(index)
            .and_then(|slot| slot.as_mut())
            .filter(|tile| !tile.is_empty())
    }

    /// Record object at `index`, allocating one if the slot was never used
    pub fn slot_mut(&mut self, index: usize) -> &mut TileRecord {
        self.tiles[index].get_or_insert_with(TileRecord::default)
    }

    /// Whether the record object at `index` has been allocated
    pub fn is_allocated(&self, index: usize) -> bool {
        self.tiles.get(index).map_or(false, |slot| slot.is_some())
    }

    /// True when no slot holds a non-empty record
    pub fn is_fully_empty(&self) -> bool {
        self.tiles
            .iter()
            .all(|slot| slot.as_ref().map_or(true, TileRecord::is_empty))
    }

    /// Intra-chunk indices of non-empty records, in index order
    pub fn occupied_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tiles.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .filter(|tile| !tile.is_empty())
                .map(|_| i)
        })
    }

    /// Intra-chunk indices of records flagged dirty, in index order
    pub fn dirty_indices(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().filter(|t| t.is_dirty()).map(|_| i))
            .collect()
    }

    /// Intra-chunk `(row, column)` of `index`
    pub fn local_position(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        (index / self.width, index % self.width)
    }
}
