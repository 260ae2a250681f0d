//! Brushes painting cells of a tileset atlas

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tilepaint_core::orientation::{neighbors, optimize_corners};
use uuid::Uuid;

/// Paints one fixed atlas cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetBrush {
    pub tileset: Uuid,
    pub tile_index: u32,
    /// Drawn by the chunk mesh instead of instantiated content
    #[serde(default)]
    pub procedural: bool,
    /// Template instantiated instead of the bare atlas cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_template: Option<Uuid>,
}

impl TilesetBrush {
    pub fn new(tileset: Uuid, tile_index: u32) -> Self {
        Self {
            tileset,
            tile_index,
            procedural: false,
            attached_template: None,
        }
    }

    pub fn procedural(mut self, procedural: bool) -> Self {
        self.procedural = procedural;
        self
    }
}

/// Arrangement of autotile artwork in the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutotileLayout {
    /// 16 tiles selected by the 4 orthogonal neighbours
    #[default]
    Basic,
    /// 47-tile blob: diagonals count only when both adjacent sides connect
    Extended,
}

impl AutotileLayout {
    pub fn tile_count(&self) -> u32 {
        match self {
            AutotileLayout::Basic => 16,
            AutotileLayout::Extended => 47,
        }
    }

    /// Offset from the first autotile cell for a neighbour mask
    pub fn layout_index(&self, mask: u8) -> u32 {
        match self {
            AutotileLayout::Basic => basic_index(mask),
            AutotileLayout::Extended => {
                let optimized = optimize_corners(mask);
                blob_masks()
                    .binary_search(&optimized)
                    .map_or(0, |index| index as u32)
            }
        }
    }
}

/// N = 1, E = 2, S = 4, W = 8
fn basic_index(mask: u8) -> u32 {
    let mut index = 0;
    if mask & neighbors::N != 0 {
        index |= 1;
    }
    if mask & neighbors::E != 0 {
        index |= 2;
    }
    if mask & neighbors::S != 0 {
        index |= 4;
    }
    if mask & neighbors::W != 0 {
        index |= 8;
    }
    index
}

/// The 47 distinct corner-optimised masks, ascending
fn blob_masks() -> &'static [u8] {
    static MASKS: OnceLock<Vec<u8>> = OnceLock::new();
    MASKS.get_or_init(|| {
        let mut masks: Vec<u8> = (0..=255u8).map(optimize_corners).collect();
        masks.sort_unstable();
        masks.dedup();
        masks
    })
}

/// Paints a tileset cell chosen from the neighbour mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutotileBrush {
    pub tileset: Uuid,
    #[serde(default)]
    pub layout: AutotileLayout,
    /// Atlas index of the layout's first tile
    #[serde(default)]
    pub first_tile: u32,
    #[serde(default)]
    pub procedural: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_template: Option<Uuid>,
}

impl AutotileBrush {
    pub fn new(tileset: Uuid, layout: AutotileLayout, first_tile: u32) -> Self {
        Self {
            tileset,
            layout,
            first_tile,
            procedural: false,
            attached_template: None,
        }
    }

    pub fn procedural(mut self, procedural: bool) -> Self {
        self.procedural = procedural;
        self
    }

    /// Atlas index painted for `mask`
    pub fn tile_index(&self, mask: u8) -> u32 {
        self.first_tile + self.layout.layout_index(mask)
    }

    /// One past the highest atlas index this brush can paint
    pub fn end_tile(&self) -> u32 {
        self.first_tile + self.layout.tile_count()
    }
}
