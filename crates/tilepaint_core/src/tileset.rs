//! Tileset atlas description

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An atlas of equally sized tiles referenced by tileset and autotile brushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub id: Uuid,
    pub name: String,
    /// Tile size in pixels (assumes square tiles)
    pub tile_size: u32,
    pub columns: u32,
    pub rows: u32,
    /// Material the atlas is rendered with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Uuid>,
    /// Default for brushes created from this tileset
    #[serde(default = "default_procedural")]
    pub procedural: bool,
}

fn default_procedural() -> bool {
    true
}

impl Tileset {
    pub fn new(name: String, tile_size: u32, columns: u32, rows: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            tile_size,
            columns,
            rows,
            material: None,
            procedural: true,
        }
    }

    pub fn with_material(mut self, material: Uuid) -> Self {
        self.material = Some(material);
        self
    }

    /// Total number of tiles in the atlas
    pub fn tile_count(&self) -> u32 {
        self.columns.saturating_mul(self.rows)
    }

    pub fn contains(&self, tile_index: u32) -> bool {
        tile_index < self.tile_count()
    }

    /// Convert a tile index to (column, row) within the atlas
    pub fn index_to_grid(&self, tile_index: u32) -> Option<(u32, u32)> {
        if !self.contains(tile_index) {
            return None;
        }
        Some((tile_index % self.columns, tile_index / self.columns))
    }

    /// Normalised `[u_min, v_min, u_max, v_max]` of a tile, v growing downwards
    pub fn uv_rect(&self, tile_index: u32) -> Option<[f32; 4]> {
        let (col, row) = self.index_to_grid(tile_index)?;
        let du = 1.0 / self.columns as f32;
        let dv = 1.0 / self.rows as f32;
        Some([
            col as f32 * du,
            row as f32 * dv,
            (col + 1) as f32 * du,
            (row + 1) as f32 * dv,
        ])
    }
}
