//! Content instantiation seam
//!
//! The engine never creates visual objects itself. A [`ContentFactory`]
//! supplied by the caller turns [`ContentRequest`]s into opaque
//! [`ContentHandle`]s and destroys them again; the grid only stores handles.

use crate::tile::TileRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle to content owned by the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHandle(pub u64);

/// Position of a chunk within the grid's chunk array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub row: u32,
    pub column: u32,
}

/// What a factory should instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// A content template (prefab) referenced by a brush variation
    Template(Uuid),
    /// A single cell of a tileset atlas
    TilesetCell { tileset: Uuid, index: u32 },
}

/// A request to instantiate content for one tile
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub source: ContentSource,
    pub row: u32,
    pub column: u32,
    /// The prepared tile the content is created for
    pub tile: &'a TileRecord,
    /// Content holder of the owning chunk, if the factory created one
    pub chunk_root: Option<ContentHandle>,
}

/// Local transform of instantiated content relative to the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileTransform {
    pub position: [f32; 3],
    /// Clockwise quarter turns about the grid normal
    pub quarter_turns: u8,
    pub scale: [f32; 3],
}

impl Default for TileTransform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            quarter_turns: 0,
            scale: [1.0; 3],
        }
    }
}

/// Post-processing applied to content after it has been created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u8>,
    /// Pairs of (original material, replacement material)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub material_remap: Vec<(Uuid, Uuid)>,
}

impl ContentOverrides {
    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.layer.is_none() && self.material_remap.is_empty()
    }
}

/// A procedural tile handed to [`ContentFactory::rebuild_procedural_mesh`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProceduralTile {
    pub row: u32,
    pub column: u32,
    pub tileset: Uuid,
    pub index: u32,
    pub rotation: u8,
    /// Atlas rectangle, see [`Tileset::uv_rect`](crate::Tileset::uv_rect)
    pub uv: [f32; 4],
}

/// Creates and destroys the content painted tiles own.
///
/// Only `instantiate` and `destroy` are required; the remaining hooks default
/// to doing nothing so headless callers stay small.
pub trait ContentFactory {
    /// Create content for a tile. `None` means nothing could be created.
    fn instantiate(&mut self, request: &ContentRequest<'_>) -> Option<ContentHandle>;

    /// Destroy content previously returned by `instantiate`
    fn destroy(&mut self, handle: ContentHandle);

    fn set_transform(&mut self, _handle: ContentHandle, _transform: &TileTransform) {}

    fn apply_overrides(&mut self, _handle: ContentHandle, _overrides: &ContentOverrides) {}

    /// Create the holder object for a newly allocated chunk
    fn create_chunk_root(&mut self, _chunk: ChunkCoord) -> Option<ContentHandle> {
        None
    }

    fn destroy_chunk_root(&mut self, _root: ContentHandle) {}

    /// A chunk root may only be destroyed when nothing else is attached to it
    fn chunk_root_is_disposable(&self, _root: ContentHandle) -> bool {
        true
    }

    /// Regenerate the procedural mesh of a chunk from its procedural tiles
    fn rebuild_procedural_mesh(&mut self, _chunk: ChunkCoord, _tiles: &[ProceduralTile]) {}
}
