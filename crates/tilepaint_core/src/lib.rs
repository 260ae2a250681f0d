//! Core data structures for tilepaint
//!
//! This crate provides the fundamental, engine-free types the painting engine
//! operates on:
//! - `orientation` - 8-neighbour mask algebra (rotation, connection counting)
//! - `TileRecord` - Per-cell painted state and flags
//! - `Chunk` / `TileGrid` - Chunked sparse tile storage with lazy allocation
//! - `ContentFactory` - Seam to whatever instantiates visual content
//! - `Bounds` / `TileCollider` - Collider data consumed by the reducer
//! - `Tileset` - Atlas description referenced by tileset brushes

mod chunk;
mod collision;
mod content;
mod error;
mod grid;
pub mod orientation;
mod tile;
mod tileset;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chunk::Chunk;
pub use collision::{Bounds, ColliderKind, TileCollider};
pub use content::{
    ChunkCoord, ContentFactory, ContentHandle, ContentOverrides, ContentRequest, ContentSource,
    ProceduralTile, TileTransform,
};
pub use error::GridError;
pub use grid::{BulkEditTransition, TileFacing, TileGrid};
pub use tile::{flags, TileRecord, UserFlagLabels, USER_FLAG_COUNT};
pub use tileset::Tileset;
