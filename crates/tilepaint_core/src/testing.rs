//! Test doubles shared by the tilepaint crates.
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! the tests of dependent crates.
#![allow(dead_code)]

use crate::content::{
    ChunkCoord, ContentFactory, ContentHandle, ContentOverrides, ContentRequest, ContentSource,
    ProceduralTile, TileTransform,
};
use std::collections::{HashMap, HashSet};

/// A content factory that records every call it receives
#[derive(Debug, Default)]
pub struct RecordingFactory {
    next_handle: u64,
    /// `(row, column, source)` of every instantiation, in call order
    pub instantiated: Vec<(u32, u32, ContentSource)>,
    pub destroyed: Vec<ContentHandle>,
    /// Handles created and not yet destroyed
    pub live: HashSet<ContentHandle>,
    pub transforms: HashMap<ContentHandle, TileTransform>,
    pub overrides: HashMap<ContentHandle, ContentOverrides>,
    pub chunk_roots_created: usize,
    pub chunk_roots_destroyed: usize,
    /// Chunk roots reported as having foreign components attached
    pub pinned_roots: HashSet<ContentHandle>,
    /// `(chunk, procedural tile count)` for every mesh rebuild
    pub mesh_rebuilds: Vec<(ChunkCoord, usize)>,
    /// When set, `instantiate` returns `None`
    pub refuse_instantiation: bool,
}

impl RecordingFactory {
    fn allocate(&mut self) -> ContentHandle {
        self.next_handle += 1;
        ContentHandle(self.next_handle)
    }

    /// Number of instantiations performed for `(row, column)`
    pub fn instantiations_at(&self, row: u32, column: u32) -> usize {
        self.instantiated
            .iter()
            .filter(|(r, c, _)| (*r, *c) == (row, column))
            .count()
    }
}

impl ContentFactory for RecordingFactory {
    fn instantiate(&mut self, request: &ContentRequest<'_>) -> Option<ContentHandle> {
        if self.refuse_instantiation {
            return None;
        }
        let handle = self.allocate();
        self.instantiated
            .push((request.row, request.column, request.source));
        self.live.insert(handle);
        Some(handle)
    }

    fn destroy(&mut self, handle: ContentHandle) {
        self.live.remove(&handle);
        self.transforms.remove(&handle);
        self.destroyed.push(handle);
    }

    fn set_transform(&mut self, handle: ContentHandle, transform: &TileTransform) {
        self.transforms.insert(handle, *transform);
    }

    fn apply_overrides(&mut self, handle: ContentHandle, overrides: &ContentOverrides) {
        self.overrides.insert(handle, overrides.clone());
    }

    fn create_chunk_root(&mut self, _chunk: ChunkCoord) -> Option<ContentHandle> {
        self.chunk_roots_created += 1;
        Some(self.allocate())
    }

    fn destroy_chunk_root(&mut self, _root: ContentHandle) {
        self.chunk_roots_destroyed += 1;
    }

    fn chunk_root_is_disposable(&self, root: ContentHandle) -> bool {
        !self.pinned_roots.contains(&root)
    }

    fn rebuild_procedural_mesh(&mut self, chunk: ChunkCoord, tiles: &[ProceduralTile]) {
        self.mesh_rebuilds.push((chunk, tiles.len()));
    }
}
