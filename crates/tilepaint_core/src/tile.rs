//! Per-cell tile state

use crate::content::ContentHandle;
use crate::error::GridError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of user-assignable flags on a tile
pub const USER_FLAG_COUNT: usize = 16;

/// Tile flag bits
pub mod flags {
    /// Flags 1-16, free for game use
    pub const USER_MASK: u32 = 0x0000_FFFF;
    /// Tile is solid (may generate a hypothetical collider)
    pub const SOLID: u32 = 1 << 16;
    /// Tile is drawn by its chunk's procedural mesh rather than instantiated content
    pub const PROCEDURAL: u32 = 1 << 17;
    /// Tile changed during a bulk edit and awaits commit
    pub const DIRTY: u32 = 1 << 18;
}

/// State of a single painted cell.
///
/// A record is logically deleted by [`TileRecord::clear`] and may then be
/// recycled for a later paint. A record is empty when it holds neither a
/// brush nor content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Brush that painted this tile (non-owning)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brush: Option<Uuid>,
    /// Tileset atlas the tile is drawn from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset: Option<Uuid>,
    /// Cell of the tileset atlas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset_index: Option<u32>,
    /// Connectivity of the 8 neighbours when the tile was last prepared
    #[serde(default)]
    pub orientation_mask: u8,
    /// Chosen variation of the resolved orientation
    #[serde(default)]
    pub variation_index: u8,
    /// Effective rotation in quarter turns (0-3)
    #[serde(default)]
    pub rotation: u8,
    /// Rotation requested when painting, before orientation adjustment (0-3)
    #[serde(default)]
    pub painted_rotation: u8,
    /// See [`flags`]
    #[serde(default)]
    pub flags: u32,
    /// Instantiated content owned by this tile
    #[serde(skip)]
    pub content: Option<ContentHandle>,
}

impl TileRecord {
    /// A scratch record for a paint operation
    pub fn painted_with(brush: Uuid, rotation: u8) -> Self {
        Self {
            brush: Some(brush),
            rotation: rotation % 4,
            painted_rotation: rotation % 4,
            ..Self::default()
        }
    }

    /// True when the record holds neither a brush nor content
    pub fn is_empty(&self) -> bool {
        self.brush.is_none() && self.content.is_none()
    }

    /// Clear every field, handing back any content the tile owned
    pub fn clear(&mut self) -> Option<ContentHandle> {
        let content = self.content.take();
        *self = Self::default();
        content
    }

    /// Overwrite this record with `source`, keeping the allocation
    pub fn copy_from(&mut self, source: &TileRecord) {
        self.clone_from(source);
    }

    /// Geometry-affecting fields match (rotation, mask, tileset cell, variation)
    pub fn same_geometry(&self, other: &TileRecord) -> bool {
        self.rotation == other.rotation
            && self.orientation_mask == other.orientation_mask
            && self.tileset == other.tileset
            && self.tileset_index == other.tileset_index
            && self.variation_index == other.variation_index
    }

    fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    fn set_flag(&mut self, flag: u32, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Get user flag `number` (1-16)
    pub fn user_flag(&self, number: u8) -> Result<bool, GridError> {
        Ok(self.has_flag(user_flag_bit(number)?))
    }

    /// Set user flag `number` (1-16)
    pub fn set_user_flag(&mut self, number: u8, value: bool) -> Result<(), GridError> {
        let bit = user_flag_bit(number)?;
        self.set_flag(bit, value);
        Ok(())
    }

    /// All 16 user flags packed into the low bits
    pub fn user_flags(&self) -> u16 {
        (self.flags & flags::USER_MASK) as u16
    }

    /// Replace all user flags at once
    pub fn set_user_flags(&mut self, user_flags: u16) {
        self.flags = (self.flags & !flags::USER_MASK) | user_flags as u32;
    }

    pub fn is_solid(&self) -> bool {
        self.has_flag(flags::SOLID)
    }

    pub fn set_solid(&mut self, solid: bool) {
        self.set_flag(flags::SOLID, solid);
    }

    pub fn is_procedural(&self) -> bool {
        self.has_flag(flags::PROCEDURAL)
    }

    pub fn set_procedural(&mut self, procedural: bool) {
        self.set_flag(flags::PROCEDURAL, procedural);
    }

    pub fn is_dirty(&self) -> bool {
        self.has_flag(flags::DIRTY)
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.set_flag(flags::DIRTY, dirty);
    }
}

fn user_flag_bit(number: u8) -> Result<u32, GridError> {
    if !(1..=USER_FLAG_COUNT as u8).contains(&number) {
        return Err(GridError::InvalidUserFlag(number));
    }
    Ok(1 << (number - 1))
}

/// Display labels for the 16 user flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFlagLabels {
    labels: Vec<String>,
}

impl Default for UserFlagLabels {
    fn default() -> Self {
        Self {
            labels: (1..=USER_FLAG_COUNT).map(|n| format!("Flag {n}")).collect(),
        }
    }
}

impl UserFlagLabels {
    /// Labels must be supplied for exactly 16 flags
    pub fn new(labels: Vec<String>) -> Result<Self, GridError> {
        if labels.len() != USER_FLAG_COUNT {
            return Err(GridError::InvalidFlagLabels(labels.len()));
        }
        Ok(Self { labels })
    }

    /// Label of flag `number` (1-16)
    pub fn label(&self, number: u8) -> Result<&str, GridError> {
        user_flag_bit(number)?;
        Ok(&self.labels[number as usize - 1])
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
