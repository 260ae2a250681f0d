use thiserror::Error;
use tilepaint_core::GridError;
use uuid::Uuid;

/// Errors raised when configuring or resolving brushes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrushError {
    #[error("an orientation with mask {0:#04x} already exists")]
    DuplicateOrientation(u8),
    #[error("no orientation with mask {0:#04x}")]
    UnknownOrientation(u8),
    #[error("variation is already listed for this orientation")]
    DuplicateVariation,
    #[error("variation index {index} out of range ({count} variations)")]
    VariationIndexOutOfRange { index: usize, count: usize },
    #[error("an orientation holds at most {0} variations")]
    TooManyVariations(usize),
    #[error("variation weight {0} is outside 0-100")]
    InvalidWeight(u8),
    #[error("oriented brushes cannot nest other oriented brushes")]
    NestedOrientedBrush,
    #[error("alias brushes cannot target other alias brushes")]
    NestedAlias,
    #[error("tile index {index} out of range for tileset with {count} tiles")]
    TileIndexOutOfRange { index: u32, count: u32 },
    #[error("unknown brush {0}")]
    UnknownBrush(Uuid),
    #[error("unknown tileset {0}")]
    UnknownTileset(Uuid),
    #[error("brush {id} is not {expected}")]
    WrongKind { id: Uuid, expected: &'static str },
    #[error("a brush with id {0} already exists")]
    DuplicateBrush(Uuid),
    #[error(transparent)]
    Grid(#[from] GridError),
}
