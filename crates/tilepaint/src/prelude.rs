pub use tilepaint_core::orientation::{self, ISOLATED, SURROUNDED};
pub use tilepaint_core::{
    Bounds, ChunkCoord, ColliderKind, ContentFactory, ContentHandle, ContentOverrides,
    ContentRequest, ContentSource, GridError, ProceduralTile, TileCollider, TileFacing, TileGrid,
    TileRecord, TileTransform, Tileset,
};

pub use tilepaint_brush::{
    AliasBrush, AutotileBrush, AutotileLayout, Brush, BrushCatalog, BrushError, BrushKind,
    BrushProperties, Coalesce, CoalescingRules, FallbackMode, OrientedBrush, ScaleMode,
    TilesetBrush, Variation, VariationPick,
};

#[cfg(feature = "runtime")]
pub use tilepaint_runtime::{
    ColliderHost, ColliderReducer, PaintArgs, PaintError, ReducerOptions, RefreshOptions,
    TilePainter, TilepaintConfig,
};
