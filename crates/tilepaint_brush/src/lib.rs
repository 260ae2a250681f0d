//! Brush hierarchy for tilepaint
//!
//! Brushes decide what a painted cell receives. This crate provides:
//! - `Brush` / `BrushKind` - Empty, tileset, autotile, oriented and alias brushes
//! - `OrientedBrush` - Neighbour-mask orientations with weighted variations
//!   and fallback resolution
//! - `BrushCatalog` - Owner of brushes and tilesets, enforcing the nesting
//!   rules at every mutation
//! - Resolution (`prepare_tile_data`, `create_tile`, `apply_transforms`)
//!   implemented as recursive delegation over the brush variants
//!
//! # Example
//!
//! ```rust,ignore
//! use tilepaint_brush::{Brush, BrushCatalog, OrientedBrush, Variation};
//! use tilepaint_core::orientation::{ISOLATED, SURROUNDED};
//!
//! let mut catalog = BrushCatalog::new();
//! let mut hedge = OrientedBrush::new();
//! hedge.add_orientation(ISOLATED, false)?;
//! hedge.add_orientation(SURROUNDED, false)?;
//! let id = catalog.insert(Brush::oriented("Hedge", hedge))?;
//! catalog.insert_variation(id, SURROUNDED, None, Variation::Template(template), 100)?;
//! ```

mod alias;
mod brush;
mod catalog;
pub mod coalesce;
mod error;
mod oriented;
mod resolve;
mod tileset_brush;

pub use alias::AliasBrush;
pub use brush::{
    Brush, BrushKind, BrushProperties, Coalesce, CoalescingRules, ScaleMode, TransformSettings,
};
pub use catalog::BrushCatalog;
pub use error::BrushError;
pub use oriented::{
    pick_random_variation_index, BrushOrientation, FallbackMode, OrientationLookup,
    OrientedBrush, Variation, WeightedVariation, MAX_VARIATIONS, MAX_VARIATION_WEIGHT,
};
pub use resolve::{PaintContext, TileSite, VariationPick, MAX_DELEGATION_DEPTH};
pub use tileset_brush::{AutotileBrush, AutotileLayout, TilesetBrush};
