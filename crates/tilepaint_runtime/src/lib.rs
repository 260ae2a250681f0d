//! Painting engine for tilepaint
//!
//! This crate drives brushes over a grid:
//! - `TilePainter` - Paint, erase and refresh tiles, bulk-edit batching,
//!   broken-tile repair and procedural mesh upkeep
//! - `ColliderReducer` - Greedy merging of static tile box colliders
//! - `TilepaintConfig` - TOML settings for grids, painting and reduction
//!
//! # Example
//!
//! ```rust,ignore
//! use rand::{rngs::SmallRng, SeedableRng};
//! use tilepaint_runtime::{PaintArgs, TilePainter, TilepaintConfig};
//!
//! let config = TilepaintConfig::load("tilepaint.toml")?;
//! let mut grid = config.grid.build()?;
//! let mut painter = TilePainter::new(&catalog, &mut factory, SmallRng::seed_from_u64(0))
//!     .with_settings(config.painter);
//! painter.bulk_edit(&mut grid, |painter, grid| {
//!     for column in 0..10 {
//!         painter.paint(grid, 0, column, PaintArgs::new(wall))?;
//!     }
//!     Ok::<_, tilepaint_runtime::PaintError>(())
//! })?;
//! ```

pub mod collision;
pub mod config;
mod error;
pub mod painter;
mod pool;
pub mod threshold;

pub use collision::{
    ColliderHost, ColliderReducer, CombinedCollider, ReducerOptions, ReductionReport,
};
pub use config::{GridSettings, PainterSettings, TilepaintConfig};
pub use error::PaintError;
pub use painter::{PaintArgs, RefreshOptions, TilePainter};
pub use pool::{ColliderInfo, ColliderInfoPool, PoolScope};
pub use threshold::{error_threshold, set_error_threshold, ThresholdScope};
