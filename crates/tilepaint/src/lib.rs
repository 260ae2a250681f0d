//! tilepaint - brush-driven tile painting
//!
//! Paint a chunked grid with brushes that pick their content from the
//! neighbourhood of each cell:
//! - [`core`] - Orientation masks, tile records, the chunked grid and the
//!   content factory seam
//! - [`brush`] - Tileset, autotile, oriented and alias brushes and the
//!   catalog that owns them
//! - [`runtime`] - The painter (bulk edits, refresh, broken-tile repair) and
//!   the collider reducer
//!
//! Most users only need the prelude:
//!
//! ```rust,ignore
//! use tilepaint::prelude::*;
//! ```

pub mod prelude;

pub use tilepaint_brush as brush;
pub use tilepaint_core as core;
#[cfg(feature = "runtime")]
pub use tilepaint_runtime as runtime;
