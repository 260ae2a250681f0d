//! Neighbour connectivity
//!
//! Decides which of a cell's 8 neighbours connect to a brush, producing the
//! orientation mask used to pick autotile cells and oriented variations.

use crate::brush::{Brush, Coalesce};
use tilepaint_core::orientation::{calculate_mask, rotate_anticlockwise};
use tilepaint_core::{TileGrid, TileRecord};
use uuid::Uuid;

/// Whether `neighbor` connects to a tile painted with `brush`.
///
/// `neighbor_group` resolves the coalescing group of the neighbour's brush.
pub fn is_coalesced<G>(
    brush: &Brush,
    painted_rotation: u8,
    neighbor: &TileRecord,
    neighbor_group: G,
) -> bool
where
    G: Fn(Uuid) -> Option<i32>,
{
    let rules = &brush.properties.coalescing;
    let Some(other) = neighbor.brush else {
        return false;
    };
    if !rules.with_rotated && neighbor.painted_rotation % 4 != painted_rotation % 4 {
        return false;
    }

    let own = other == brush.id;
    let in_group = || neighbor_group(other).is_some_and(|group| rules.has_group(group));
    match rules.coalesce {
        Coalesce::None => false,
        Coalesce::Own => own,
        Coalesce::Other => !own,
        Coalesce::OwnAndOther => true,
        Coalesce::Groups => in_group(),
        Coalesce::OwnAndGroups => own || in_group(),
    }
}

/// Orientation mask of `(row, column)` for a tile painted with `brush`.
///
/// Neighbours are sampled in grid space and the result is rotated back by
/// `painted_rotation`, so a rotated tile sees its neighbours in its own frame.
pub fn orientation_mask_at<G>(
    grid: &TileGrid,
    row: u32,
    column: u32,
    brush: &Brush,
    painted_rotation: u8,
    neighbor_group: G,
) -> u8
where
    G: Fn(Uuid) -> Option<i32>,
{
    let with_border = brush.properties.coalescing.with_border;
    let mask = calculate_mask(row as i32, column as i32, |r, c| {
        let (r, c) = (r as i64, c as i64);
        if !grid.in_bounds(r, c) {
            return with_border;
        }
        grid.get_tile_or_null(r, c)
            .is_some_and(|tile| is_coalesced(brush, painted_rotation, tile, &neighbor_group))
    });
    rotate_anticlockwise(mask, painted_rotation)
}
