//! Collider reduction
//!
//! Static tiles usually carry one box collider each. `ColliderReducer`
//! replaces runs of compatible, face-adjacent boxes with a single combined
//! box: a greedy scan anchors on each unmerged tile (rows top to bottom,
//! columns left to right), grows the widest run to the right, then grows the
//! run downwards one row at a time.

use crate::pool::{ColliderInfoPool, PoolScope};
use crate::threshold::{error_threshold, ThresholdScope};
use serde::{Deserialize, Serialize};
use tilepaint_brush::BrushCatalog;
use tilepaint_core::{
    Bounds, ColliderKind, ContentFactory, ContentHandle, TileCollider, TileFacing, TileGrid,
};
use tracing::{debug, warn};

/// Content host that also manages box colliders
pub trait ColliderHost: ContentFactory {
    /// Box collider attached to `handle`, in grid-local space
    fn box_collider(&self, handle: ContentHandle) -> Option<TileCollider>;

    /// Remove the box collider from `handle`. Returns `true` when the content
    /// is left with nothing else attached and can be stripped.
    fn remove_box_collider(&mut self, handle: ContentHandle) -> bool;

    /// Create a standalone object carrying `collider`
    fn spawn_combined_collider(&mut self, collider: &TileCollider) -> Option<ContentHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerOptions {
    /// Tiles flagged solid without a collider of their own take part as a
    /// cell-sized box
    pub solid_flag_generates_colliders: bool,
    /// Only merge colliders with the same tag
    pub keep_separate_tags: bool,
    /// Only merge colliders on the same layer
    pub keep_separate_layers: bool,
}

impl Default for ReducerOptions {
    fn default() -> Self {
        Self {
            solid_flag_generates_colliders: true,
            keep_separate_tags: true,
            keep_separate_layers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCollider {
    pub handle: ContentHandle,
    pub collider: TileCollider,
    /// Tiles absorbed into the box
    pub tile_count: usize,
    pub rows: u32,
    pub columns: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReductionReport {
    pub combined: Vec<CombinedCollider>,
    /// Tile colliders removed in favour of a combined one
    pub colliders_removed: usize,
    /// Tile contents destroyed because nothing but the collider was left
    pub tiles_stripped: usize,
}

#[derive(Debug, Default)]
pub struct ColliderReducer {
    pub options: ReducerOptions,
    pool: ColliderInfoPool,
}

impl ColliderReducer {
    pub fn new(options: ReducerOptions) -> Self {
        Self {
            options,
            pool: ColliderInfoPool::new(),
        }
    }

    /// Scratch records currently borrowed from the pool
    pub fn outstanding_records(&self) -> usize {
        self.pool.outstanding()
    }

    /// Merge the colliders of the static tiles in `grid`.
    ///
    /// Corner matching uses the grid's snap threshold for the duration of
    /// the pass.
    pub fn reduce(
        &mut self,
        grid: &mut TileGrid,
        catalog: &BrushCatalog,
        host: &mut dyn ColliderHost,
    ) -> ReductionReport {
        let _threshold = ThresholdScope::new(grid.snap_threshold);
        let threshold = error_threshold();
        let options = self.options;
        let mut scope = self.pool.scope();

        let (rows, columns) = (grid.row_count(), grid.column_count());
        let mut cells: Vec<Option<usize>> = vec![None; rows as usize * columns as usize];
        let cell_extent = cell_extent(grid);

        for (row, column, tile) in grid.tiles() {
            let Some(brush) = tile.brush.and_then(|id| catalog.get(id)) else {
                continue;
            };
            if !brush.properties.is_static {
                continue;
            }
            let real = tile.content.and_then(|handle| host.box_collider(handle).map(|c| (handle, c)));
            let (collider, content, hypothetical) = match real {
                Some((handle, collider)) => (collider, Some(handle), false),
                None if options.solid_flag_generates_colliders && tile.is_solid() => {
                    let bounds = Bounds::new(grid.local_point(row, column), cell_extent);
                    let mut collider = TileCollider::new(ColliderKind::default(), bounds);
                    collider.tag = brush.properties.overrides.tag.clone();
                    collider.layer = brush.properties.overrides.layer.unwrap_or(0);
                    (collider, None, true)
                }
                None => continue,
            };

            let index = scope.spawn();
            let info = scope.get_mut(index);
            info.row = row;
            info.column = column;
            info.collider = Some(collider);
            info.content = content;
            info.hypothetical = hypothetical;
            cells[row as usize * columns as usize + column as usize] = Some(index);
        }

        let cell = |row: u32, column: u32| -> Option<usize> {
            if row < rows && column < columns {
                cells[row as usize * columns as usize + column as usize]
            } else {
                None
            }
        };

        let mut report = ReductionReport::default();
        for row in 0..rows {
            for column in 0..columns {
                let Some(anchor) = cell(row, column) else {
                    continue;
                };
                if scope.get(anchor).merged {
                    continue;
                }
                let Some(template) = scope.get(anchor).collider.clone() else {
                    continue;
                };

                // Candidate for joining the anchor's box
                let candidate = |scope: &PoolScope<'_>, r: u32, c: u32| -> Option<(usize, Bounds)> {
                    let index = cell(r, c)?;
                    let info = scope.get(index);
                    let collider = info.collider.as_ref()?;
                    (!info.merged && compatible(&options, &template, collider))
                        .then_some((index, collider.bounds))
                };

                let mut bounds = template.bounds;
                let mut members = vec![anchor];

                let mut end = column;
                while let Some((index, next)) = candidate(&scope, row, end + 1) {
                    if !bounds.can_merge_with(&next, threshold) {
                        break;
                    }
                    bounds = bounds.encapsulate(&next);
                    members.push(index);
                    end += 1;
                }

                let mut last_row = row;
                'rows: for r in row + 1..rows {
                    let mut row_members = Vec::with_capacity((end - column + 1) as usize);
                    let mut row_bounds: Option<Bounds> = None;
                    for c in column..=end {
                        let Some((index, next)) = candidate(&scope, r, c) else {
                            break 'rows;
                        };
                        row_bounds = match row_bounds {
                            None => Some(next),
                            Some(current) if current.can_merge_with(&next, threshold) => {
                                Some(current.encapsulate(&next))
                            }
                            Some(_) => break 'rows,
                        };
                        row_members.push(index);
                    }
                    let Some(row_bounds) = row_bounds else {
                        break;
                    };

                    // Taking this row would cut a wider run in two
                    let left = column.checked_sub(1).and_then(|c| candidate(&scope, r, c));
                    let right = candidate(&scope, r, end + 1);
                    if [left, right]
                        .into_iter()
                        .flatten()
                        .any(|(_, side)| side.can_merge_with(&row_bounds, threshold))
                    {
                        break;
                    }

                    if !bounds.can_merge_with(&row_bounds, threshold) {
                        warn!(row = r, column, "row boxes do not line up with the merged box, stopping");
                        break;
                    }
                    bounds = bounds.encapsulate(&row_bounds);
                    members.extend(row_members);
                    last_row = r;
                }

                for &index in &members {
                    scope.get_mut(index).merged = true;
                }
                let hypothetical = scope.get(anchor).hypothetical;
                if members.len() < 2 && !hypothetical {
                    continue;
                }

                let combined = TileCollider { bounds, ..template };
                let Some(handle) = host.spawn_combined_collider(&combined) else {
                    warn!(row, column, "could not create a combined collider, tile colliders kept");
                    continue;
                };

                for &index in &members {
                    let info = scope.get(index);
                    let Some(content) = info.content else {
                        continue;
                    };
                    let (r, c) = (info.row, info.column);
                    report.colliders_removed += 1;
                    if host.remove_box_collider(content) {
                        host.destroy(content);
                        if let Ok(Some(tile)) = grid.get_tile_mut(r, c) {
                            tile.content = None;
                        }
                        report.tiles_stripped += 1;
                    }
                }

                report.combined.push(CombinedCollider {
                    handle,
                    collider: combined,
                    tile_count: members.len(),
                    rows: last_row - row + 1,
                    columns: end - column + 1,
                });
            }
        }

        debug!(
            candidates = scope.len(),
            combined = report.combined.len(),
            removed = report.colliders_removed,
            stripped = report.tiles_stripped,
            "collider reduction finished"
        );
        report
    }
}

/// Extent of one cell along the local axes
fn cell_extent(grid: &TileGrid) -> [f32; 3] {
    let [x, y, z] = grid.cell_size;
    match grid.facing {
        TileFacing::Sideways => [x, y, z],
        TileFacing::Upwards => [x, z, y],
    }
}

fn compatible(options: &ReducerOptions, a: &TileCollider, b: &TileCollider) -> bool {
    a.is_compatible_with(b)
        && (!options.keep_separate_tags || a.tag == b.tag)
        && (!options.keep_separate_layers || a.layer == b.layer)
}
