//! Cubic tiles and the Morton-ordered queue that schedules them.

use voxel_core::Extent;

use crate::morton::encode;

/// Edge length of a cubic tile, in cells. Recommended by the design for
/// cache-friendly per-tile working sets; boundary tiles are truncated to
/// the field's extents.
pub const TILE_EDGE: i16 = 16;

/// Integer coordinate of a tile within the tile grid (not the cell grid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Tile coordinate along X.
    pub tx: u32,
    /// Tile coordinate along Y.
    pub ty: u32,
    /// Tile coordinate along Z.
    pub tz: u32,
}

impl TileId {
    /// Lexicographic linear index over `(tz, ty, tx)`, given the number of
    /// tiles along X and Y. Monotone in each axis: incrementing any single
    /// coordinate strictly increases this index. This is the ordering the
    /// pair-ownership rule in [`TileBounds`] relies on — the tile with the
    /// lower linear index along whichever axis a pair straddles owns that
    /// pair.
    pub fn linear_index(&self, tiles_x: u32, tiles_y: u32) -> u64 {
        (self.tz as u64 * tiles_y as u64 + self.ty as u64) * tiles_x as u64 + self.tx as u64
    }
}

/// The half-open cell-space bounds of a tile, clipped to the field's
/// extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileBounds {
    /// Inclusive minimum coordinate.
    pub min: (i32, i32, i32),
    /// Exclusive maximum coordinate.
    pub max: (i32, i32, i32),
}

impl TileBounds {
    /// Compute the clipped bounds of tile `id` within `extent`, given the
    /// tile edge length `tile_edge`.
    pub fn for_tile(id: TileId, extent: Extent, tile_edge: i16) -> Self {
        let edge = tile_edge as i32;
        let x0 = id.tx as i32 * edge;
        let y0 = id.ty as i32 * edge;
        let z0 = id.tz as i32 * edge;
        Self {
            min: (x0, y0, z0),
            max: (
                (x0 + edge).min(extent.width as i32),
                (y0 + edge).min(extent.height as i32),
                (z0 + edge).min(extent.depth as i32),
            ),
        }
    }
}

/// Number of tiles needed to cover `size` cells at `tile_edge` cells per
/// tile: `ceil(size / tile_edge)`.
fn tile_count(size: i16, tile_edge: i16) -> u32 {
    let size = size as u32;
    let edge = tile_edge as u32;
    (size + edge - 1) / edge
}

/// An ordered sequence of tile identifiers covering a field, generated at
/// `begin_step` and consumed one whole tile at a time by the tile
/// scheduler.
///
/// Tiles enter the queue in Morton (Z-order) order over `(tx, ty, tz)` for
/// cache locality; correctness does not depend on this order since all
/// tile reads come from an immutable snapshot and all destination writes
/// commute.
#[derive(Clone, Debug)]
pub struct TileQueue {
    tiles: Vec<TileId>,
}

impl TileQueue {
    /// Build the Morton-ordered tile queue covering `extent` with tiles of
    /// edge `tile_edge`.
    pub fn build(extent: Extent, tile_edge: i16) -> Self {
        let tiles_x = tile_count(extent.width, tile_edge);
        let tiles_y = tile_count(extent.height, tile_edge);
        let tiles_z = tile_count(extent.depth, tile_edge);

        let mut tiles = Vec::with_capacity((tiles_x * tiles_y * tiles_z) as usize);
        for tz in 0..tiles_z {
            for ty in 0..tiles_y {
                for tx in 0..tiles_x {
                    tiles.push(TileId { tx, ty, tz });
                }
            }
        }
        tiles.sort_by_key(|t| encode(t.tx, t.ty, t.tz));

        Self { tiles }
    }

    /// Number of tiles remaining in the queue.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the queue has been fully drained.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Borrow the tiles from `cursor` onward, in queue order.
    pub fn remaining(&self, cursor: usize) -> &[TileId] {
        &self.tiles[cursor.min(self.tiles.len())..]
    }

    /// Total number of tiles in the queue.
    pub fn total(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn single_tile_covers_small_field() {
        let extent = Extent {
            width: 8,
            height: 8,
            depth: 8,
        };
        let queue = TileQueue::build(extent, TILE_EDGE);
        assert_eq!(queue.total(), 1);
    }

    #[test]
    fn boundary_tiles_are_clipped() {
        let extent = Extent {
            width: 20,
            height: 16,
            depth: 16,
        };
        let queue = TileQueue::build(extent, TILE_EDGE);
        assert_eq!(queue.total(), 2); // 2 tiles along X, 1 along Y and Z

        let far = queue
            .remaining(0)
            .iter()
            .find(|t| t.tx == 1)
            .copied()
            .unwrap();
        let bounds = TileBounds::for_tile(far, extent, TILE_EDGE);
        assert_eq!(bounds.min, (16, 0, 0));
        assert_eq!(bounds.max, (20, 16, 16));
    }

    proptest! {
        #[test]
        fn tiles_partition_every_cell_exactly_once(
            w in 1i16..40, h in 1i16..40, d in 1i16..40,
        ) {
            let extent = Extent { width: w, height: h, depth: d };
            let queue = TileQueue::build(extent, TILE_EDGE);

            let mut covered = HashSet::new();
            for &tile in queue.remaining(0) {
                let bounds = TileBounds::for_tile(tile, extent, TILE_EDGE);
                for z in bounds.min.2..bounds.max.2 {
                    for y in bounds.min.1..bounds.max.1 {
                        for x in bounds.min.0..bounds.max.0 {
                            prop_assert!(
                                covered.insert((x, y, z)),
                                "cell ({x},{y},{z}) covered by more than one tile"
                            );
                        }
                    }
                }
            }
            prop_assert_eq!(covered.len() as u64, extent.cell_count());
        }

        #[test]
        fn queue_contains_every_tile_exactly_once(
            w in 1i16..60, h in 1i16..60, d in 1i16..60,
        ) {
            let extent = Extent { width: w, height: h, depth: d };
            let queue = TileQueue::build(extent, TILE_EDGE);
            let unique: HashSet<TileId> = queue.remaining(0).iter().copied().collect();
            prop_assert_eq!(unique.len(), queue.total());
        }
    }
}
