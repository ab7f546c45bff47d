//! Morton-ordered, budget-resumable tile scheduler for one generation.

use std::time::{Duration, Instant};

use voxel_core::{Cell, Extent};
use voxel_space::{TileBounds, TileId, TileQueue, TILE_EDGE};
use voxel_stepper::{step_region_into, GenerationAccumulator, StepperError};

/// Result of one [`TileScheduler::tick`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every tile has been processed; the generation is ready to commit.
    Done,
    /// The budget was exhausted before the last tile; call `tick` again.
    NotDone,
}

/// Advances one generation of the fused stepper incrementally, one whole
/// tile at a time, under a microsecond time budget.
///
/// Tiles are visited in Morton order for cache locality when running on a
/// single thread. Correctness never depends on this order: every tile
/// reads from the same immutable snapshot and every write commutes into a
/// shared signed accumulator, so the final result is bit-identical to
/// [`voxel_stepper::step_field_reference`] regardless of how the tiles
/// were interleaved or grouped.
///
/// When constructed with `threads > 1`, tiles are instead grouped into the
/// 8 parity colors of `(tx % 2, ty % 2, tz % 2)` and one whole color is
/// processed concurrently per scheduling step. Two tiles of the same color
/// never write to the same cell — the tile owning a cell and the up to
/// three neighbors that can also write to it (at `tx - 1`, `ty - 1`,
/// `tz - 1`) always differ in exactly one coordinate's parity from the
/// owner, hence always fall in a different color. This makes per-color
/// concurrent processing safe without locking any destination cell.
pub struct TileScheduler {
    extent: Extent,
    rate: u8,
    snapshot: Vec<Cell>,
    acc: GenerationAccumulator,
    tiles: Vec<TileId>,
    color_bounds: Vec<(usize, usize)>,
    cursor: usize,
    threads: usize,
}

impl TileScheduler {
    /// Begin a new generation from `snapshot`. `threads` selects the
    /// concurrency strategy: `1` processes tiles sequentially in Morton
    /// order; values greater than `1` process whole parity-color groups
    /// concurrently, using at most `threads` worker threads per group.
    pub fn begin(snapshot: Vec<Cell>, extent: Extent, rate: u8, threads: usize) -> Self {
        let queue = TileQueue::build(extent, TILE_EDGE);
        let threads = threads.max(1);

        let mut tiles: Vec<TileId> = queue.remaining(0).to_vec();
        let mut color_bounds = Vec::new();
        if threads > 1 {
            tiles.sort_by_key(|t| color_of(*t));
            let mut start = 0;
            while start < tiles.len() {
                let color = color_of(tiles[start]);
                let mut end = start + 1;
                while end < tiles.len() && color_of(tiles[end]) == color {
                    end += 1;
                }
                color_bounds.push((start, end));
                start = end;
            }
        }

        let acc = GenerationAccumulator::from_snapshot(&snapshot);
        Self {
            extent,
            rate,
            snapshot,
            acc,
            tiles,
            color_bounds,
            cursor: 0,
            threads,
        }
    }

    /// Whether every tile has been processed.
    pub fn is_done(&self) -> bool {
        self.cursor >= self.tiles.len()
    }

    /// Total number of tiles in this generation.
    pub fn total_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Number of tiles processed so far.
    pub fn tiles_done(&self) -> usize {
        self.cursor
    }

    /// Process whole tiles until the budget is exhausted or the generation
    /// is complete. Always processes at least one tile (or one color
    /// group, in threaded mode) regardless of `budget_us`, guaranteeing
    /// forward progress even at `budget_us == 0`.
    pub fn tick(&mut self, budget_us: u64) -> TickOutcome {
        let deadline = Instant::now() + Duration::from_micros(budget_us);
        loop {
            if self.is_done() {
                return TickOutcome::Done;
            }
            if self.threads > 1 {
                self.process_next_color_group();
            } else {
                self.process_one_tile(self.cursor);
                self.cursor += 1;
            }
            if self.is_done() {
                return TickOutcome::Done;
            }
            if Instant::now() >= deadline {
                return TickOutcome::NotDone;
            }
        }
    }

    /// Finish the generation synchronously, ignoring any budget.
    pub fn run_to_completion(&mut self) {
        while self.tick(u64::MAX) != TickOutcome::Done {}
    }

    /// Consume the scheduler and commit the finished generation.
    ///
    /// Panics (via `debug_assert`) if the generation was not yet complete;
    /// callers are expected to check [`Self::is_done`] first.
    pub fn finish(self) -> Result<Vec<Cell>, StepperError> {
        debug_assert!(self.is_done(), "finish called before every tile ran");
        self.acc.commit()
    }

    fn process_one_tile(&mut self, index: usize) {
        let tile = self.tiles[index];
        let bounds = TileBounds::for_tile(tile, self.extent, TILE_EDGE);
        step_region_into(
            &self.snapshot,
            &mut self.acc,
            self.extent,
            self.rate,
            bounds.min,
            bounds.max,
        );
    }

    fn process_next_color_group(&mut self) {
        let (start, end) = self
            .color_bounds
            .iter()
            .copied()
            .find(|&(s, _)| s == self.cursor)
            .expect("cursor always lands on a color group boundary");

        let chunk_size = ((end - start) + self.threads - 1) / self.threads;
        let tiles = &self.tiles[start..end];
        let snapshot = &self.snapshot;
        let extent = self.extent;
        let rate = self.rate;
        let cell_count = self.acc.len();

        let deltas: Vec<Vec<i64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = tiles
                .chunks(chunk_size.max(1))
                .map(|chunk| {
                    scope.spawn(move || {
                        let mut local = GenerationAccumulator::zeroed(cell_count);
                        for &tile in chunk {
                            let bounds = TileBounds::for_tile(tile, extent, TILE_EDGE);
                            step_region_into(
                                snapshot, &mut local, extent, rate, bounds.min, bounds.max,
                            );
                        }
                        local.into_values()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("tile worker panicked"))
                .collect()
        });

        for delta in deltas {
            for (lane, d) in self.acc.values_mut().iter_mut().zip(delta) {
                *lane += d;
            }
        }

        self.cursor = end;
    }
}

fn color_of(tile: TileId) -> u8 {
    (((tile.tx & 1) as u8) << 2) | (((tile.ty & 1) as u8) << 1) | (tile.tz & 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_stepper::step_field_reference;

    fn extent(w: i16, h: i16, d: i16) -> Extent {
        Extent {
            width: w,
            height: h,
            depth: d,
        }
    }

    fn seeded_field(ext: Extent) -> Vec<Cell> {
        (0..ext.cell_count()).map(|i| (i * 37 % 251) as u32).collect()
    }

    #[test]
    fn budget_zero_still_makes_forward_progress() {
        let ext = extent(64, 64, 64);
        let snapshot = seeded_field(ext);
        let mut sched = TileScheduler::begin(snapshot, ext, 2, 1);
        let before = sched.tiles_done();
        let outcome = sched.tick(0);
        assert!(sched.tiles_done() > before);
        if outcome == TickOutcome::NotDone {
            assert!(!sched.is_done());
        }
    }

    #[test]
    fn sequential_tiling_matches_whole_field_reference() {
        let ext = extent(48, 33, 17);
        let snapshot = seeded_field(ext);
        let expected = step_field_reference(&snapshot, ext, 3).unwrap();

        let mut sched = TileScheduler::begin(snapshot, ext, 3, 1);
        sched.run_to_completion();
        let actual = sched.finish().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn colored_parallel_tiling_matches_whole_field_reference() {
        let ext = extent(48, 33, 17);
        let snapshot = seeded_field(ext);
        let expected = step_field_reference(&snapshot, ext, 3).unwrap();

        let mut sched = TileScheduler::begin(snapshot, ext, 3, 4);
        sched.run_to_completion();
        let actual = sched.finish().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn incremental_ticking_matches_blocking_completion() {
        let ext = extent(80, 48, 48);
        let snapshot = seeded_field(ext);

        let mut blocking = TileScheduler::begin(snapshot.clone(), ext, 2, 1);
        blocking.run_to_completion();
        let blocking_result = blocking.finish().unwrap();

        let mut incremental = TileScheduler::begin(snapshot, ext, 2, 1);
        let mut iterations = 0;
        while incremental.tick(5) == TickOutcome::NotDone {
            iterations += 1;
            assert!(iterations < 1_000_000, "scheduler never finished");
        }
        let incremental_result = incremental.finish().unwrap();

        assert_eq!(blocking_result, incremental_result);
    }
}
