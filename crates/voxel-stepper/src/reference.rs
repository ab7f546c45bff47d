//! Whole-field reference application of the fused stepper.

use voxel_core::{Cell, Extent};

use crate::accumulator::{pair_flow, GenerationAccumulator};
use crate::error::StepperError;

/// Compute one generation over the whole field in a single pass.
///
/// For every interior-adjacent pair along every axis (six faces per
/// interior cell, three per corner — boundary pairs are simply not
/// enumerated, which is what gives the world boundary zero flow and
/// automatic equilibrium there), reads `g = a - b` and `f = g >> rate` from
/// `snapshot` alone, and accumulates `D[a] -= f; D[b] += f` into a signed
/// 64-bit buffer. Because every axis reads the same immutable snapshot and
/// every accumulation commutes, the result does not depend on axis order
/// (rotational symmetry) — and is exactly what `voxel-engine`'s
/// tile-scheduled stepping must reproduce bit-for-bit when it decomposes
/// this same pass into tiles.
pub fn step_field_reference(
    snapshot: &[Cell],
    extent: Extent,
    rate: u8,
) -> Result<Vec<Cell>, StepperError> {
    let mut acc = GenerationAccumulator::from_snapshot(snapshot);
    step_region_into(snapshot, &mut acc, extent, rate, (0, 0, 0), extent_max(extent));
    acc.commit()
}

fn extent_max(extent: Extent) -> (i32, i32, i32) {
    (
        extent.width as i32,
        extent.height as i32,
        extent.depth as i32,
    )
}

/// Enumerate every pair owned by cells within `[min, max)` — the unit of
/// work the tile scheduler calls once per tile. A cell at `(x, y, z)` owns
/// the pair to `(x+1, y, z)` (and likewise for `y`, `z`) whenever that
/// neighbor is in-extent, whether the neighbor falls inside this same
/// region (an "interior" pair) or in the next tile along that axis (an
/// "outgoing-face" pair). Because every region's loop only ever looks
/// forward, and the next region along an axis starts exactly where this
/// one's upper bound ends, every pair is enumerated by exactly one region
/// — the one containing its lower-index cell.
pub fn step_region_into(
    snapshot: &[Cell],
    acc: &mut GenerationAccumulator,
    extent: Extent,
    rate: u8,
    min: (i32, i32, i32),
    max: (i32, i32, i32),
) {
    let (width, height, _depth) = extent_max(extent);
    let (x0, y0, z0) = min;
    let (x1, y1, z1) = max;

    for z in z0..z1 {
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = extent
                    .linear_index(x, y, z)
                    .expect("region bounds are within extent") as usize;
                let here = snapshot[idx];

                if x + 1 < width {
                    let nidx = idx + 1;
                    let flow = pair_flow(here, snapshot[nidx], rate);
                    acc.apply_flow(idx, nidx, flow);
                }
                if y + 1 < height {
                    let nidx = idx + extent.width as usize;
                    let flow = pair_flow(here, snapshot[nidx], rate);
                    acc.apply_flow(idx, nidx, flow);
                }
                if z + 1 < extent_max(extent).2 {
                    let nidx = idx + extent.width as usize * extent.height as usize;
                    let flow = pair_flow(here, snapshot[nidx], rate);
                    acc.apply_flow(idx, nidx, flow);
                }
            }
        }
    }
}
