//! Signed-64-bit accumulation of per-pair flows into a destination buffer.

use voxel_core::Cell;

use crate::error::StepperError;

/// The signed flow transferred from `a` to `b` for one adjacent pair, given
/// diffusion-rate shift `r`.
///
/// `g = a - b` widened to signed 64-bit, `f = g >> r` using arithmetic
/// right shift so negative gradients produce negative flows. The shift is
/// the divisor (power of two); it replaces integer division and is
/// deterministic. Applying `D[a] -= f; D[b] += f` is therefore always
/// exactly equal-and-opposite, regardless of rounding — the source of the
/// fused stepper's exact mass conservation.
pub fn pair_flow(a: Cell, b: Cell, rate: u8) -> i64 {
    let g = a as i64 - b as i64;
    g >> rate
}

/// The destination buffer for one in-progress generation.
///
/// Represented as one signed 64-bit lane per cell so that every pair's flow
/// can be applied without an intermediate clamp: the invariant is "the
/// *final* accumulation after all three axes is in range," not "every
/// partial sum is." [`GenerationAccumulator::commit`] is where that final
/// check happens, narrowing back to `u32` and raising
/// [`StepperError`] if a cell's final value is negative.
#[derive(Clone, Debug)]
pub struct GenerationAccumulator {
    values: Vec<i64>,
}

impl GenerationAccumulator {
    /// Initialize the accumulator from a snapshot's contents, widened to
    /// signed 64-bit. Reads never touch this buffer during a generation —
    /// only the snapshot is read from.
    pub fn from_snapshot(snapshot: &[Cell]) -> Self {
        Self {
            values: snapshot.iter().map(|&c| c as i64).collect(),
        }
    }

    /// A zero-initialized accumulator of `len` lanes.
    ///
    /// Used as a per-worker delta buffer by the tile-coloring scheduler: a
    /// worker thread accumulates only the flows it is responsible for into
    /// a zeroed buffer, and the scheduler sums every worker's delta into
    /// the generation's real accumulator once all workers for a color have
    /// joined. Because a color's tiles never share a written cell, at most
    /// one worker's delta is nonzero at any lane.
    pub fn zeroed(len: usize) -> Self {
        Self {
            values: vec![0i64; len],
        }
    }

    /// Consume the accumulator, returning its raw signed lanes without the
    /// final range check — used to fold a delta buffer back into another
    /// accumulator.
    pub fn into_values(self) -> Vec<i64> {
        self.values
    }

    /// Apply one pair's flow: `self[a] -= flow; self[b] += flow`.
    ///
    /// Both indices must be within bounds; this is an internal primitive
    /// called by the fused stepper's pair enumeration, which is always
    /// bounds-correct by construction.
    pub fn apply_flow(&mut self, a_idx: usize, b_idx: usize, flow: i64) {
        self.values[a_idx] -= flow;
        self.values[b_idx] += flow;
    }

    /// Number of cells in the accumulator.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the accumulator holds no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Direct access to the accumulator's signed lanes, for the tile
    /// scheduler's tile-coloring parallelism (disjoint mutable slices of
    /// this buffer are handed to concurrently-processed tiles).
    pub fn values_mut(&mut self) -> &mut [i64] {
        &mut self.values
    }

    /// Narrow every lane back to `u32`, failing the whole generation if any
    /// lane is negative.
    ///
    /// Mass conservation guarantees the *sum* of lanes can't exceed
    /// `u32::MAX` in aggregate beyond what the original u32 cells already
    /// represented, but an individual lane is still checked against
    /// `u32::MAX` defensively — a value that large would itself indicate
    /// flows larger than any cell could have produced under the declared
    /// diffusion rate.
    pub fn commit(self) -> Result<Vec<Cell>, StepperError> {
        let mut out = Vec::with_capacity(self.values.len());
        for (idx, value) in self.values.into_iter().enumerate() {
            if value < 0 || value > u32::MAX as i64 {
                return Err(StepperError {
                    cell_index: idx as u64,
                    accumulated: value,
                });
            }
            out.push(value as u32);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pair_flow_is_equal_and_opposite() {
        let mut acc = GenerationAccumulator::from_snapshot(&[100, 0]);
        let flow = pair_flow(100, 0, 2);
        assert_eq!(flow, 25);
        acc.apply_flow(0, 1, flow);
        let committed = acc.commit().unwrap();
        assert_eq!(committed, vec![75, 25]);
    }

    #[test]
    fn negative_gradient_produces_negative_flow() {
        assert_eq!(pair_flow(0, 100, 2), -25);
    }

    #[test]
    fn uniform_pair_has_zero_flow() {
        assert_eq!(pair_flow(42, 42, 5), 0);
    }

    #[test]
    fn delta_buffer_folds_into_a_base_accumulator() {
        let mut base = GenerationAccumulator::from_snapshot(&[100, 0, 50]);
        let mut delta = GenerationAccumulator::zeroed(3);
        delta.apply_flow(0, 1, 10);
        let values = delta.into_values();
        for (lane, d) in base.values_mut().iter_mut().zip(values) {
            *lane += d;
        }
        assert_eq!(base.commit().unwrap(), vec![90, 10, 50]);
    }

    #[test]
    fn commit_rejects_negative_accumulation() {
        let mut acc = GenerationAccumulator::from_snapshot(&[0, 0]);
        acc.apply_flow(0, 1, 5); // drives lane 0 to -5
        let err = acc.commit().unwrap_err();
        assert_eq!(err.cell_index, 0);
        assert_eq!(err.accumulated, -5);
    }

    proptest! {
        #[test]
        fn flow_conserves_the_pair_sum(a in 0u32..=1_000_000, b in 0u32..=1_000_000, rate in 0u8..=10) {
            let mut acc = GenerationAccumulator::from_snapshot(&[a, b]);
            let flow = pair_flow(a, b, rate);
            acc.apply_flow(0, 1, flow);
            let before = a as i64 + b as i64;
            // Values are still signed here; sum is preserved regardless of sign.
            let after: i64 = acc.values_mut().iter().sum();
            prop_assert_eq!(before, after);
        }
    }
}
