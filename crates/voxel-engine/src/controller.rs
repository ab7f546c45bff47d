//! The step controller: an Idle/Stepping state machine over one [`Field`].

use voxel_core::{Cell, Field};

use crate::error::ControllerError;
use crate::scheduler::{TickOutcome, TileScheduler};

/// Number of worker threads the tile scheduler uses while stepping. `1`
/// processes tiles sequentially in Morton order; values above `1` enable
/// tile-coloring concurrency (see [`crate::scheduler::TileScheduler`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Number of worker threads to use per generation.
    pub threads: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

/// Owns a [`Field`] and drives it through one generation at a time.
///
/// A generation is either entirely committed or entirely discarded: a
/// [`ControllerError::StabilityViolation`] aborts the whole in-progress
/// generation and returns the controller to `Idle` with the field
/// unchanged, never partially updated.
pub struct StepController {
    field: Field,
    concurrency: ConcurrencyConfig,
    state: State,
}

enum State {
    Idle,
    Stepping(TileScheduler),
}

impl StepController {
    /// Allocate a new controller over a freshly created field.
    pub fn create(
        width: i16,
        height: i16,
        depth: i16,
        diffusion_rate: u8,
        concurrency: ConcurrencyConfig,
    ) -> Result<Self, ControllerError> {
        let field = Field::create(width, height, depth, diffusion_rate)?;
        Ok(Self {
            field,
            concurrency,
            state: State::Idle,
        })
    }

    /// Whether a generation is currently in progress.
    pub fn is_stepping(&self) -> bool {
        matches!(self.state, State::Stepping(_))
    }

    /// The field's current generation counter.
    pub fn generation(&self) -> u64 {
        self.field.generation()
    }

    /// Read-only access to the field, for callers that only need the
    /// committed state (e.g. a host reading the last completed generation
    /// while a new one steps in the background is not supported — reads
    /// are rejected while stepping, see [`Self::field_get`]).
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Write one cell. Rejected with [`ControllerError::BusyStepping`]
    /// while a generation is in progress, since the field's current
    /// contents are the authoritative snapshot a started generation reads
    /// from.
    pub fn field_set(&mut self, x: i32, y: i32, z: i32, value: Cell) -> Result<(), ControllerError> {
        self.reject_if_stepping()?;
        self.field.set(x, y, z, value);
        Ok(())
    }

    /// Read one cell. Rejected with [`ControllerError::BusyStepping`]
    /// while a generation is in progress.
    pub fn field_get(&self, x: i32, y: i32, z: i32) -> Result<Cell, ControllerError> {
        self.reject_if_stepping()?;
        Ok(self.field.get(x, y, z))
    }

    /// Bulk-write a region. Rejected with [`ControllerError::BusyStepping`]
    /// while a generation is in progress. See [`Field::import_region`].
    pub fn import_region(
        &mut self,
        in_buf: &[Cell],
        min: (i16, i16, i16),
        max: (i16, i16, i16),
    ) -> Result<usize, ControllerError> {
        self.reject_if_stepping()?;
        Ok(self.field.import_region(in_buf, min, max))
    }

    /// Bulk-read a region. Rejected with [`ControllerError::BusyStepping`]
    /// while a generation is in progress. See [`Field::extract_region`].
    pub fn extract_region(
        &self,
        out_buf: &mut [Cell],
        min: (i16, i16, i16),
        max: (i16, i16, i16),
    ) -> Result<usize, ControllerError> {
        self.reject_if_stepping()?;
        Ok(self.field.extract_region(out_buf, min, max))
    }

    /// Current committed generation counter. Always readable, even while
    /// stepping, since it does not expose in-progress state.
    pub fn field_generation(&self) -> u64 {
        self.field.generation()
    }

    /// Begin a new generation: snapshot the field and build the tile
    /// queue. Fails with [`ControllerError::AlreadyStepping`] if a
    /// generation is already in progress, or
    /// [`ControllerError::AllocationFailure`] if the snapshot buffer
    /// cannot be allocated.
    pub fn begin_step(&mut self) -> Result<(), ControllerError> {
        if self.is_stepping() {
            return Err(ControllerError::AlreadyStepping);
        }

        let cells = self.field.cells();
        let mut snapshot = Vec::new();
        snapshot
            .try_reserve_exact(cells.len())
            .map_err(|_| ControllerError::AllocationFailure)?;
        snapshot.extend_from_slice(cells);

        let scheduler = TileScheduler::begin(
            snapshot,
            self.field.extent(),
            self.field.diffusion_rate(),
            self.concurrency.threads,
        );
        self.state = State::Stepping(scheduler);
        Ok(())
    }

    /// Advance the in-progress generation by whole tiles under a
    /// microsecond time budget.
    ///
    /// Returns [`TickOutcome::Done`] once every tile has been processed
    /// and the generation has been committed to the field (the generation
    /// counter is advanced and the controller returns to `Idle`).
    /// Returns [`TickOutcome::NotDone`] if work remains; call again to
    /// continue. A call with no generation in progress is a no-op: it
    /// returns `Ok(TickOutcome::Done)` immediately without touching the
    /// field or starting one. Use [`Self::begin_step`] or
    /// [`Self::step_blocking`] to start a generation.
    pub fn tick(&mut self, budget_us: u64) -> Result<TickOutcome, ControllerError> {
        if !self.is_stepping() {
            return Ok(TickOutcome::Done);
        }

        let State::Stepping(scheduler) = &mut self.state else {
            unreachable!("begin_step always enters Stepping");
        };
        let outcome = scheduler.tick(budget_us);

        if outcome == TickOutcome::Done {
            self.commit_current_generation()?;
        }

        Ok(outcome)
    }

    /// Run an entire generation to completion in one call, ignoring any
    /// budget. Bit-identical to calling [`Self::tick`] repeatedly until
    /// [`TickOutcome::Done`].
    pub fn step_blocking(&mut self) -> Result<(), ControllerError> {
        if !self.is_stepping() {
            self.begin_step()?;
        }
        loop {
            match self.tick(u64::MAX)? {
                TickOutcome::Done => return Ok(()),
                TickOutcome::NotDone => continue,
            }
        }
    }

    fn commit_current_generation(&mut self) -> Result<(), ControllerError> {
        let State::Stepping(scheduler) = std::mem::replace(&mut self.state, State::Idle) else {
            unreachable!("caller only invokes this while Stepping");
        };
        match scheduler.finish() {
            Ok(cells) => {
                self.field.commit(cells);
                Ok(())
            }
            Err(err) => Err(ControllerError::from(err)),
        }
    }

    fn reject_if_stepping(&self) -> Result<(), ControllerError> {
        if self.is_stepping() {
            Err(ControllerError::BusyStepping)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_controller_accepts_reads_and_writes() {
        let mut ctrl = StepController::create(4, 4, 4, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.field_set(1, 1, 1, 99).unwrap();
        assert_eq!(ctrl.field_get(1, 1, 1).unwrap(), 99);
    }

    #[test]
    fn writes_are_rejected_while_stepping() {
        let mut ctrl = StepController::create(8, 8, 8, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.begin_step().unwrap();
        assert_eq!(
            ctrl.field_set(0, 0, 0, 1).unwrap_err(),
            ControllerError::BusyStepping
        );
        assert_eq!(
            ctrl.field_get(0, 0, 0).unwrap_err(),
            ControllerError::BusyStepping
        );
    }

    #[test]
    fn region_round_trips_through_the_controller() {
        let mut ctrl = StepController::create(8, 8, 8, 2, ConcurrencyConfig::default()).unwrap();
        let data: Vec<Cell> = (0..8).collect();
        let written = ctrl.import_region(&data, (0, 0, 0), (2, 2, 2)).unwrap();
        assert_eq!(written, 8);

        let mut out = vec![0u32; 8];
        let read = ctrl.extract_region(&mut out, (0, 0, 0), (2, 2, 2)).unwrap();
        assert_eq!(read, 8);
        assert_eq!(out, data);
    }

    #[test]
    fn region_access_is_rejected_while_stepping() {
        let mut ctrl = StepController::create(8, 8, 8, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.begin_step().unwrap();
        let data = vec![1u32; 8];
        assert_eq!(
            ctrl.import_region(&data, (0, 0, 0), (2, 2, 2)).unwrap_err(),
            ControllerError::BusyStepping
        );
        let mut out = vec![0u32; 8];
        assert_eq!(
            ctrl.extract_region(&mut out, (0, 0, 0), (2, 2, 2))
                .unwrap_err(),
            ControllerError::BusyStepping
        );
    }

    #[test]
    fn begin_step_twice_fails() {
        let mut ctrl = StepController::create(8, 8, 8, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.begin_step().unwrap();
        assert_eq!(
            ctrl.begin_step().unwrap_err(),
            ControllerError::AlreadyStepping
        );
    }

    #[test]
    fn step_blocking_advances_generation_exactly_once() {
        let mut ctrl = StepController::create(16, 16, 16, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.field_set(8, 8, 8, 1_000_000).unwrap();
        ctrl.step_blocking().unwrap();
        assert_eq!(ctrl.generation(), 1);
        assert!(!ctrl.is_stepping());
        assert_eq!(ctrl.field().total_mass(), 1_000_000);
    }

    #[test]
    fn tick_on_idle_controller_is_a_no_op() {
        let mut ctrl = StepController::create(8, 8, 8, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.field_set(0, 0, 0, 42).unwrap();
        assert_eq!(ctrl.tick(0).unwrap(), TickOutcome::Done);
        assert!(!ctrl.is_stepping());
        assert_eq!(ctrl.generation(), 0);
        assert_eq!(ctrl.field_get(0, 0, 0).unwrap(), 42);
    }

    #[test]
    fn tick_with_zero_budget_eventually_completes() {
        let mut ctrl =
            StepController::create(64, 64, 64, 2, ConcurrencyConfig::default()).unwrap();
        ctrl.begin_step().unwrap();
        let mut guard = 0;
        loop {
            match ctrl.tick(0).unwrap() {
                TickOutcome::Done => break,
                TickOutcome::NotDone => {
                    guard += 1;
                    assert!(guard < 1_000_000, "controller never finished");
                }
            }
        }
        assert_eq!(ctrl.generation(), 1);
    }

    #[test]
    fn incremental_and_blocking_stepping_agree() {
        let mut blocking =
            StepController::create(32, 32, 32, 3, ConcurrencyConfig::default()).unwrap();
        blocking.field_set(15, 15, 15, 500_000).unwrap();
        blocking.step_blocking().unwrap();

        let mut incremental =
            StepController::create(32, 32, 32, 3, ConcurrencyConfig::default()).unwrap();
        incremental.field_set(15, 15, 15, 500_000).unwrap();
        incremental.begin_step().unwrap();
        loop {
            match incremental.tick(10).unwrap() {
                TickOutcome::Done => break,
                TickOutcome::NotDone => continue,
            }
        }

        assert_eq!(blocking.field().cells(), incremental.field().cells());
        assert_eq!(blocking.generation(), incremental.generation());
    }
}
