//! Error type raised when committing a generation.

use std::error::Error;
use std::fmt;

/// Raised when a cell's final signed accumulation would be negative.
///
/// The fused stepper never clamps: `D[a] -= f; D[b] += f` is applied
/// exactly, in signed 64-bit arithmetic, for every pair. A negative final
/// value means the input configuration (diffusion rate vs. cell magnitudes)
/// was inconsistent — never that flow was lost — so the whole generation
/// is aborted rather than silently saturated to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepperError {
    /// Linear index of the offending cell.
    pub cell_index: u64,
    /// The negative signed accumulation that triggered the abort.
    pub accumulated: i64,
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stability violation: cell {} accumulated to {} (diffusion rate inconsistent with input)",
            self.cell_index, self.accumulated
        )
    }
}

impl Error for StepperError {}
