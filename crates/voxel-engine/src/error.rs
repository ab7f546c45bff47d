//! Error type for the step controller.

use std::error::Error;
use std::fmt;

use voxel_core::FieldError;
use voxel_stepper::StepperError;

/// Errors raised by [`crate::controller::StepController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerError {
    /// Field extents were invalid at creation time.
    InvalidExtents,
    /// The requested diffusion rate exceeds the field's representable shift.
    InvalidRate,
    /// A snapshot or accumulator allocation failed.
    AllocationFailure,
    /// `begin_step` was called while a generation was already in progress.
    AlreadyStepping,
    /// A read or write was attempted while a generation was in progress.
    BusyStepping,
    /// The in-progress generation produced a negative accumulation.
    StabilityViolation {
        /// Linear index of the offending cell.
        cell_index: u64,
        /// The negative signed accumulation that triggered the abort.
        accumulated: i64,
    },
}

impl From<FieldError> for ControllerError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::InvalidExtents => ControllerError::InvalidExtents,
            FieldError::InvalidRate => ControllerError::InvalidRate,
        }
    }
}

impl From<StepperError> for ControllerError {
    fn from(err: StepperError) -> Self {
        ControllerError::StabilityViolation {
            cell_index: err.cell_index,
            accumulated: err.accumulated,
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::InvalidExtents => write!(f, "field extents must be positive"),
            ControllerError::InvalidRate => write!(f, "diffusion rate must be in [0, 31]"),
            ControllerError::AllocationFailure => {
                write!(f, "failed to allocate the generation's working buffers")
            }
            ControllerError::AlreadyStepping => {
                write!(f, "begin_step called while a generation is already in progress")
            }
            ControllerError::BusyStepping => {
                write!(f, "field is locked for writes while a generation is in progress")
            }
            ControllerError::StabilityViolation {
                cell_index,
                accumulated,
            } => write!(
                f,
                "stability violation: cell {cell_index} accumulated to {accumulated}"
            ),
        }
    }
}

impl Error for ControllerError {}
