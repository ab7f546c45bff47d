//! C-compatible status codes returned by every FFI entry point.
//!
//! [`VoxelStatus`] is a `repr(i32)` enum covering every error condition the
//! controller and field can raise. Conversions from the Rust error types
//! are provided so the extern "C" functions never have to hand-map codes.

use voxel_core::FieldError;
use voxel_engine::ControllerError;

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable and must never
/// be renumbered once shipped.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// Field extents must be positive.
    InvalidExtents = -2,
    /// Diffusion rate must be in `[0, 31]`.
    InvalidRate = -3,
    /// A snapshot or accumulator allocation failed.
    AllocationFailure = -4,
    /// `begin_step` was called while a generation was already in progress.
    AlreadyStepping = -5,
    /// A read or write was attempted while a generation was in progress.
    BusyStepping = -6,
    /// The in-progress generation produced a negative accumulation.
    StabilityViolation = -7,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -8,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&ControllerError> for VoxelStatus {
    fn from(err: &ControllerError) -> Self {
        match err {
            ControllerError::InvalidExtents => VoxelStatus::InvalidExtents,
            ControllerError::InvalidRate => VoxelStatus::InvalidRate,
            ControllerError::AllocationFailure => VoxelStatus::AllocationFailure,
            ControllerError::AlreadyStepping => VoxelStatus::AlreadyStepping,
            ControllerError::BusyStepping => VoxelStatus::BusyStepping,
            ControllerError::StabilityViolation { .. } => VoxelStatus::StabilityViolation,
        }
    }
}

impl From<&FieldError> for VoxelStatus {
    fn from(err: &FieldError) -> Self {
        match err {
            FieldError::InvalidExtents => VoxelStatus::InvalidExtents,
            FieldError::InvalidRate => VoxelStatus::InvalidRate,
        }
    }
}
