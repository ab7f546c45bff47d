//! Tile scheduler and step controller for the voxel diffusion core.
//!
//! [`TileScheduler`] advances one generation of the fused stepper
//! incrementally, one whole tile at a time, under a microsecond time
//! budget. [`StepController`] wraps a [`voxel_core::Field`] in an
//! Idle/Stepping state machine over the scheduler, guaranteeing that
//! blocking and incremental stepping commit bit-identical generations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod scheduler;

pub use controller::{ConcurrencyConfig, StepController};
pub use error::ControllerError;
pub use scheduler::{TickOutcome, TileScheduler};
