//! Voxel: an integer-valued 3D diffusion core for host scripting engines.
//!
//! This is the top-level facade crate that re-exports the public API from
//! every sub-crate. For most users, adding `voxel` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use voxel::prelude::*;
//!
//! let mut ctrl = StepController::create(16, 16, 16, 2, ConcurrencyConfig::default()).unwrap();
//! ctrl.field_set(8, 8, 8, 1_000_000).unwrap();
//! ctrl.step_blocking().unwrap();
//! assert_eq!(ctrl.generation(), 1);
//! assert_eq!(ctrl.field().total_mass(), 1_000_000);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `voxel-core` | [`core::Field`], [`core::Extent`], field errors |
//! | [`space`] | `voxel-space` | Morton ordering, cubic tiles, the tile queue |
//! | [`stepper`] | `voxel-stepper` | The fused diffusion stepper and its accumulator |
//! | [`engine`] | `voxel-engine` | [`engine::TileScheduler`], [`engine::StepController`] |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Dense field storage and geometry (`voxel-core`).
pub use voxel_core as core;

/// Tile geometry and Morton tile ordering (`voxel-space`).
pub use voxel_space as space;

/// The fused, rotationally-symmetric diffusion stepper (`voxel-stepper`).
pub use voxel_stepper as stepper;

/// Tile scheduler and step controller (`voxel-engine`).
pub use voxel_engine as engine;

/// Common imports for typical usage.
///
/// ```rust
/// use voxel::prelude::*;
/// ```
pub mod prelude {
    pub use voxel_core::{Cell, Extent, Field, FieldError};
    pub use voxel_engine::{ConcurrencyConfig, ControllerError, StepController, TickOutcome};
    pub use voxel_space::{TileBounds, TileId, TileQueue};
    pub use voxel_stepper::{step_field_reference, StepperError};
}
