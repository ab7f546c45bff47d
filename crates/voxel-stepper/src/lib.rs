//! The fused stepper: reference semantics for one voxel-diffusion
//! generation.
//!
//! Computes per-pair flows along all three axes from one immutable
//! snapshot and accumulates them commutatively into a single destination,
//! so the result is independent of axis-processing order (rotational
//! symmetry) and exactly mass-conserving (no clamp ever creates mass).
//!
//! [`step_field_reference`] applies this to a whole field in one call; the
//! tile scheduler (`voxel-engine`) applies the same per-pair math one tile
//! at a time under a budget, using [`GenerationAccumulator`] and
//! [`pair_flow`] directly so the two code paths are bit-identical.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accumulator;
pub mod error;
pub mod reference;

pub use accumulator::{pair_flow, GenerationAccumulator};
pub use error::StepperError;
pub use reference::{step_field_reference, step_region_into};
