//! Core types for the voxel diffusion core.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! dense three-dimensional [`Field`], its geometric envelope ([`Extent`]),
//! and the error type raised by field construction and region operations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;

pub use error::FieldError;
pub use field::{Cell, Extent, Field};
