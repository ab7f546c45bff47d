//! Tile geometry and Morton-ordered tile scheduling for the voxel diffusion
//! core.
//!
//! Defines the fixed-edge cubic tile that partitions a [`voxel_core::Field`]
//! and the Morton (Z-order) traversal order the tile scheduler consumes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod morton;
pub mod tile;

pub use tile::{TileBounds, TileId, TileQueue, TILE_EDGE};
