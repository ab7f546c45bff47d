//! Error type for field construction.

use std::error::Error;
use std::fmt;

/// Errors raised by [`Field::create`](crate::Field::create).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// One or more of `width`, `height`, `depth` was not in `[1, 32767]`.
    InvalidExtents,
    /// The diffusion-rate shift exceeded 31.
    InvalidRate,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExtents => write!(f, "extents must be in [1, 32767] on each axis"),
            Self::InvalidRate => write!(f, "diffusion rate shift must be <= 31"),
        }
    }
}

impl Error for FieldError {}
