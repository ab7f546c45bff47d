//! C FFI bindings for the voxel diffusion core.
//!
//! Exposes a C-compatible API for a host scripting engine: controller
//! lifecycle, field read/write, region import/export, and the
//! begin_step/tick/step_blocking stepping surface. This is the only crate
//! in the workspace that contains `unsafe` code, confined to raw-pointer
//! argument handling at the extern "C" boundary.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Lock a `Mutex`, recovering the inner guard if a prior panic poisoned it.
///
/// A poisoned controller mutex still holds a valid (if mid-mutation)
/// `StepController`; the alternative of permanently wedging the handle
/// after one panicking call is worse for a long-lived host process.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    };
}

pub(crate) use ffi_lock;

pub mod controller_ffi;
pub mod handle;
pub mod status;

pub use status::VoxelStatus;
