//! Controller lifecycle, field access, and stepping FFI entry points.
//!
//! Every function returns a [`VoxelStatus`] and catches Rust panics at the
//! boundary, turning them into [`VoxelStatus::Panicked`] instead of
//! unwinding across the C ABI (which is undefined behavior).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use voxel_core::Cell;
use voxel_engine::{ConcurrencyConfig, StepController, TickOutcome};

use crate::ffi_lock;
use crate::handle::HandleTable;
use crate::status::VoxelStatus;

static CONTROLLERS: Mutex<HandleTable<StepController>> = Mutex::new(HandleTable::new());

fn guarded(f: impl FnOnce() -> i32) -> i32 {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(VoxelStatus::Panicked as i32)
}

/// Allocate a new controller over a zeroed field of the given extents.
///
/// `threads` selects tile-scheduling concurrency; `1` is sequential. On
/// success writes the controller handle to `*handle_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn create_controller(
    width: i16,
    height: i16,
    depth: i16,
    diffusion_rate: u8,
    threads: usize,
    handle_out: *mut u64,
) -> i32 {
    guarded(|| {
        if handle_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let concurrency = ConcurrencyConfig { threads };
        let controller =
            match StepController::create(width, height, depth, diffusion_rate, concurrency) {
                Ok(c) => c,
                Err(e) => return VoxelStatus::from(&e) as i32,
            };
        let handle = ffi_lock!(CONTROLLERS).insert(controller);
        // SAFETY: handle_out was checked non-null above.
        unsafe { *handle_out = handle };
        VoxelStatus::Ok as i32
    })
}

/// Destroy a controller, releasing its field. Double-destroy is a safe
/// no-op that returns [`VoxelStatus::InvalidHandle`].
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn destroy_controller(handle: u64) -> i32 {
    guarded(|| match ffi_lock!(CONTROLLERS).remove(handle) {
        Some(_) => VoxelStatus::Ok as i32,
        None => VoxelStatus::InvalidHandle as i32,
    })
}

/// Write one cell. Fails with [`VoxelStatus::BusyStepping`] while a
/// generation is in progress.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn field_set(handle: u64, x: i32, y: i32, z: i32, value: Cell) -> i32 {
    guarded(|| {
        let mut table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get_mut(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        match ctrl.field_set(x, y, z, value) {
            Ok(()) => VoxelStatus::Ok as i32,
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Read one cell into `*value_out`. Fails with [`VoxelStatus::BusyStepping`]
/// while a generation is in progress.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn field_get(handle: u64, x: i32, y: i32, z: i32, value_out: *mut Cell) -> i32 {
    guarded(|| {
        if value_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        match ctrl.field_get(x, y, z) {
            Ok(value) => {
                // SAFETY: value_out was checked non-null above.
                unsafe { *value_out = value };
                VoxelStatus::Ok as i32
            }
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Read the field's committed generation counter into `*generation_out`.
/// Always available, even while a generation is in progress.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn field_get_generation(handle: u64, generation_out: *mut u64) -> i32 {
    guarded(|| {
        if generation_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        // SAFETY: generation_out was checked non-null above.
        unsafe { *generation_out = ctrl.field_generation() };
        VoxelStatus::Ok as i32
    })
}

/// Bulk-write a half-open region `[min, max)` from `in_buf` (`in_len`
/// cells, row-major over the region's own shape). Writes `*written_out`
/// regardless of outcome; 0 means the region or buffer was invalid.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn voxel_import_region(
    handle: u64,
    in_buf: *const Cell,
    in_len: usize,
    min_x: i16,
    min_y: i16,
    min_z: i16,
    max_x: i16,
    max_y: i16,
    max_z: i16,
    written_out: *mut usize,
) -> i32 {
    guarded(|| {
        if written_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        if in_len > 0 && in_buf.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let mut table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get_mut(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        // SAFETY: in_buf/in_len describe a caller-owned slice of at least
        // in_len valid Cells, checked non-null above when nonempty.
        let slice = unsafe { std::slice::from_raw_parts(in_buf, in_len) };
        match ctrl.import_region(slice, (min_x, min_y, min_z), (max_x, max_y, max_z)) {
            Ok(written) => {
                // SAFETY: written_out was checked non-null above.
                unsafe { *written_out = written };
                VoxelStatus::Ok as i32
            }
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Bulk-read a half-open region `[min, max)` into `out_buf` (`out_len`
/// cells, row-major over the region's own shape). Writes `*written_out`
/// regardless of outcome; 0 means the region or buffer was invalid.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn voxel_extract_region(
    handle: u64,
    out_buf: *mut Cell,
    out_len: usize,
    min_x: i16,
    min_y: i16,
    min_z: i16,
    max_x: i16,
    max_y: i16,
    max_z: i16,
    written_out: *mut usize,
) -> i32 {
    guarded(|| {
        if written_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        if out_len > 0 && out_buf.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        // SAFETY: out_buf/out_len describe a caller-owned mutable slice of
        // at least out_len valid Cells, checked non-null above when
        // nonempty.
        let slice = unsafe { std::slice::from_raw_parts_mut(out_buf, out_len) };
        match ctrl.extract_region(slice, (min_x, min_y, min_z), (max_x, max_y, max_z)) {
            Ok(written) => {
                // SAFETY: written_out was checked non-null above.
                unsafe { *written_out = written };
                VoxelStatus::Ok as i32
            }
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Begin a new generation: snapshot the field and build the tile queue.
/// Fails with [`VoxelStatus::AlreadyStepping`] if one is already in
/// progress.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn begin_step(handle: u64) -> i32 {
    guarded(|| {
        let mut table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get_mut(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        match ctrl.begin_step() {
            Ok(()) => VoxelStatus::Ok as i32,
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Advance the in-progress generation under a microsecond budget. Writes
/// `true` to `*done_out` once the generation has committed. A no-op that
/// writes `true` if no generation is in progress; call [`begin_step`] or
/// [`step_blocking`] to start one.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tick(handle: u64, budget_us: u64, done_out: *mut bool) -> i32 {
    guarded(|| {
        if done_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let mut table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get_mut(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        match ctrl.tick(budget_us) {
            Ok(outcome) => {
                // SAFETY: done_out was checked non-null above.
                unsafe { *done_out = outcome == TickOutcome::Done };
                VoxelStatus::Ok as i32
            }
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

/// Read whether a generation is currently in progress into
/// `*stepping_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn is_stepping(handle: u64, stepping_out: *mut bool) -> i32 {
    guarded(|| {
        if stepping_out.is_null() {
            return VoxelStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        // SAFETY: stepping_out was checked non-null above.
        unsafe { *stepping_out = ctrl.is_stepping() };
        VoxelStatus::Ok as i32
    })
}

/// Run an entire generation to completion in one call, beginning one
/// first if none is in progress.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn step_blocking(handle: u64) -> i32 {
    guarded(|| {
        let mut table = ffi_lock!(CONTROLLERS);
        let Some(ctrl) = table.get_mut(handle) else {
            return VoxelStatus::InvalidHandle as i32;
        };
        match ctrl.step_blocking() {
            Ok(()) => VoxelStatus::Ok as i32,
            Err(e) => VoxelStatus::from(&e) as i32,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(threads: usize) -> u64 {
        let mut handle = 0u64;
        let status = create_controller(8, 8, 8, 2, threads, &mut handle as *mut u64);
        assert_eq!(status, VoxelStatus::Ok as i32);
        handle
    }

    #[test]
    fn create_set_get_destroy_round_trip() {
        let handle = create(1);
        assert_eq!(field_set(handle, 1, 1, 1, 42), VoxelStatus::Ok as i32);

        let mut value = 0u32;
        assert_eq!(
            field_get(handle, 1, 1, 1, &mut value as *mut u32),
            VoxelStatus::Ok as i32
        );
        assert_eq!(value, 42);

        assert_eq!(destroy_controller(handle), VoxelStatus::Ok as i32);
        assert_eq!(
            destroy_controller(handle),
            VoxelStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn stale_handle_is_rejected_everywhere() {
        let handle = create(1);
        destroy_controller(handle);

        let mut value = 0u32;
        assert_eq!(
            field_get(handle, 0, 0, 0, &mut value as *mut u32),
            VoxelStatus::InvalidHandle as i32
        );
        assert_eq!(
            begin_step(handle),
            VoxelStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn null_output_pointer_is_invalid_argument() {
        assert_eq!(
            create_controller(4, 4, 4, 1, 1, std::ptr::null_mut()),
            VoxelStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn invalid_extents_surface_their_own_status() {
        let mut handle = 0u64;
        let status = create_controller(0, 4, 4, 1, 1, &mut handle as *mut u64);
        assert_eq!(status, VoxelStatus::InvalidExtents as i32);
    }

    #[test]
    fn step_blocking_then_tick_round_trip() {
        let handle = create(1);
        field_set(handle, 4, 4, 4, 1_000_000);
        assert_eq!(step_blocking(handle), VoxelStatus::Ok as i32);

        let mut generation = 0u64;
        field_get_generation(handle, &mut generation as *mut u64);
        assert_eq!(generation, 1);

        destroy_controller(handle);
    }

    #[test]
    fn region_round_trips_through_ffi() {
        let handle = create(1);
        let data: Vec<Cell> = (0..8).collect();
        let mut written = 0usize;
        let status = voxel_import_region(
            handle,
            data.as_ptr(),
            data.len(),
            0, 0, 0, 2, 2, 2,
            &mut written as *mut usize,
        );
        assert_eq!(status, VoxelStatus::Ok as i32);
        assert_eq!(written, 8);

        let mut out = vec![0u32; 8];
        let mut read = 0usize;
        let status = voxel_extract_region(
            handle,
            out.as_mut_ptr(),
            out.len(),
            0, 0, 0, 2, 2, 2,
            &mut read as *mut usize,
        );
        assert_eq!(status, VoxelStatus::Ok as i32);
        assert_eq!(read, 8);
        assert_eq!(out, data);

        destroy_controller(handle);
    }

    #[test]
    fn busy_stepping_is_returned_mid_generation() {
        let handle = create(1);
        assert_eq!(begin_step(handle), VoxelStatus::Ok as i32);
        assert_eq!(
            field_set(handle, 0, 0, 0, 1),
            VoxelStatus::BusyStepping as i32
        );
        destroy_controller(handle);
    }
}
