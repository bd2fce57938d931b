//! FFI bindings for imu-sync
//!
//! This module provides C-compatible functions for calling imu-sync from the
//! labeling front-ends. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `imu_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::PipelineConfig;
use crate::pipeline::load_recording_json;
use crate::sync::{RecomputeOutcome, SyncModel};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Status codes for anchor calls
pub const IMU_OK: i32 = 0;
pub const IMU_COINCIDENT_ANCHORS: i32 = 1;
pub const IMU_ERROR: i32 = -1;

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Recording API
// ============================================================================

/// Load a recording from a JSON array of sources and return the resampled
/// recording as JSON.
///
/// `target_hz <= 0` selects the default rate.
///
/// # Safety
/// - `sources_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `imu_free_string`.
/// - Returns NULL on error; call `imu_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn imu_load_recording(
    sources_json: *const c_char,
    target_hz: i32,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(sources_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = if target_hz <= 0 {
        PipelineConfig::default()
    } else {
        PipelineConfig::with_target_hz(target_hz as u32)
    };

    match load_recording_json(&json_str, &config) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Sync Model API
// ============================================================================

/// Opaque handle to a SyncModel
pub struct SyncModelHandle {
    model: SyncModel,
}

/// Create a new sync model with the identity mapping.
///
/// # Safety
/// - Must be freed with `imu_sync_free`.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_new() -> *mut SyncModelHandle {
    clear_last_error();
    Box::into_raw(Box::new(SyncModelHandle {
        model: SyncModel::new(),
    }))
}

/// Free a sync model.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_free(handle: *mut SyncModelHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

fn outcome_code(outcome: RecomputeOutcome) -> i32 {
    match outcome {
        RecomputeOutcome::Updated => IMU_OK,
        RecomputeOutcome::CoincidentAnchors => {
            set_last_error("start and end anchors share a local time");
            IMU_COINCIDENT_ANCHORS
        }
    }
}

/// Set the start anchor.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`.
/// - Returns `IMU_OK`, `IMU_COINCIDENT_ANCHORS` (mapping unchanged), or
///   `IMU_ERROR` for a null handle.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_set_start_anchor(
    handle: *mut SyncModelHandle,
    local_ms: f64,
    foreign_ms: f64,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null sync model pointer");
        return IMU_ERROR;
    }

    let handle = &mut *handle;
    outcome_code(handle.model.set_start_anchor(local_ms, foreign_ms))
}

/// Set the end anchor.
///
/// # Safety
/// - Same contract as `imu_sync_set_start_anchor`.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_set_end_anchor(
    handle: *mut SyncModelHandle,
    local_ms: f64,
    foreign_ms: f64,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null sync model pointer");
        return IMU_ERROR;
    }

    let handle = &mut *handle;
    outcome_code(handle.model.set_end_anchor(local_ms, foreign_ms))
}

/// Clear both anchors and restore the identity mapping.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_reset(handle: *mut SyncModelHandle) {
    if let Some(handle) = handle.as_mut() {
        handle.model.reset();
    }
}

/// Map a local time to the foreign timeline.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`.
/// - Returns NaN for a null handle.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_to_foreign(handle: *const SyncModelHandle, local_ms: f64) -> f64 {
    match handle.as_ref() {
        Some(handle) => handle.model.to_foreign(local_ms),
        None => f64::NAN,
    }
}

/// Map a foreign time back to the local timeline.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`.
/// - `out` must point to writable memory for one `f64`.
/// - Returns `IMU_OK` on success, `IMU_ERROR` when the scale is zero or a
///   pointer is null; `*out` is untouched on error.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_to_local(
    handle: *const SyncModelHandle,
    foreign_ms: f64,
    out: *mut f64,
) -> i32 {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null sync model pointer");
        return IMU_ERROR;
    };
    if out.is_null() {
        set_last_error("Null output pointer");
        return IMU_ERROR;
    }

    match handle.model.to_local(foreign_ms) {
        Ok(local) => {
            *out = local;
            IMU_OK
        }
        Err(e) => {
            set_last_error(&e.to_string());
            IMU_ERROR
        }
    }
}

/// Current model (parameters and anchors) as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `imu_sync_new`.
/// - Returns a newly allocated string that must be freed with `imu_free_string`.
#[no_mangle]
pub unsafe extern "C" fn imu_sync_to_json(handle: *const SyncModelHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null sync model pointer");
        return ptr::null_mut();
    };

    match serde_json::to_string(&handle.model) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by imu-sync functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an imu-sync function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn imu_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next imu-sync call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn imu_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn imu_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
