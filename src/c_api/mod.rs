//! C API for duckbridge
//!
//! This module provides a stable C ABI for hosts that cannot link Rust
//! directly (JNI shims, Swift, plain C). Resources are addressed by
//! `uint64_t` handles; 0 is never a valid handle.
//!
//! Two error conventions are offered over the same operations:
//!
//! - [`out_param`]: functions return a success value (bool, handle, or a
//!   nullable string) and, on failure, store a message in a caller-provided
//!   `char **error_out` slot.
//! - [`prefixed`]: string-returning functions return either the payload or
//!   `ERROR:` followed by the message.
//!
//! Every string handed out by this API is owned by the caller and must be
//! released with [`duckbridge_free_string`]. No panic ever crosses the
//! boundary: panics are caught and reported as errors.

pub mod out_param;
pub mod prefixed;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::bridge::report;
use crate::error::{BridgeError, Result};

/// Opaque handle to a database, connection or prepared statement
#[allow(non_camel_case_types)]
pub type duckbridge_handle_t = u64;

/// Prefix marking an error in the string-return convention
pub const ERROR_PREFIX: &str = "ERROR:";

/// Borrow a foreign string; `None` for NULL or invalid UTF-8
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string that outlives `'a`
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Borrow a required foreign string, naming it in the error
///
/// # Safety
/// Same as [`read_str`]
pub(crate) unsafe fn require_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    crate::bridge::require(read_str(ptr), what)
}

/// Borrow an optional foreign string: NULL is `None`, bad UTF-8 an error
///
/// # Safety
/// Same as [`read_str`]
pub(crate) unsafe fn optional_str<'a>(
    ptr: *const c_char,
    what: &'static str,
) -> Result<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    require_str(ptr, what).map(Some)
}

/// Hand a Rust string to the caller
///
/// Interior NUL bytes cannot cross a C string boundary and are dropped.
pub(crate) fn into_c_string(text: String) -> *mut c_char {
    let c_string = CString::new(text).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c_string.into_raw()
}

/// Store `err` in an out-parameter slot if the caller supplied one
///
/// # Safety
/// `error_out` must be NULL or valid for a pointer write
pub(crate) unsafe fn write_error(error_out: *mut *mut c_char, err: &BridgeError) {
    if !error_out.is_null() {
        *error_out = into_c_string(err.to_string());
    }
}

/// `ERROR:`-prefixed message for the string-return convention
pub(crate) fn prefixed_error(err: &BridgeError) -> String {
    format!("{}{}", ERROR_PREFIX, err)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run one boundary call, turning panics into errors and logging failures
pub(crate) fn guard<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(BridgeError::Panic(panic_message(payload.as_ref()))));
    report(operation, result)
}

/// Run a call that has no error channel, swallowing panics
pub(crate) fn guard_silent(operation: &'static str, f: impl FnOnce()) {
    let _ = guard(operation, || {
        f();
        Ok(())
    });
}

/// Free a string returned by any duckbridge function
///
/// # Parameters
/// * `string` - String to free (may be NULL)
///
/// # Safety
/// * `string` must be NULL or a pointer returned by this library
/// * It must not be used or freed again after this call
///
/// # Example
/// ```c
/// char *err = NULL;
/// if (!duckbridge_execute(conn, "DROP TABLE x", NULL, &err)) {
///     fprintf(stderr, "%s\n", err);
///     duckbridge_free_string(err);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn duckbridge_free_string(string: *mut c_char) {
    if !string.is_null() {
        drop(CString::from_raw(string));
    }
}

/// Get the duckbridge version string
///
/// # Returns
/// * Static version string (do not free)
///
/// # Example
/// ```c
/// printf("duckbridge %s\n", duckbridge_version());
/// ```
#[no_mangle]
pub extern "C" fn duckbridge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Get the version of the linked DuckDB engine
///
/// # Returns
/// * Static version string such as `v1.1.3` (do not free)
#[no_mangle]
pub extern "C" fn duckbridge_engine_version() -> *const c_char {
    // SAFETY: duckdb_library_version returns a static NUL-terminated string
    let raw = unsafe { duckdb::ffi::duckdb_library_version() };
    if raw.is_null() {
        b"unknown\0".as_ptr() as *const c_char
    } else {
        raw
    }
}
