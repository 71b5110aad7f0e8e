//! FFI bindings for Vitalwatch
//!
//! This module lets a host UI written in another language drive a monitor.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `vw_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use crate::config::MonitorConfig;
use crate::pipeline::Monitor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

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

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Opaque handle to a Monitor
pub struct MonitorHandle {
    monitor: Monitor,
}

/// Create a monitor from a JSON configuration; NULL config uses defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `vw_monitor_free`.
/// - Returns NULL on error; call `vw_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_new(config_json: *const c_char) -> *mut MonitorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        MonitorConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        };
        match MonitorConfig::from_json(&json) {
            Ok(cfg) => cfg,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match Monitor::new(config) {
        Ok(monitor) => Box::into_raw(Box::new(MonitorHandle { monitor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a monitor.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_free(handle: *mut MonitorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start the monitor. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_start(handle: *mut MonitorHandle) -> i32 {
    clear_last_error();

    let Some(handle) = handle.as_mut() else {
        set_last_error("Null monitor pointer");
        return -1;
    };

    match handle.monitor.start() {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Run one tick and return the tick report as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
/// - Returns a newly allocated string that must be freed with `vw_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_tick(handle: *mut MonitorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_mut() else {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    };

    let report = match handle.monitor.tick() {
        Ok(report) => report,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&report) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Stop the monitor and export the report; returns the report path.
///
/// On export failure the monitor is still stopped, NULL is returned and the
/// alert log is kept for `vw_monitor_export_report`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
/// - Returns a newly allocated string that must be freed with `vw_free_string`.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_stop(handle: *mut MonitorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_mut() else {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    };

    match handle.monitor.stop() {
        Ok(path) => string_to_cstr(&path.to_string_lossy()),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Current alert log as a JSON array of events.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
/// - Returns a newly allocated string that must be freed with `vw_free_string`.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_alerts_json(handle: *const MonitorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    };

    match serde_json::to_string(handle.monitor.alert_log().events()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Write the report to `path` using the configured format. Returns 0 on success.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vw_monitor_new`.
/// - `path` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn vw_monitor_export_report(
    handle: *const MonitorHandle,
    path: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null monitor pointer");
        return -1;
    };
    let Some(path) = cstr_to_string(path) else {
        set_last_error("Invalid path string");
        return -1;
    };

    let format = handle.monitor.config().report_format;
    match handle.monitor.export_report(&PathBuf::from(path), format) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Free a string returned by any `vw_*` function.
///
/// # Safety
/// - `s` must be a pointer returned by a Vitalwatch function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn vw_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Last error message on this thread, or NULL.
///
/// # Safety
/// - The returned pointer is valid until the next `vw_*` call on this thread.
/// - Do not free it.
#[no_mangle]
pub unsafe extern "C" fn vw_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json(dir: &std::path::Path) -> CString {
        let cfg = MonitorConfig {
            population: 4,
            seed: Some(3),
            report_path: dir.join("report.html"),
            ..Default::default()
        };
        CString::new(cfg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn monitor_lifecycle_over_ffi() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_json(dir.path());

        unsafe {
            let handle = vw_monitor_new(config.as_ptr());
            assert!(!handle.is_null());
            assert_eq!(vw_monitor_start(handle), 0);

            for _ in 0..3 {
                let tick = vw_monitor_tick(handle);
                assert!(!tick.is_null());
                let json = CStr::from_ptr(tick).to_str().unwrap();
                let value: serde_json::Value = serde_json::from_str(json).unwrap();
                assert_eq!(value["patients_processed"], 4);
                vw_free_string(tick);
            }

            let alerts = vw_monitor_alerts_json(handle);
            assert!(!alerts.is_null());
            let parsed: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(alerts).to_str().unwrap()).unwrap();
            assert!(parsed.is_array());
            vw_free_string(alerts);

            let path = vw_monitor_stop(handle);
            assert!(!path.is_null());
            assert!(dir.path().join("report.html").exists());
            vw_free_string(path);

            vw_monitor_free(handle);
        }
    }

    #[test]
    fn errors_are_reported_through_last_error() {
        let bad = CString::new(r#"{"population": 0}"#).unwrap();
        unsafe {
            let handle = vw_monitor_new(bad.as_ptr());
            assert!(handle.is_null());
            let err = CStr::from_ptr(vw_last_error()).to_str().unwrap();
            assert!(err.contains("population"));

            assert!(vw_monitor_tick(ptr::null_mut()).is_null());
            assert_eq!(vw_monitor_start(ptr::null_mut()), -1);
        }
    }

    #[test]
    fn tick_before_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_json(dir.path());
        unsafe {
            let handle = vw_monitor_new(config.as_ptr());
            assert!(vw_monitor_tick(handle).is_null());
            let err = CStr::from_ptr(vw_last_error()).to_str().unwrap();
            assert!(err.contains("idle"));
            vw_monitor_free(handle);
        }
    }
}
