//! C FFI bindings for dw-core
//!
//! This crate provides a C-compatible API so a native UI layer can drive the
//! dataset store. Complex results cross the boundary as JSON strings; every
//! returned string must be released with `dw_string_free`.

use dw_core::{DatasetStore, Record};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;

/// Opaque handle to a dataset store
pub struct FfiStore {
    inner: DatasetStore,
}

unsafe fn cstr_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

fn json_out<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => match CString::new(json) {
            Ok(cstring) => cstring.into_raw(),
            Err(_) => ptr::null_mut(),
        },
        Err(_) => ptr::null_mut(),
    }
}

/// Open a store over a data directory
///
/// # Safety
/// - `data_dir` must be a valid NUL-terminated C string
/// - Returns null on error; release with `dw_store_free`
#[no_mangle]
pub unsafe extern "C" fn dw_store_open(data_dir: *const c_char) -> *mut FfiStore {
    match cstr_arg(data_dir) {
        Some(dir) => Box::into_raw(Box::new(FfiStore {
            inner: DatasetStore::new(PathBuf::from(dir)),
        })),
        None => ptr::null_mut(),
    }
}

/// Free a store handle
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open` or null
#[no_mangle]
pub unsafe extern "C" fn dw_store_free(store: *mut FfiStore) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// List the selectable datasets as a JSON array
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - Returns null on error; release the string with `dw_string_free`
#[no_mangle]
pub unsafe extern "C" fn dw_store_list(store: *mut FfiStore) -> *mut c_char {
    if store.is_null() {
        return ptr::null_mut();
    }

    match (*store).inner.list() {
        Ok(datasets) => json_out(&datasets),
        Err(_) => ptr::null_mut(),
    }
}

/// Load a dataset (unfiltered) as a JSON table
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - `name` must be a valid NUL-terminated C string
/// - Returns null on error; release the string with `dw_string_free`
#[no_mangle]
pub unsafe extern "C" fn dw_store_load(
    store: *mut FfiStore,
    name: *const c_char,
) -> *mut c_char {
    if store.is_null() {
        return ptr::null_mut();
    }
    let Some(name) = cstr_arg(name) else {
        return ptr::null_mut();
    };

    let store = &mut (*store).inner;
    let table = store
        .dataset(name)
        .and_then(|dataset| store.load(&dataset, None, None));

    match table {
        Ok(table) => json_out(&table),
        Err(_) => ptr::null_mut(),
    }
}

/// Append a record (a JSON object of column to value strings) to a dataset
/// and save it. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - `name` and `record_json` must be valid NUL-terminated C strings
#[no_mangle]
pub unsafe extern "C" fn dw_store_add_record(
    store: *mut FfiStore,
    name: *const c_char,
    record_json: *const c_char,
) -> c_int {
    if store.is_null() {
        return -1;
    }
    let (Some(name), Some(record_json)) = (cstr_arg(name), cstr_arg(record_json)) else {
        return -1;
    };
    let Ok(record) = serde_json::from_str::<Record>(record_json) else {
        return -1;
    };

    let store = &mut (*store).inner;
    let result = store.dataset(name).and_then(|dataset| {
        let table = store.load(&dataset, None, None)?;
        let updated = dw_core::add_record(&table, &record)?;
        store.save(&dataset, &updated)
    });

    match result {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Update the first record matching a key and save the dataset.
/// Returns 0 on success, -1 on error (including no matching record).
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - All string arguments must be valid NUL-terminated C strings
#[no_mangle]
pub unsafe extern "C" fn dw_store_update_record(
    store: *mut FfiStore,
    name: *const c_char,
    key_column: *const c_char,
    key_value: *const c_char,
    record_json: *const c_char,
) -> c_int {
    if store.is_null() {
        return -1;
    }
    let (Some(name), Some(key_column), Some(key_value), Some(record_json)) = (
        cstr_arg(name),
        cstr_arg(key_column),
        cstr_arg(key_value),
        cstr_arg(record_json),
    ) else {
        return -1;
    };
    let Ok(record) = serde_json::from_str::<Record>(record_json) else {
        return -1;
    };

    let store = &mut (*store).inner;
    let result = store.dataset(name).and_then(|dataset| {
        let table = store.load(&dataset, None, None)?;
        let updated = dw_core::update_record(&table, key_column, key_value, &record)?;
        store.save(&dataset, &updated)
    });

    match result {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Prize counts per company within an industry, as a JSON array of
/// [company, count] pairs
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - `industry` must be a valid NUL-terminated C string
/// - Returns null on error; release the string with `dw_string_free`
#[no_mangle]
pub unsafe extern "C" fn dw_prizes_by_industry(
    store: *mut FfiStore,
    industry: *const c_char,
) -> *mut c_char {
    if store.is_null() {
        return ptr::null_mut();
    }
    let Some(industry) = cstr_arg(industry) else {
        return ptr::null_mut();
    };

    match dw_core::views::prizes_by_industry(&mut (*store).inner, industry) {
        Ok(counts) => json_out(&counts),
        Err(_) => ptr::null_mut(),
    }
}

/// Funding events for one company as a JSON array of [date, value] pairs,
/// ordered by date
///
/// # Safety
/// - `store` must be a valid pointer returned by `dw_store_open`
/// - `company` must be a valid NUL-terminated C string
/// - Returns null on error; release the string with `dw_string_free`
#[no_mangle]
pub unsafe extern "C" fn dw_funding_over_time(
    store: *mut FfiStore,
    company: *const c_char,
) -> *mut c_char {
    if store.is_null() {
        return ptr::null_mut();
    }
    let Some(company) = cstr_arg(company) else {
        return ptr::null_mut();
    };

    match dw_core::views::funding_over_time(&mut (*store).inner, company) {
        Ok(series) => json_out(&series),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a string returned by any of the JSON-producing functions
///
/// # Safety
/// - `s` must be a pointer returned by this library or null
#[no_mangle]
pub unsafe extern "C" fn dw_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
