//! Value binding and column decoding against the SQLite C API.

use lexdb_core::Value;
use libsqlite3_sys as ffi;
use std::ffi::{CStr, CString, c_int};

/// Bind a [`Value`] to a 1-based parameter slot.
///
/// # Safety
///
/// `stmt` must be a valid prepared statement.
pub(crate) unsafe fn bind_value(
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    value: &Value,
) -> c_int {
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),
            Value::Bool(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),
            Value::Int(v) => ffi::sqlite3_bind_int64(stmt, index, *v),
            Value::Float(v) => ffi::sqlite3_bind_double(stmt, index, *v),
            Value::Text(s) => bind_text(stmt, index, s),
            Value::Bytes(b) => ffi::sqlite3_bind_blob(
                stmt,
                index,
                b.as_ptr().cast(),
                b.len() as c_int,
                ffi::SQLITE_TRANSIENT(),
            ),
            Value::Json(j) => bind_text(stmt, index, &j.to_string()),
        }
    }
}

unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    // Text with interior NULs cannot round-trip through the C API; SQLite
    // accepts a length-delimited buffer, so pass bytes + length directly.
    unsafe {
        ffi::sqlite3_bind_text(
            stmt,
            index,
            text.as_ptr().cast(),
            text.len() as c_int,
            ffi::SQLITE_TRANSIENT(),
        )
    }
}

/// Decode the value in a 0-based result column of the current row.
///
/// # Safety
///
/// `stmt` must be a valid statement positioned on a row.
pub(crate) unsafe fn column_value(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Value {
    unsafe {
        match ffi::sqlite3_column_type(stmt, index) {
            ffi::SQLITE_INTEGER => Value::Int(ffi::sqlite3_column_int64(stmt, index)),
            ffi::SQLITE_FLOAT => Value::Float(ffi::sqlite3_column_double(stmt, index)),
            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    Value::Null
                } else {
                    let bytes = std::slice::from_raw_parts(ptr, len as usize);
                    Value::Text(String::from_utf8_lossy(bytes).into_owned())
                }
            }
            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() || len == 0 {
                    Value::Bytes(Vec::new())
                } else {
                    let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Bytes(bytes.to_vec())
                }
            }
            _ => Value::Null,
        }
    }
}

/// Result column names for a prepared statement, in order.
///
/// # Safety
///
/// `stmt` must be a valid prepared statement.
pub(crate) unsafe fn column_names(stmt: *mut ffi::sqlite3_stmt) -> Vec<String> {
    unsafe {
        let count = ffi::sqlite3_column_count(stmt);
        (0..count)
            .map(|i| {
                let ptr = ffi::sqlite3_column_name(stmt, i);
                if ptr.is_null() {
                    format!("column{i}")
                } else {
                    CStr::from_ptr(ptr).to_string_lossy().into_owned()
                }
            })
            .collect()
    }
}

/// Build a C string for the SQL text, rejecting interior NULs.
pub(crate) fn sql_cstring(sql: &str) -> Option<CString> {
    CString::new(sql).ok()
}
