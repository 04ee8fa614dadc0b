//! Record editing: appending and keyed in-place updates.
//!
//! Both operations are pure. They take the table by reference and return a
//! new table; the caller decides whether to persist the result through the
//! dataset store.

use crate::error::{Error, Result};
use crate::table::{CellValue, Row, Table};
use std::collections::BTreeMap;

/// A candidate record: column name mapped to a new value as text.
///
/// Keys must be a subset of the target table's columns; values are
/// type-detected on insertion into the table.
pub type Record = BTreeMap<String, String>;

/// Append one row built from `record` to the end of the table.
///
/// Columns absent from the record get an empty cell. A record key that
/// names no column in the table is rejected with `UnknownColumn`; the
/// schema is never silently extended.
pub fn add_record(table: &Table, record: &Record) -> Result<Table> {
    check_record_columns(table, record)?;

    let cells = table
        .columns
        .iter()
        .map(|col| match record.get(&col.name) {
            Some(value) => CellValue::parse(value),
            None => CellValue::Empty,
        })
        .collect();

    let mut out = table.clone();
    out.rows.push(Row::new(cells));
    Ok(out)
}

/// Overwrite fields of the first row whose `key_column` cell equals
/// `key_value`.
///
/// Matching compares the candidate value against the stored cell's display
/// form, so "42" matches an integer cell holding 42. Only record entries
/// with a non-empty value are applied; an empty value means "leave that
/// field unchanged". Only the first match is updated even when the key
/// value occurs more than once. No match fails with `RecordNotFound` and
/// the input table is untouched.
pub fn update_record(
    table: &Table,
    key_column: &str,
    key_value: &str,
    record: &Record,
) -> Result<Table> {
    let key_idx = table
        .column_index(key_column)
        .ok_or_else(|| Error::UnknownColumn {
            column: key_column.to_string(),
        })?;
    check_record_columns(table, record)?;

    let wanted = key_value.trim();
    let row_idx = table
        .rows
        .iter()
        .position(|row| {
            row.get(key_idx)
                .is_some_and(|cell| cell.to_string_value() == wanted)
        })
        .ok_or_else(|| Error::RecordNotFound {
            column: key_column.to_string(),
            value: key_value.to_string(),
        })?;

    let mut out = table.clone();
    for (column, value) in record {
        if value.trim().is_empty() {
            continue;
        }
        if let Some(idx) = out.column_index(column) {
            out.rows[row_idx].cells[idx] = CellValue::parse(value);
        }
    }

    Ok(out)
}

fn check_record_columns(table: &Table, record: &Record) -> Result<()> {
    for column in record.keys() {
        if table.column_index(column).is_none() {
            return Err(Error::UnknownColumn {
                column: column.clone(),
            });
        }
    }
    Ok(())
}
