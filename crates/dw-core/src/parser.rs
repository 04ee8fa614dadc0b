//! File decoders turning CSV and XLSX content into tables

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

/// Parse a CSV file into a Table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    parse_csv_reader(reader, path)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str) -> Result<Table> {
    parse_csv_reader(content.as_bytes(), Path::new("<memory>"))
}

fn parse_csv_reader<R: std::io::Read>(reader: R, path: &Path) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::Malformed {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
        rows.push(Row::new(align_cells(cells, columns.len(), row_idx, path)));
    }

    Ok(Table { columns, rows })
}

/// Parse the first worksheet of an XLSX file into a Table
pub fn parse_xlsx<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| Error::Spreadsheet {
        path: path.to_path_buf(),
        source: e,
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Malformed {
            path: path.to_path_buf(),
            message: "workbook has no worksheets".to_string(),
        })?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Spreadsheet {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows.next().ok_or_else(|| Error::Malformed {
        path: path.to_path_buf(),
        message: "worksheet has no header row".to_string(),
    })?;

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| Column::new(sheet_cell(cell).to_string_value(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::Malformed {
            path: path.to_path_buf(),
            message: "no columns found in worksheet".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, sheet_row) in sheet_rows.enumerate() {
        let cells: Vec<CellValue> = sheet_row.iter().map(sheet_cell).collect();
        rows.push(Row::new(align_cells(cells, columns.len(), row_idx, path)));
    }

    Ok(Table { columns, rows })
}

/// Pad short rows with empty cells and truncate long ones to the header width
fn align_cells(mut cells: Vec<CellValue>, width: usize, row_idx: usize, path: &Path) -> Vec<CellValue> {
    while cells.len() < width {
        cells.push(CellValue::Empty);
    }

    if cells.len() > width {
        warn!(
            row = row_idx + 1,
            path = %path.display(),
            "row has more cells than columns, truncating"
        );
        cells.truncate(width);
    }

    cells
}

/// Convert a calamine cell into our cell model.
///
/// Whole-valued floats collapse to integers so that a value written as 42
/// survives an XLSX round-trip with the same type the CSV parser detects.
fn sheet_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => float_cell(*f),
        Data::String(s) => CellValue::parse(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => float_cell(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

fn float_cell(f: f64) -> CellValue {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        CellValue::Integer(f as i64)
    } else {
        CellValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "company,industry,value\nAcme,tech,100\nGlobex,bio,200\n";
        let table = parse_csv_str(csv).unwrap();

        assert_eq!(table.column_names(), vec!["company", "industry", "value"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows[0].cells[0],
            CellValue::Text("Acme".to_string())
        );
        assert_eq!(table.rows[1].cells[2], CellValue::Integer(200));
    }

    #[test]
    fn test_parse_with_empty_cells() {
        let csv = "id,name,value\n1,,100\n2,bar,\n";
        let table = parse_csv_str(csv).unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
        assert_eq!(table.rows[1].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_parse_short_rows_padded() {
        let csv = "a,b,c\n1\n";
        let table = parse_csv_str(csv).unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
        assert_eq!(table.rows[0].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_parse_with_floats() {
        let csv = "id,value\n1,3.14\n2,-2.5\n";
        let table = parse_csv_str(csv).unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Float(3.14));
        assert_eq!(table.rows[1].cells[1], CellValue::Float(-2.5));
    }

    #[test]
    fn test_parse_quoted_commas() {
        let csv = "name,notes\nAcme,\"one, two\"\n";
        let table = parse_csv_str(csv).unwrap();

        assert_eq!(
            table.rows[0].cells[1],
            CellValue::Text("one, two".to_string())
        );
    }

    #[test]
    fn test_float_cell_collapses_whole_values() {
        assert_eq!(float_cell(42.0), CellValue::Integer(42));
        assert_eq!(float_cell(2.5), CellValue::Float(2.5));
    }
}
