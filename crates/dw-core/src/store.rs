//! Dataset store: loading tables with projections, persisting them back,
//! and keeping a cache that can never serve a stale read after a save.

use crate::error::{Error, Result};
use crate::parser::{parse_csv, parse_xlsx};
use crate::scanner::{scan_data_dir, DatasetRef, Format};
use crate::table::{CellValue, Table};
use rust_xlsxwriter::Workbook;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cache key for a load: the file plus the exact projections requested.
/// This is a key space over indices and names, not a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    rows: Option<Vec<usize>>,
    columns: Option<Vec<String>>,
}

/// Store for the datasets in one data directory.
///
/// Loads are cached per (file, row filter, column filter); every save
/// invalidates all cached entries for the written file, so a load after a
/// save always observes the new contents. There is no file locking: with
/// concurrent writers the last one wins.
pub struct DatasetStore {
    data_dir: PathBuf,
    cache: HashMap<CacheKey, Table>,
}

impl DatasetStore {
    /// Create a store over the given data directory
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// The data directory this store reads and writes
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List the selectable datasets in the data directory
    pub fn list(&self) -> Result<Vec<DatasetRef>> {
        scan_data_dir(&self.data_dir)
    }

    /// Resolve a dataset name to a reference, trying each supported
    /// extension in turn
    pub fn dataset(&self, name: &str) -> Result<DatasetRef> {
        for ext in ["csv", "xlsx"] {
            let path = self.data_dir.join(format!("{}.{}", name, ext));
            if path.is_file() {
                return DatasetRef::from_path(path);
            }
        }

        Err(Error::NotFound {
            path: self.data_dir.join(name),
        })
    }

    /// Load a dataset, optionally projecting to the given positional row
    /// indices and/or column names.
    ///
    /// Projections are applied in the order requested: columns come out in
    /// the order of `columns`, rows in the order of `rows`. Both are
    /// validated before slicing; an unknown column fails with
    /// `UnknownColumn` and a bad index with `RowOutOfRange`.
    pub fn load(
        &mut self,
        dataset: &DatasetRef,
        rows: Option<&[usize]>,
        columns: Option<&[String]>,
    ) -> Result<Table> {
        let key = CacheKey {
            path: dataset.path.clone(),
            rows: rows.map(|r| r.to_vec()),
            columns: columns.map(|c| c.to_vec()),
        };

        if let Some(table) = self.cache.get(&key) {
            debug!(dataset = %dataset.name, "load served from cache");
            return Ok(table.clone());
        }

        if !dataset.path.is_file() {
            return Err(Error::NotFound {
                path: dataset.path.clone(),
            });
        }

        let mut table = match dataset.format {
            Format::Csv => parse_csv(&dataset.path)?,
            Format::Spreadsheet => parse_xlsx(&dataset.path)?,
        };

        if let Some(names) = columns {
            table = table.project_columns(names)?;
        }
        if let Some(indices) = rows {
            table = table.project_rows(indices)?;
        }

        debug!(
            dataset = %dataset.name,
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded dataset"
        );
        self.cache.insert(key, table.clone());
        Ok(table)
    }

    /// Serialize a table back to the dataset's file, overwriting it.
    ///
    /// Headers are always written and no index column is added. The write
    /// is not atomic; a crash mid-write can leave a truncated file. All
    /// cached entries for the file are invalidated afterwards.
    pub fn save(&mut self, dataset: &DatasetRef, table: &Table) -> Result<()> {
        match dataset.format {
            Format::Csv => write_csv(&dataset.path, table)?,
            Format::Spreadsheet => write_xlsx(&dataset.path, table)?,
        }

        debug!(dataset = %dataset.name, rows = table.row_count(), "saved dataset");
        self.invalidate(dataset);
        Ok(())
    }

    /// Drop every cached entry for the dataset's file. Called by `save`;
    /// also available to callers that mutate files behind the store's back.
    pub fn invalidate(&mut self, dataset: &DatasetRef) {
        self.cache.retain(|key, _| key.path != dataset.path);
    }
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header: Vec<String> = table
        .columns
        .iter()
        .map(|c| escape_csv(&c.name))
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|c| escape_csv(&c.to_string_value()))
            .collect();
        writeln!(writer, "{}", cells.join(","))?;
    }

    Ok(())
}

fn write_xlsx(path: &Path, table: &Table) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let write_err = |e: rust_xlsxwriter::XlsxError| Error::SpreadsheetWrite {
        path: path.to_path_buf(),
        source: e,
    };

    for (col, column) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, &column.name)
            .map_err(write_err)?;
    }

    for (row, table_row) in table.rows.iter().enumerate() {
        for (col, cell) in table_row.cells.iter().enumerate() {
            let (r, c) = (row as u32 + 1, col as u16);
            match cell {
                CellValue::Integer(i) => {
                    worksheet.write_number(r, c, *i as f64).map_err(write_err)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(r, c, *f).map_err(write_err)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(r, c, s).map_err(write_err)?;
                }
                CellValue::Empty => {}
            }
        }
    }

    workbook.save(path).map_err(write_err)?;
    Ok(())
}

/// Escape a value for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = DatasetStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_dataset_resolution() {
        let (_dir, store) = store_with(&[("companies.csv", "company\nAcme\n")]);

        let dataset = store.dataset("companies").unwrap();
        assert_eq!(dataset.name, "companies");
        assert_eq!(dataset.format, Format::Csv);

        let err = store.dataset("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_load_with_projections() {
        let (_dir, mut store) = store_with(&[(
            "companies.csv",
            "company,industry,value\nAcme,tech,1\nGlobex,bio,2\nInitech,tech,3\n",
        )]);
        let dataset = store.dataset("companies").unwrap();

        let cols = vec!["value".to_string(), "company".to_string()];
        let table = store.load(&dataset, Some(&[2, 0]), Some(&cols)).unwrap();

        assert_eq!(table.column_names(), vec!["value", "company"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(3));
        assert_eq!(
            table.rows[1].cells[1],
            CellValue::Text("Acme".to_string())
        );
    }

    #[test]
    fn test_load_rejects_bad_projection() {
        let (_dir, mut store) = store_with(&[("companies.csv", "company\nAcme\n")]);
        let dataset = store.dataset("companies").unwrap();

        let cols = vec!["nope".to_string()];
        let err = store.load(&dataset, None, Some(&cols)).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { .. }));

        let err = store.load(&dataset, Some(&[9]), None).unwrap_err();
        assert!(matches!(err, Error::RowOutOfRange { index: 9, rows: 1 }));
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, mut store) = store_with(&[]);
        let dataset = DatasetRef::from_path(store.data_dir().join("ghost.csv")).unwrap();

        let err = store.load(&dataset, None, None).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_csv_round_trip() {
        let (_dir, mut store) = store_with(&[(
            "funds.csv",
            "company,date_added,value\nAcme,2023-01-02,1000\nGlobex,2023-02-03,2.5\nAcme,,\n",
        )]);
        let dataset = store.dataset("funds").unwrap();

        let table = store.load(&dataset, None, None).unwrap();
        store.save(&dataset, &table).unwrap();
        let reloaded = store.load(&dataset, None, None).unwrap();

        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_csv_round_trip_quoting() {
        let (_dir, mut store) = store_with(&[(
            "notes.csv",
            "name,notes\nAcme,\"one, two\"\nGlobex,\"say \"\"hi\"\"\"\n",
        )]);
        let dataset = store.dataset("notes").unwrap();

        let table = store.load(&dataset, None, None).unwrap();
        store.save(&dataset, &table).unwrap();
        let reloaded = store.load(&dataset, None, None).unwrap();

        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_xlsx_round_trip() {
        let (_dir, mut store) = store_with(&[(
            "companies.csv",
            "company,industry,value\nAcme,tech,42\nGlobex,bio,2.5\nInitech,,\n",
        )]);
        let csv_ref = store.dataset("companies").unwrap();
        let table = store.load(&csv_ref, None, None).unwrap();

        let xlsx_ref =
            DatasetRef::from_path(store.data_dir().join("companies2.xlsx")).unwrap();
        store.save(&xlsx_ref, &table).unwrap();
        let reloaded = store.load(&xlsx_ref, None, None).unwrap();

        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_save_invalidates_cache() {
        let (_dir, mut store) = store_with(&[("companies.csv", "company\nAcme\n")]);
        let dataset = store.dataset("companies").unwrap();

        let table = store.load(&dataset, None, None).unwrap();
        assert_eq!(table.row_count(), 1);

        let record = crate::editor::Record::from([(
            "company".to_string(),
            "Globex".to_string(),
        )]);
        let grown = crate::editor::add_record(&table, &record).unwrap();
        store.save(&dataset, &grown).unwrap();

        let reloaded = store.load(&dataset, None, None).unwrap();
        assert_eq!(reloaded.row_count(), 2);
        assert_eq!(
            reloaded.rows[1].cells[0],
            CellValue::Text("Globex".to_string())
        );
    }

    #[test]
    fn test_cache_serves_repeat_loads() {
        let (dir, mut store) = store_with(&[("companies.csv", "company\nAcme\n")]);
        let dataset = store.dataset("companies").unwrap();

        let first = store.load(&dataset, None, None).unwrap();

        // Mutate the file behind the store's back: the cached table is
        // served until an explicit invalidation.
        fs::write(dir.path().join("companies.csv"), "company\nAcme\nGlobex\n").unwrap();
        let cached = store.load(&dataset, None, None).unwrap();
        assert_eq!(cached, first);

        store.invalidate(&dataset);
        let fresh = store.load(&dataset, None, None).unwrap();
        assert_eq!(fresh.row_count(), 2);
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }
}
