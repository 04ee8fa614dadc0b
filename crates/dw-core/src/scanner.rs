//! Dataset discovery: mapping files in a data directory to dataset references

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// On-disk format of a dataset, inferred from the filename extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Comma-separated values (`.csv`)
    Csv,
    /// Excel workbook (`.xlsx`)
    Spreadsheet,
}

impl Format {
    /// Infer the format from a file extension, if supported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Format::Csv),
            "xlsx" => Some(Format::Spreadsheet),
            _ => None,
        }
    }
}

/// A reference to one dataset file: its name, path and declared format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Dataset name (the file stem, e.g. "companies")
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
    /// Format implied by the extension
    pub format: Format,
}

impl DatasetRef {
    /// Build a reference from a path, inferring the format from the
    /// extension. Fails with `UnsupportedFormat` for any other extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })?
            .to_string();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            format,
        })
    }
}

/// Enumerate the selectable datasets in a data directory.
///
/// Only direct children with a supported extension are returned, sorted by
/// name. Files with any other extension are skipped.
pub fn scan_data_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<DatasetRef>> {
    let dir = dir.as_ref();
    let mut datasets = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        if let Ok(dataset) = DatasetRef::from_path(entry.path()) {
            datasets.push(dataset);
        }
    }

    datasets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(datasets)
}
