//! File access helpers shared by the reference loaders and the input reader

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::UltraError;

const BUFFER_SIZE: usize = 1024 * 1024;

/// True when the path names a gzip or bgzip file
pub fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz") || e.eq_ignore_ascii_case("bgz"))
        .unwrap_or(false)
}

/// Open a plain or gzip-compressed text file
///
/// A missing file is reported as [`UltraError::MissingReferenceData`] so that
/// startup failures name the file that is absent.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>, UltraError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => UltraError::MissingReferenceData {
            path: path.display().to_string(),
        },
        _ => UltraError::Io {
            msg: format!("Failed to open {}: {}", path.display(), e),
        },
    })?;
    Ok(if is_gzipped(path) {
        Box::new(BufReader::with_capacity(
            BUFFER_SIZE,
            MultiGzDecoder::new(file),
        ))
    } else {
        Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
    })
}

/// Read a tab-separated header-named table
///
/// Lines starting with `##` are skipped. The first remaining line is the
/// header; a leading `#` on it is dropped.
#[derive(Debug, Clone)]
pub struct TsvTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<TsvRow>,
}

/// One data row of a [`TsvTable`]
#[derive(Debug, Clone)]
pub struct TsvRow {
    /// 1-based line number in the file
    pub line: usize,
    fields: Vec<String>,
}

impl TsvTable {
    /// Load a table from disk
    pub fn read(path: &Path) -> Result<Self, UltraError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(name, open_reader(path)?)
    }

    /// Parse a table from any reader
    pub fn from_reader(name: impl Into<String>, reader: impl BufRead) -> Result<Self, UltraError> {
        let name = name.into();
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() || line.starts_with("##") {
                continue;
            }
            match columns {
                None => {
                    columns = Some(
                        line.trim_start_matches('#')
                            .split('\t')
                            .map(|c| c.trim().to_string())
                            .collect(),
                    );
                }
                Some(_) => rows.push(TsvRow {
                    line: idx + 1,
                    fields: line.split('\t').map(|f| f.to_string()).collect(),
                }),
            }
        }

        let columns =
            columns.ok_or_else(|| UltraError::reference_data(name.clone(), "missing header line"))?;
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Table name used in error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[TsvRow] {
        &self.rows
    }

    /// Index of a column, if present
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Index of a column that must be present
    pub fn require_column(&self, name: &str) -> Result<usize, UltraError> {
        self.column(name).ok_or_else(|| {
            UltraError::reference_data(self.name.clone(), format!("missing column {}", name))
        })
    }
}

impl TsvRow {
    /// Field at a column index; missing trailing fields read as empty
    pub fn get(&self, col: usize) -> &str {
        self.fields.get(col).map(|f| f.trim()).unwrap_or("")
    }

    /// Field at an optional column, treating `NA`, `.` and empty as absent
    pub fn opt(&self, col: Option<usize>) -> Option<&str> {
        let value = self.get(col?);
        if is_missing(value) {
            None
        } else {
            Some(value)
        }
    }
}

/// True for the spellings of a missing value used across the tables
pub fn is_missing(value: &str) -> bool {
    matches!(value.trim(), "" | "NA" | "." | "nan" | "NaN" | "None")
}

/// Parse an optional floating point value
pub fn parse_opt_f64(value: &str) -> Option<f64> {
    if is_missing(value) {
        None
    } else {
        value.trim().parse().ok()
    }
}
