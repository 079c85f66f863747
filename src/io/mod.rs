//! Reading the input table and writing the annotated copy.
//!
//! Tables are CSV, SQLite or Excel workbooks, chosen by file extension. Both sides work on
//! [`Table`], which keeps every input column so the output can echo them.

pub mod egress;
pub mod ingest;

use crate::models::Record;
use anyhow::{bail, Result};
use std::path::Path;

pub use egress::{write_table, ColorBand};
pub use ingest::read_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Sqlite,
    /// First worksheet, or the sheet named like the table
    Xlsx,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "sqlite" | "sqlite3" | "db" => Ok(TableFormat::Sqlite),
            "xlsx" => Ok(TableFormat::Xlsx),
            _ => bail!(
                "Unsupported table format for '{}': expected .csv, .xlsx, .sqlite, .sqlite3 or .db",
                path.display()
            ),
        }
    }
}

/// Ingested table: original headers, sentinel-filled cells, projected records.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    /// One entry per row, aligned with `headers`
    pub rows: Vec<Vec<String>>,
    /// `records[i].row_index == i`
    pub records: Vec<Record>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Quote an SQLite identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
