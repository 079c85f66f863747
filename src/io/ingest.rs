//! Table ingestion. Null and blank cells arrive at the core as `MISSING`.

use super::{quote_ident, Table, TableFormat};
use crate::config::ColumnMap;
use crate::models::Record;
use crate::standardize::SENTINEL;
use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Read a CSV file, an SQLite table or an Excel sheet and project the
/// matcher's columns. `table_name` names the SQLite table or the worksheet.
pub fn read_table(path: &Path, table_name: &str, columns: &ColumnMap) -> Result<Table> {
    let (headers, rows) = match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Sqlite => read_sqlite(path, table_name)?,
        TableFormat::Xlsx => read_xlsx(path, table_name)?,
    };
    let records = project_records(&headers, &rows, columns)
        .with_context(|| format!("Failed to map columns of {}", path.display()))?;
    Ok(Table {
        headers,
        rows,
        records,
    })
}

fn fill_missing(cell: String) -> String {
    if cell.trim().is_empty() {
        SENTINEL.to_string()
    } else {
        cell
    }
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", i + 2))?;
        rows.push(record.iter().map(|c| fill_missing(c.to_string())).collect());
    }
    Ok((headers, rows))
}

fn read_sqlite(path: &Path, table_name: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open source database {}", path.display()))?;

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote_ident(table_name)))
        .with_context(|| format!("Failed to read table '{}'", table_name))?;
    let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let cell = match row.get_ref(i)? {
                ValueRef::Null => SENTINEL.to_string(),
                ValueRef::Integer(v) => v.to_string(),
                ValueRef::Real(v) => v.to_string(),
                ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
            };
            cells.push(fill_missing(cell));
        }
        rows.push(cells);
    }
    Ok((headers, rows))
}

/// Cell text as a reviewer would read it. Whole floats lose their ".0".
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => n.to_string(),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => b.to_string().to_uppercase(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => dt.as_f64().to_string(),
    }
}

/// First row is the header. Uses the sheet named `sheet_name` when the
/// workbook has one, otherwise the first sheet.
fn read_xlsx(path: &Path, sheet_name: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet = match sheet_names.iter().find(|name| name.as_str() == sheet_name) {
        Some(name) => name.clone(),
        None => match sheet_names.first() {
            Some(first) => {
                log::debug!("No sheet named '{}', reading '{}'", sheet_name, first);
                first.clone()
            }
            None => bail!("Workbook {} contains no sheets", path.display()),
        },
    };

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Failed to read sheet '{}'", sheet))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => bail!("Sheet '{}' has no header row", sheet),
    };

    let rows = rows_iter
        .map(|row| row.iter().map(|c| fill_missing(cell_text(c))).collect())
        .collect();
    Ok((headers, rows))
}

/// Build records from raw rows using the configured header names.
pub fn project_records(
    headers: &[String],
    rows: &[Vec<String>],
    columns: &ColumnMap,
) -> Result<Vec<Record>> {
    let mut positions = [0usize; 7];
    for (slot, name) in positions.iter_mut().zip(columns.required()) {
        *slot = match headers.iter().position(|h| h == name) {
            Some(p) => p,
            None => bail!("Missing required column '{}'", name),
        };
    }
    let [cluster, name, phones, emails, country, state, city] = positions;

    let cell = |row: &[String], idx: usize| -> String {
        row.get(idx).cloned().unwrap_or_else(|| SENTINEL.to_string())
    };

    Ok(rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let row = row.as_slice();
            Record {
                row_index,
                cluster_id: cell(row, cluster),
                full_name: cell(row, name),
                phone_numbers: cell(row, phones),
                emails: cell(row, emails),
                country: cell(row, country),
                state: cell(row, state),
                city: cell(row, city),
            }
        })
        .collect())
}
