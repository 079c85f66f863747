//! Writes the input table back out with the verdict columns.
//!
//! The verdict columns are appended, or overwritten in place when the input
//! already has them (a previous run's output fed back in). Excel output also
//! fills each row with its review color.

use super::{quote_ident, Table, TableFormat};
use crate::models::{MatchPass, RecordLabel};
use crate::orchestrator::MatchOutcome;
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};
use rust_xlsxwriter::{Color, Format, Workbook};
use std::path::Path;

const WRITE_BATCH_SIZE: usize = 10_000;

/// Verdict columns, appended after the input columns unless already present.
pub const OUTPUT_COLUMNS: [&str; 3] = ["same", "matching_criteria", "review_color"];

/// Review highlight per verdict. Five fixed bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBand {
    Green,
    LightGreen,
    Blue,
    Yellow,
    White,
}

impl ColorBand {
    pub fn for_pass(pass: Option<MatchPass>) -> Self {
        match pass {
            Some(MatchPass::First) => ColorBand::Green,
            Some(MatchPass::Second) => ColorBand::LightGreen,
            Some(MatchPass::Third) => ColorBand::Blue,
            Some(MatchPass::Fourth) => ColorBand::Yellow,
            None => ColorBand::White,
        }
    }

    pub fn rgb(self) -> u32 {
        match self {
            ColorBand::Green => 0x00FF00,
            ColorBand::LightGreen => 0x90EE90,
            ColorBand::Blue => 0xADD8E6,
            ColorBand::Yellow => 0xFFFF00,
            ColorBand::White => 0xFFFFFF,
        }
    }

    /// RGB hex, as written to the `review_color` column.
    pub fn hex(self) -> String {
        format!("{:06X}", self.rgb())
    }

    /// Solid row fill for Excel output.
    pub fn fill(self) -> Format {
        Format::new().set_background_color(Color::RGB(self.rgb()))
    }
}

/// Output header order and the position of each verdict column.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputLayout {
    headers: Vec<String>,
    /// Positions of `same`, `matching_criteria`, `review_color`
    slots: [usize; 3],
}

impl OutputLayout {
    fn for_table(table: &Table) -> Self {
        let mut headers = table.headers.clone();
        let mut slots = [0usize; 3];
        for (slot, name) in slots.iter_mut().zip(OUTPUT_COLUMNS) {
            *slot = match headers.iter().position(|h| h == name) {
                Some(p) => p,
                None => {
                    headers.push(name.to_string());
                    headers.len() - 1
                }
            };
        }
        Self { headers, slots }
    }

    /// Input cells with the verdict written into its columns.
    fn row(&self, row: &[String], label: Option<&RecordLabel>) -> Vec<String> {
        let pass = label.and_then(|l| l.pass);
        let mut out = row.to_vec();
        out.resize(self.headers.len(), String::new());

        let [same, criteria, color] = self.slots;
        out[same] = label.map_or("", |l| l.same_text()).to_string();
        out[criteria] = label.map_or(String::new(), |l| l.matching_criteria.clone());
        out[color] = ColorBand::for_pass(pass).hex();
        out
    }
}

/// Write the annotated table as CSV, into an SQLite table (replacing it) or
/// as a workbook whose single sheet is named `table_name`.
pub fn write_table(path: &Path, table: &Table, outcome: &MatchOutcome, table_name: &str) -> Result<()> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => write_csv(path, table, outcome),
        TableFormat::Sqlite => write_sqlite(path, table, outcome, table_name),
        TableFormat::Xlsx => write_xlsx(path, table, outcome, table_name),
    }
}

fn write_csv(path: &Path, table: &Table, outcome: &MatchOutcome) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output {}", path.display()))?;
    let layout = OutputLayout::for_table(table);
    writer.write_record(&layout.headers)?;
    for (row_index, row) in table.rows.iter().enumerate() {
        writer.write_record(layout.row(row, outcome.label_for_row(row_index)))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_sqlite(path: &Path, table: &Table, outcome: &MatchOutcome, table_name: &str) -> Result<()> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to create output database {}", path.display()))?;

    let layout = OutputLayout::for_table(table);
    let headers = &layout.headers;
    let column_defs: Vec<String> = headers
        .iter()
        .map(|h| format!("{} TEXT", quote_ident(h)))
        .collect();
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {name};
         CREATE TABLE {name} ({columns});",
        name = quote_ident(table_name),
        columns = column_defs.join(", ")
    ))?;

    let placeholders: Vec<String> = (1..=headers.len()).map(|i| format!("?{}", i)).collect();
    let insert_sql = format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table_name),
        placeholders.join(", ")
    );

    for (chunk_idx, chunk) in table.rows.chunks(WRITE_BATCH_SIZE).enumerate() {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&insert_sql)?;
            for (offset, row) in chunk.iter().enumerate() {
                let row_index = chunk_idx * WRITE_BATCH_SIZE + offset;
                stmt.execute(params_from_iter(layout.row(row, outcome.label_for_row(row_index))))?;
            }
        }
        tx.commit()?;
    }
    Ok(())
}

fn write_xlsx(path: &Path, table: &Table, outcome: &MatchOutcome, sheet_name: &str) -> Result<()> {
    let layout = OutputLayout::for_table(table);
    let mut workbook = Workbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .with_context(|| format!("Invalid sheet name '{}'", sheet_name))?;

    let header_format = Format::new().set_bold();
    for (col, header) in layout.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        let label = outcome.label_for_row(row_index);
        let fill = ColorBand::for_pass(label.and_then(|l| l.pass)).fill();
        let row32 = (row_index + 1) as u32;
        for (col, cell) in layout.row(row, label).iter().enumerate() {
            sheet.write_string_with_format(row32, col as u16, cell, &fill)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMap;
    use crate::io::read_table;
    use crate::orchestrator::verify_clusters;
    use crate::standardize::SENTINEL;
    use std::io::Read;

    const INPUT: &str = "\
fire_investigator_id,investigator_full_name,investigator_phone_number,investigator_email,investigator_country,investigator_state,investigator_city
1,Ann Lee,555-1234,ann@x.com,US,OH,Dayton
1,Ann Lee,(555) 1234,,US,OH,Dayton
2,Bo Kim,111,b1@x.com,US,OH,Dayton
2,Bo Kim,111|222,b2@x.com,US,OH,Dayton
2,Bo Kim,222,b2@x.com,US,OH,Dayton
3,Cy Ng,,,US,OH,Dayton
3,Di Roe,,,US,OH,Dayton
";

    fn load(dir: &tempfile::TempDir) -> (Table, MatchOutcome) {
        let input = dir.path().join("input.csv");
        std::fs::write(&input, INPUT).unwrap();
        let table = read_table(&input, "investigators", &ColumnMap::default()).unwrap();
        let outcome = verify_clusters(table.records.clone(), '|');
        (table, outcome)
    }

    #[test]
    fn test_color_bands() {
        assert_eq!(ColorBand::for_pass(Some(MatchPass::First)).hex(), "00FF00");
        assert_eq!(ColorBand::for_pass(Some(MatchPass::Second)).hex(), "90EE90");
        assert_eq!(ColorBand::for_pass(Some(MatchPass::Third)).hex(), "ADD8E6");
        assert_eq!(ColorBand::for_pass(Some(MatchPass::Fourth)).hex(), "FFFF00");
        assert_eq!(ColorBand::for_pass(None).hex(), "FFFFFF");
    }

    #[test]
    fn test_write_csv_appends_verdict_columns() {
        let dir = tempfile::tempdir().unwrap();
        let (table, outcome) = load(&dir);
        let output = dir.path().join("output.csv");
        write_table(&output, &table, &outcome, "investigators").unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[7], "same");
        assert_eq!(&headers[8], "matching_criteria");
        assert_eq!(&headers[9], "review_color");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(&rows[0][7], "first pass");
        assert_eq!(&rows[0][8], "all phone numbers match");
        assert_eq!(&rows[1][3], "MISSING");
        assert_eq!(&rows[2][7], "third pass");
        assert_eq!(&rows[2][8], "matched with rows: 5 - phone");
        assert_eq!(&rows[3][8], "matched with rows: 4 - phone; 6 - phone, email");
        assert_eq!(&rows[2][9], "ADD8E6");
        assert_eq!(&rows[5][7], "");
        assert_eq!(&rows[5][9], "FFFFFF");
    }

    #[test]
    fn test_write_sqlite_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let (table, outcome) = load(&dir);
        let output = dir.path().join("output.sqlite3");
        write_table(&output, &table, &outcome, "results").unwrap();
        write_table(&output, &table, &outcome, "results").unwrap();

        let conn = Connection::open(&output).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 7);
        let same: String = conn
            .query_row(
                "SELECT same FROM results WHERE investigator_full_name = 'Bo Kim' LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(same, "third pass");
    }

    #[test]
    fn test_rerun_on_own_output_overwrites_verdict_columns() {
        let dir = tempfile::tempdir().unwrap();
        let (table, outcome) = load(&dir);
        let first = dir.path().join("first.csv");
        write_table(&first, &table, &outcome, "investigators").unwrap();

        let reread = read_table(&first, "investigators", &ColumnMap::default()).unwrap();
        assert_eq!(reread.headers.len(), 10);
        let outcome = verify_clusters(reread.records.clone(), '|');

        let second = dir.path().join("second.csv");
        write_table(&second, &reread, &outcome, "investigators").unwrap();
        let mut reader = csv::Reader::from_path(&second).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 10);
        assert_eq!(headers.iter().filter(|h| *h == "same").count(), 1);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[2][7], "third pass");
        assert_eq!(&rows[3][8], "matched with rows: 4 - phone; 6 - phone, email");
        // Re-read blank verdicts come back as MISSING and are reset
        assert_eq!(&rows[5][7], "");

        let db = dir.path().join("second.sqlite3");
        write_table(&db, &reread, &outcome, "results").unwrap();
        let conn = Connection::open(&db).unwrap();
        let columns: i64 = conn
            .query_row("SELECT COUNT(*) FROM pragma_table_info('results')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(columns, 10);
    }

    #[test]
    fn test_output_layout_reuses_existing_columns() {
        let table = Table {
            headers: vec!["review_color".into(), "id".into(), "same".into()],
            rows: vec![vec!["old".into(), "1".into(), "old".into()]],
            records: Vec::new(),
        };
        let layout = OutputLayout::for_table(&table);
        assert_eq!(
            layout.headers,
            vec!["review_color", "id", "same", "matching_criteria"]
        );
        assert_eq!(layout.slots, [2, 3, 0]);

        let row = layout.row(&table.rows[0], None);
        assert_eq!(row, vec!["FFFFFF", "1", "", ""]);
    }

    #[test]
    fn test_write_xlsx_fills_rows_by_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let (table, outcome) = load(&dir);
        let output = dir.path().join("output.xlsx");
        write_table(&output, &table, &outcome, "investigators").unwrap();

        let reread = read_table(&output, "investigators", &ColumnMap::default()).unwrap();
        assert_eq!(reread.headers.len(), 10);
        assert_eq!(reread.len(), 7);
        assert_eq!(reread.rows[0][7], "first pass");
        assert_eq!(reread.rows[2][7], "third pass");
        assert_eq!(reread.rows[2][9], "ADD8E6");
        assert_eq!(reread.rows[5][7], SENTINEL);
        assert_eq!(reread.records[3].phone_numbers, "111|222");

        let file = std::fs::File::open(&output).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut styles = String::new();
        archive
            .by_name("xl/styles.xml")
            .unwrap()
            .read_to_string(&mut styles)
            .unwrap();
        assert!(styles.contains("00FF00"));
        assert!(styles.contains("ADD8E6"));
        assert!(styles.contains("FFFFFF"));
        assert!(!styles.contains("90EE90"));
    }
}
