//! Column mapping and shared command-line options.

use crate::standardize::DEFAULT_DELIMITER;

/// Default SQLite table for input and output.
pub const DEFAULT_TABLE: &str = "investigators";

/// Header names of the columns the matcher reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub cluster_id: String,
    pub full_name: String,
    pub phone_numbers: String,
    pub emails: String,
    pub country: String,
    pub state: String,
    pub city: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            cluster_id: "fire_investigator_id".into(),
            full_name: "investigator_full_name".into(),
            phone_numbers: "investigator_phone_number".into(),
            emails: "investigator_email".into(),
            country: "investigator_country".into(),
            state: "investigator_state".into(),
            city: "investigator_city".into(),
        }
    }
}

impl ColumnMap {
    /// All required columns, in `Record` field order.
    pub fn required(&self) -> [&str; 7] {
        [
            &self.cluster_id,
            &self.full_name,
            &self.phone_numbers,
            &self.emails,
            &self.country,
            &self.state,
            &self.city,
        ]
    }
}

/// Options shared by every binary that reads a table.
#[derive(clap::Args, Debug, Clone)]
pub struct TableArgs {
    /// SQLite table to read (and write, for SQLite output)
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Separator between values in multi-valued cells
    #[arg(long, default_value_t = DEFAULT_DELIMITER)]
    pub delimiter: char,

    #[arg(long, default_value = "fire_investigator_id")]
    pub cluster_column: String,

    #[arg(long, default_value = "investigator_full_name")]
    pub name_column: String,

    #[arg(long, default_value = "investigator_phone_number")]
    pub phone_column: String,

    #[arg(long, default_value = "investigator_email")]
    pub email_column: String,

    #[arg(long, default_value = "investigator_country")]
    pub country_column: String,

    #[arg(long, default_value = "investigator_state")]
    pub state_column: String,

    #[arg(long, default_value = "investigator_city")]
    pub city_column: String,
}

impl TableArgs {
    pub fn columns(&self) -> ColumnMap {
        ColumnMap {
            cluster_id: self.cluster_column.clone(),
            full_name: self.name_column.clone(),
            phone_numbers: self.phone_column.clone(),
            emails: self.email_column.clone(),
            country: self.country_column.clone(),
            state: self.state_column.clone(),
            city: self.city_column.clone(),
        }
    }
}
