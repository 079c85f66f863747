//! Core data models for cluster verification.
//!
//! This module contains the record, cluster and verdict types shared by the
//! passes, the orchestrator and the table I/O.

use crate::standardize::{standardize_field, FieldKind, StandardizedField};
use serde::Serialize;

/// Offset from a zero-based `row_index` to the row number a reviewer sees in
/// the spreadsheet: one for the header row, one for one-based numbering.
pub const ROW_NUMBER_OFFSET: usize = 2;

// ============================================================================
// Input Models
// ============================================================================

/// One input row. Absent cells already hold the `MISSING` sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Zero-based position in the ingested table
    pub row_index: usize,
    pub cluster_id: String,
    pub full_name: String,
    /// Raw, delimiter-separated
    pub phone_numbers: String,
    /// Raw, delimiter-separated
    pub emails: String,
    pub country: String,
    pub state: String,
    pub city: String,
}

impl Record {
    /// Row number as displayed in the reviewed table.
    pub fn display_row(&self) -> usize {
        self.row_index + ROW_NUMBER_OFFSET
    }
}

/// Record with its multi-valued fields parsed once for all passes.
#[derive(Clone, Debug)]
pub struct PreparedRecord {
    pub record: Record,
    pub phones: StandardizedField,
    pub emails: StandardizedField,
}

impl PreparedRecord {
    pub fn new(record: Record, delimiter: char) -> Self {
        let phones = standardize_field(&record.phone_numbers, delimiter, FieldKind::Phone);
        let emails = standardize_field(&record.emails, delimiter, FieldKind::Email);
        Self {
            record,
            phones,
            emails,
        }
    }
}

/// Records sharing one `cluster_id`, in input order.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub id: String,
    pub members: Vec<PreparedRecord>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn phone_sets(&self) -> impl Iterator<Item = &StandardizedField> {
        self.members.iter().map(|m| &m.phones)
    }

    pub fn email_sets(&self) -> impl Iterator<Item = &StandardizedField> {
        self.members.iter().map(|m| &m.emails)
    }
}

// ============================================================================
// Verdict Models
// ============================================================================

/// The pass that confirmed a cluster. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchPass {
    First,
    Second,
    Third,
    Fourth,
}

impl MatchPass {
    pub const ALL: [MatchPass; 4] = [
        MatchPass::First,
        MatchPass::Second,
        MatchPass::Third,
        MatchPass::Fourth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MatchPass::First => "first",
            MatchPass::Second => "second",
            MatchPass::Third => "third",
            MatchPass::Fourth => "fourth",
        }
    }

    /// Text written to the `same` output column.
    pub fn column_text(self) -> &'static str {
        match self {
            MatchPass::First => "first pass",
            MatchPass::Second => "second pass",
            MatchPass::Third => "third pass",
            MatchPass::Fourth => "fourth pass",
        }
    }

    /// Short description used in logs and progress bars.
    pub fn description(self) -> &'static str {
        match self {
            MatchPass::First => "full match",
            MatchPass::Second => "linked match",
            MatchPass::Third => "cross-link components",
            MatchPass::Fourth => "exact name and location",
        }
    }
}

/// Label for clusters no pass confirmed.
pub const UNMATCHED_LABEL: &str = "unmatched";

/// Explanation attached to a verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchCriteria {
    /// Same text for every record of the cluster
    Cluster(String),
    /// One text per cluster member, in member order (cross-link pass)
    PerRecord(Vec<String>),
}

/// Result of one pass for one cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchVerdict {
    pub pass: MatchPass,
    pub criteria: MatchCriteria,
}

impl MatchVerdict {
    pub fn cluster_wide(pass: MatchPass, criteria: impl Into<String>) -> Self {
        Self {
            pass,
            criteria: MatchCriteria::Cluster(criteria.into()),
        }
    }

    /// Criteria text for the member at `position` within the cluster.
    pub fn criteria_for(&self, position: usize) -> &str {
        match &self.criteria {
            MatchCriteria::Cluster(text) => text,
            MatchCriteria::PerRecord(texts) => texts.get(position).map_or("", String::as_str),
        }
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Verdict inherited by one input row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLabel {
    pub row_index: usize,
    pub cluster_id: String,
    /// None = unmatched
    pub pass: Option<MatchPass>,
    pub matching_criteria: String,
}

impl RecordLabel {
    pub fn label(&self) -> &'static str {
        self.pass.map_or(UNMATCHED_LABEL, MatchPass::label)
    }

    /// Value of the `same` column; empty for unmatched rows.
    pub fn same_text(&self) -> &'static str {
        self.pass.map_or("", MatchPass::column_text)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Aggregate counts for one run, returned by the orchestrator.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub first_pass_matches: usize,
    pub second_pass_matches: usize,
    pub third_pass_matches: usize,
    pub fourth_pass_matches: usize,
    pub unmatched: usize,
    pub total_clusters: usize,
    pub total_matches: usize,
    /// Percentage of clusters resolved by any pass
    pub match_rate: f64,
}

impl RunSummary {
    /// Reduce per-cluster outcomes into totals.
    pub fn from_passes<I>(passes: I) -> Self
    where
        I: IntoIterator<Item = Option<MatchPass>>,
    {
        let mut summary = RunSummary::default();
        for pass in passes {
            summary.total_clusters += 1;
            match pass {
                Some(MatchPass::First) => summary.first_pass_matches += 1,
                Some(MatchPass::Second) => summary.second_pass_matches += 1,
                Some(MatchPass::Third) => summary.third_pass_matches += 1,
                Some(MatchPass::Fourth) => summary.fourth_pass_matches += 1,
                None => summary.unmatched += 1,
            }
        }
        summary.total_matches = summary.total_clusters - summary.unmatched;
        summary.match_rate = if summary.total_clusters == 0 {
            0.0
        } else {
            100.0 * summary.total_matches as f64 / summary.total_clusters as f64
        };
        summary
    }

    pub fn count_for(&self, pass: MatchPass) -> usize {
        match pass {
            MatchPass::First => self.first_pass_matches,
            MatchPass::Second => self.second_pass_matches,
            MatchPass::Third => self.third_pass_matches,
            MatchPass::Fourth => self.fourth_pass_matches,
        }
    }

    /// Log per-pass counts and totals
    pub fn log_summary(&self) {
        for pass in MatchPass::ALL {
            log::info!("{}_pass_match_count: {}", pass.label(), self.count_for(pass));
        }
        log::info!("Total match count: {}", self.total_matches);
        log::info!("Total number of clusters: {}", self.total_clusters);
        log::info!(
            "Percentage of clusters found to have one and the same person: {}/{} = {:.3}%",
            self.total_matches,
            self.total_clusters,
            self.match_rate
        );
    }

    /// Write summary to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
