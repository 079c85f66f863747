//! Runs the four passes over all clusters in priority order.
//!
//! Each pass evaluates the still-unresolved clusters in parallel; verdicts
//! are then merged into the [`VerdictTable`] in cluster order with
//! set-if-unset semantics, so an earlier pass always wins.

use crate::models::{Cluster, MatchPass, MatchVerdict, PreparedRecord, Record, RecordLabel, RunSummary};
use crate::passes;
use crate::progress::PassProgress;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

// ============================================================================
// Grouping
// ============================================================================

/// Group records by `cluster_id`, keeping first-appearance order of clusters
/// and input order within each cluster.
pub fn group_records(records: Vec<Record>, delimiter: char) -> Vec<Cluster> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut clusters: Vec<Cluster> = Vec::new();

    for record in records {
        let slot = match index.get(&record.cluster_id) {
            Some(&slot) => slot,
            None => {
                index.insert(record.cluster_id.clone(), clusters.len());
                clusters.push(Cluster {
                    id: record.cluster_id.clone(),
                    members: Vec::new(),
                });
                clusters.len() - 1
            }
        };
        clusters[slot].members.push(PreparedRecord::new(record, delimiter));
    }

    clusters
}

// ============================================================================
// Verdict Table
// ============================================================================

/// Verdict per cluster, indexed like the cluster list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictTable {
    verdicts: Vec<Option<MatchVerdict>>,
}

impl VerdictTable {
    pub fn new(cluster_count: usize) -> Self {
        Self {
            verdicts: vec![None; cluster_count],
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn get(&self, cluster: usize) -> Option<&MatchVerdict> {
        self.verdicts.get(cluster).and_then(Option::as_ref)
    }

    pub fn is_resolved(&self, cluster: usize) -> bool {
        self.get(cluster).is_some()
    }

    /// Record a verdict unless the cluster already has one. Returns true if stored.
    pub fn set_if_unset(&mut self, cluster: usize, verdict: MatchVerdict) -> bool {
        match self.verdicts.get_mut(cluster) {
            Some(slot) if slot.is_none() => {
                *slot = Some(verdict);
                true
            }
            _ => false,
        }
    }

    pub fn unresolved(&self) -> Vec<usize> {
        (0..self.verdicts.len())
            .filter(|&i| !self.is_resolved(i))
            .collect()
    }

    pub fn passes(&self) -> impl Iterator<Item = Option<MatchPass>> + '_ {
        self.verdicts.iter().map(|v| v.as_ref().map(|v| v.pass))
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_passes(self.passes())
    }
}

// ============================================================================
// Pass Execution
// ============================================================================

/// Run one pass over the clusters the table has not resolved yet.
/// Returns how many clusters this pass resolved.
pub fn run_pass(pass: MatchPass, clusters: &[Cluster], table: &mut VerdictTable) -> usize {
    let check = passes::check_for(pass);
    let candidates = table.unresolved();
    let progress = PassProgress::start(pass, candidates.len() as u64);

    let found: Vec<(usize, MatchVerdict)> = candidates
        .into_par_iter()
        .filter_map(|idx| {
            let verdict = check(&clusters[idx]);
            progress.record(verdict.is_some());
            verdict.map(|v| (idx, v))
        })
        .collect();

    let mut matched = 0;
    for (idx, verdict) in found {
        log::debug!("cluster {} resolved by {} pass", clusters[idx].id, pass.label());
        if table.set_if_unset(idx, verdict) {
            matched += 1;
        }
    }

    progress.finish(matched);
    matched
}

/// Run every pass in priority order, filling only unresolved clusters.
pub fn run_passes(clusters: &[Cluster], table: &mut VerdictTable) {
    for pass in MatchPass::ALL {
        run_pass(pass, clusters, table);
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub clusters: Vec<Cluster>,
    pub verdicts: VerdictTable,
    /// One label per input record, sorted by `row_index`
    pub labels: Vec<RecordLabel>,
    pub summary: RunSummary,
}

impl MatchOutcome {
    pub fn verdict_for(&self, cluster_id: &str) -> Option<&MatchVerdict> {
        let idx = self.clusters.iter().position(|c| c.id == cluster_id)?;
        self.verdicts.get(idx)
    }

    pub fn label_for_row(&self, row_index: usize) -> Option<&RecordLabel> {
        self.labels
            .binary_search_by_key(&row_index, |l| l.row_index)
            .ok()
            .map(|i| &self.labels[i])
    }
}

/// Spread each cluster verdict onto its records.
pub fn record_labels(clusters: &[Cluster], table: &VerdictTable) -> Vec<RecordLabel> {
    let mut labels: Vec<RecordLabel> = clusters
        .iter()
        .enumerate()
        .flat_map(|(idx, cluster)| {
            let verdict = table.get(idx);
            cluster
                .members
                .iter()
                .enumerate()
                .map(move |(position, member)| RecordLabel {
                    row_index: member.record.row_index,
                    cluster_id: cluster.id.clone(),
                    pass: verdict.map(|v| v.pass),
                    matching_criteria: verdict
                        .map(|v| v.criteria_for(position).to_string())
                        .unwrap_or_default(),
                })
        })
        .collect();
    labels.sort_by_key(|l| l.row_index);
    labels
}

/// Group, standardize and verify a whole table.
pub fn verify_clusters(records: Vec<Record>, delimiter: char) -> MatchOutcome {
    let clusters = group_records(records, delimiter);
    log::info!("Found {} clusters", clusters.len());

    let mut verdicts = VerdictTable::new(clusters.len());
    run_passes(&clusters, &mut verdicts);

    let labels = record_labels(&clusters, &verdicts);
    let summary = verdicts.summary();
    MatchOutcome {
        clusters,
        verdicts,
        labels,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(row: usize, cluster: &str, name: &str, phones: &str, emails: &str) -> Record {
        Record {
            row_index: row,
            cluster_id: cluster.to_string(),
            full_name: name.to_string(),
            phone_numbers: phones.to_string(),
            emails: emails.to_string(),
            country: "US".into(),
            state: "OH".into(),
            city: "Dayton".into(),
        }
    }

    /// One cluster per pass plus one that nothing resolves.
    fn sample_table() -> Vec<Record> {
        vec![
            // first: identical phones
            rec(0, "A", "Ann Lee", "555-1234", "ann@x.com"),
            rec(1, "A", "Ann Lee", "(555) 1234", "a.lee@x.com"),
            // second: running intersection on phones
            rec(2, "B", "Bo Kim", "111|222", "MISSING"),
            rec(3, "B", "Bo Kim", "222|333", "MISSING"),
            rec(4, "B", "Bo Kim", "222", "MISSING"),
            // third: chained links
            rec(5, "C", "Cy Ng", "777", "c1@x.com"),
            rec(6, "C", "Cy Ng", "777|888", "c2@x.com"),
            rec(7, "C", "Cy Ng", "999", "c2@x.com"),
            // fourth: nothing shared but name and location
            rec(8, "D", "Di Roe", "MISSING", "MISSING"),
            rec(9, "D", "di roe ", "MISSING", "MISSING"),
            // unmatched
            rec(10, "E", "Ed Fox", "MISSING", "e1@x.com"),
            rec(11, "E", "Ed Cox", "MISSING", "e2@x.com"),
        ]
    }

    #[test]
    fn test_group_records_preserves_order() {
        let records = vec![
            rec(0, "Z", "a", "1", "MISSING"),
            rec(1, "Y", "b", "2", "MISSING"),
            rec(2, "Z", "c", "3", "MISSING"),
        ];
        let clusters = group_records(records, '|');
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id, "Z");
        let rows: Vec<usize> = clusters[0].members.iter().map(|m| m.record.row_index).collect();
        assert_eq!(rows, vec![0, 2]);
    }

    #[test]
    fn test_each_pass_resolves_its_cluster() {
        let outcome = verify_clusters(sample_table(), '|');
        let pass_of = |id: &str| outcome.verdict_for(id).map(|v| v.pass);
        assert_eq!(pass_of("A"), Some(MatchPass::First));
        assert_eq!(pass_of("B"), Some(MatchPass::Second));
        assert_eq!(pass_of("C"), Some(MatchPass::Third));
        assert_eq!(pass_of("D"), Some(MatchPass::Fourth));
        assert_eq!(pass_of("E"), None);

        let s = &outcome.summary;
        assert_eq!(
            (s.first_pass_matches, s.second_pass_matches, s.third_pass_matches, s.fourth_pass_matches),
            (1, 1, 1, 1)
        );
        assert_eq!(s.unmatched, 1);
        assert_eq!(s.total_clusters, 5);
        assert_eq!(s.total_matches, 4);
        assert!((s.match_rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_labels_carry_row_specific_criteria() {
        let outcome = verify_clusters(sample_table(), '|');
        assert_eq!(outcome.labels.len(), 12);

        let first = outcome.label_for_row(1).unwrap();
        assert_eq!(first.same_text(), "first pass");
        assert_eq!(first.matching_criteria, "all phone numbers match");

        assert_eq!(
            outcome.label_for_row(5).unwrap().matching_criteria,
            "matched with rows: 8 - phone"
        );
        assert_eq!(
            outcome.label_for_row(6).unwrap().matching_criteria,
            "matched with rows: 7 - phone; 9 - email"
        );

        let unmatched = outcome.label_for_row(11).unwrap();
        assert_eq!(unmatched.label(), "unmatched");
        assert!(unmatched.matching_criteria.is_empty());
    }

    #[test]
    fn test_earlier_pass_wins() {
        // Satisfies pass 1 (emails) and pass 4 (name + location)
        let records = vec![
            rec(0, "P", "Pat Orr", "MISSING", "pat@x.com"),
            rec(1, "P", "Pat Orr", "MISSING", "PAT@x.com"),
        ];
        let outcome = verify_clusters(records, '|');
        assert_eq!(outcome.verdict_for("P").unwrap().pass, MatchPass::First);
        assert_eq!(outcome.summary.fourth_pass_matches, 0);
    }

    #[test]
    fn test_rerun_never_overwrites() {
        let clusters = group_records(sample_table(), '|');
        let mut table = VerdictTable::new(clusters.len());
        run_passes(&clusters, &mut table);
        let before = table.clone();

        for pass in MatchPass::ALL {
            assert_eq!(run_pass(pass, &clusters, &mut table), 0);
        }
        assert_eq!(table, before);
    }

    #[test]
    fn test_set_if_unset() {
        let mut table = VerdictTable::new(2);
        assert!(table.set_if_unset(0, MatchVerdict::cluster_wide(MatchPass::Second, "x")));
        assert!(!table.set_if_unset(0, MatchVerdict::cluster_wide(MatchPass::First, "y")));
        assert_eq!(table.get(0).unwrap().pass, MatchPass::Second);
        assert!(table.is_resolved(0));
        assert!(!table.is_resolved(1));
        assert!(!table.set_if_unset(7, MatchVerdict::cluster_wide(MatchPass::First, "z")));
        assert_eq!(table.unresolved(), vec![1]);
    }

    #[test]
    fn test_idempotent_runs() {
        let first = verify_clusters(sample_table(), '|');
        let second = verify_clusters(sample_table(), '|');
        assert_eq!(first.verdicts, second.verdicts);
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn test_every_cluster_gets_exactly_one_label() {
        let outcome = verify_clusters(sample_table(), '|');
        let s = &outcome.summary;
        let per_pass: usize = MatchPass::ALL.iter().map(|&p| s.count_for(p)).sum();
        assert_eq!(per_pass + s.unmatched, s.total_clusters);
        assert_eq!(s.total_clusters, outcome.clusters.len());

        for label in &outcome.labels {
            let cluster_pass = outcome.verdict_for(&label.cluster_id).map(|v| v.pass);
            assert_eq!(label.pass, cluster_pass);
        }
    }

    #[test]
    fn test_sentinel_only_clusters_skip_contact_passes() {
        let records = vec![
            rec(0, "M", "Mo Diaz", "MISSING", "MISSING"),
            rec(1, "M", "Mo Dias", "missing", "Missing"),
        ];
        let outcome = verify_clusters(records, '|');
        assert!(outcome.verdict_for("M").is_none());
    }

    #[test]
    fn test_empty_table() {
        let outcome = verify_clusters(Vec::new(), '|');
        assert!(outcome.clusters.is_empty());
        assert!(outcome.labels.is_empty());
        assert_eq!(outcome.summary.total_clusters, 0);
    }
}
