//! The four ordered matching passes.
//!
//! Every check is a pure function of one cluster: it either returns a
//! verdict or `None`. Ordering and "skip resolved clusters" live in the
//! orchestrator, not here.

pub mod cross_link;
pub mod exact;
pub mod full;
pub mod linked;

use crate::models::{Cluster, MatchPass, MatchVerdict};

/// Signature shared by all pass checks.
pub type PassCheck = fn(&Cluster) -> Option<MatchVerdict>;

/// Check function for a pass.
pub fn check_for(pass: MatchPass) -> PassCheck {
    match pass {
        MatchPass::First => full::check,
        MatchPass::Second => linked::check,
        MatchPass::Third => cross_link::check,
        MatchPass::Fourth => exact::check,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Cluster, PreparedRecord, Record};

    /// Row shorthand: (phones, emails), everything else fixed.
    pub fn cluster(id: &str, rows: &[(&str, &str)]) -> Cluster {
        let members = rows
            .iter()
            .enumerate()
            .map(|(i, (phones, emails))| {
                PreparedRecord::new(
                    Record {
                        row_index: i,
                        cluster_id: id.to_string(),
                        full_name: format!("Person {}", i),
                        phone_numbers: phones.to_string(),
                        emails: emails.to_string(),
                        country: "US".into(),
                        state: "TX".into(),
                        city: "Austin".into(),
                    },
                    '|',
                )
            })
            .collect();
        Cluster {
            id: id.to_string(),
            members,
        }
    }
}
