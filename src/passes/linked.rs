//! Pass 2: a value survives the running intersection of every record's set.

use crate::models::{Cluster, MatchPass, MatchVerdict};
use crate::standardize::StandardizedField;

/// Intersect the sets in record order and report whether anything real is left.
///
/// A record whose set is exactly `{MISSING}` fails the whole column at once.
/// The running set may empty out part way through; processing still visits
/// every record, so a later sentinel-only record is still reported as such.
/// The column passes iff the final set holds a non-sentinel token.
pub fn is_linked_match<'a, I>(sets: I) -> bool
where
    I: IntoIterator<Item = &'a StandardizedField>,
{
    let mut running: Option<StandardizedField> = None;
    for set in sets {
        if set.is_sentinel_only() {
            return false;
        }
        match running.as_mut() {
            None => running = Some(set.clone()),
            Some(linked) => linked.retain_common(set),
        }
    }
    running.is_some_and(|linked| linked.has_evidence())
}

pub fn check(cluster: &Cluster) -> Option<MatchVerdict> {
    let mut linked_on = Vec::new();
    if is_linked_match(cluster.phone_sets()) {
        linked_on.push("phone numbers");
    }
    if is_linked_match(cluster.email_sets()) {
        linked_on.push("emails");
    }
    if linked_on.is_empty() {
        return None;
    }
    Some(MatchVerdict::cluster_wide(MatchPass::Second, linked_on.join(" ")))
}
