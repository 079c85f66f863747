//! Pass 1: every record carries the same single value.

use crate::models::{Cluster, MatchPass, MatchVerdict};
use crate::standardize::StandardizedField;
use rustc_hash::FxHashSet;

/// Whether a lone sentinel may count as the shared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelPolicy {
    /// `{MISSING}` across the cluster is not a match (passes 1 and 3)
    Exclude,
    /// Any single shared value matches, sentinel included (pass 4)
    Include,
}

/// True if the union of all sets has exactly one element.
///
/// Under [`SentinelPolicy::Exclude`] that element must not be the sentinel.
pub fn is_full_match<'a, I>(sets: I, policy: SentinelPolicy) -> bool
where
    I: IntoIterator<Item = &'a StandardizedField>,
{
    let mut union: FxHashSet<&str> = FxHashSet::default();
    let mut sentinel_seen = false;
    for set in sets {
        sentinel_seen |= set.has_sentinel();
        union.extend(set.iter());
        if union.len() > 1 {
            return false;
        }
    }
    union.len() == 1 && !(policy == SentinelPolicy::Exclude && sentinel_seen)
}

/// Phones or emails identical across the whole cluster.
///
/// Name equality alone is deliberately not checked here.
pub fn check(cluster: &Cluster) -> Option<MatchVerdict> {
    let phone_match = is_full_match(cluster.phone_sets(), SentinelPolicy::Exclude);
    let email_match = is_full_match(cluster.email_sets(), SentinelPolicy::Exclude);

    let criteria = if phone_match {
        "all phone numbers match"
    } else if email_match {
        "all emails match"
    } else {
        return None;
    };
    Some(MatchVerdict::cluster_wide(MatchPass::First, criteria))
}
