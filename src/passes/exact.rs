//! Pass 4: name, country, state and city identical across the cluster.
//!
//! Unlike pass 1 this applies no sentinel exclusion, so a cluster whose rows
//! all read `MISSING` for a location field still agrees on that field.

use crate::models::{Cluster, MatchPass, MatchVerdict, Record};
use crate::passes::full::{is_full_match, SentinelPolicy};
use crate::standardize::{standardize_exact, StandardizedField};

pub const EXACT_MATCH_CRITERIA: &str = "Names, country, state, city are exactly matching";

/// Per-attribute agreement, kept separate for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeAgreement {
    pub name: bool,
    pub country: bool,
    pub state: bool,
    pub city: bool,
}

impl AttributeAgreement {
    pub fn all(&self) -> bool {
        self.name && self.country && self.state && self.city
    }
}

fn attribute_agrees(cluster: &Cluster, value: fn(&Record) -> &str) -> bool {
    let sets: Vec<StandardizedField> = cluster
        .members
        .iter()
        .map(|m| standardize_exact(value(&m.record)))
        .collect();
    is_full_match(&sets, SentinelPolicy::Include)
}

pub fn attribute_agreement(cluster: &Cluster) -> AttributeAgreement {
    AttributeAgreement {
        name: attribute_agrees(cluster, |r| r.full_name.as_str()),
        country: attribute_agrees(cluster, |r| r.country.as_str()),
        state: attribute_agrees(cluster, |r| r.state.as_str()),
        city: attribute_agrees(cluster, |r| r.city.as_str()),
    }
}

pub fn check(cluster: &Cluster) -> Option<MatchVerdict> {
    if !attribute_agreement(cluster).all() {
        return None;
    }
    Some(MatchVerdict::cluster_wide(MatchPass::Fourth, EXACT_MATCH_CRITERIA))
}
