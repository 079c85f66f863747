//! Pass 3: pairwise links merged into connected components.
//!
//! Two records are linked when they share a real (non-sentinel) phone number
//! or email. Links are merged with a union-find, so a pair that
//! touches two components formed earlier joins both of them. The cluster
//! matches when every record ends up in one component.

use crate::models::{Cluster, MatchCriteria, MatchPass, MatchVerdict, PreparedRecord};
use petgraph::unionfind::UnionFind;

/// Fields on which two records intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairLink {
    /// Member position of the earlier record
    pub left: usize,
    /// Member position of the later record
    pub right: usize,
    pub phone: bool,
    pub email: bool,
}

impl PairLink {
    pub fn fields(&self) -> &'static str {
        match (self.phone, self.email) {
            (true, true) => "phone, email",
            (true, false) => "phone",
            (false, true) => "email",
            (false, false) => "",
        }
    }
}

/// Compare two records; `None` if they share nothing but the sentinel.
pub fn link_between(
    left: usize,
    right: usize,
    a: &PreparedRecord,
    b: &PreparedRecord,
) -> Option<PairLink> {
    let phone = a.phones.intersection(&b.phones).has_evidence();
    let email = a.emails.intersection(&b.emails).has_evidence();
    if !phone && !email {
        return None;
    }
    Some(PairLink {
        left,
        right,
        phone,
        email,
    })
}

/// Every linked pair (i, j) with i < j, in row-major order.
pub fn find_links(members: &[PreparedRecord]) -> Vec<PairLink> {
    let mut links = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for (j, b) in members.iter().enumerate().skip(i + 1) {
            if let Some(link) = link_between(i, j, a, b) {
                links.push(link);
            }
        }
    }
    links
}

// ============================================================================
// Components
// ============================================================================

/// Merge links into connected components over member positions.
///
/// Only linked positions appear. Each component is sorted and components are
/// ordered by their first member.
pub fn group_components(len: usize, links: &[PairLink]) -> Vec<Vec<usize>> {
    let mut forest: UnionFind<usize> = UnionFind::new(len);
    let mut linked = vec![false; len];
    for link in links {
        forest.union(link.left, link.right);
        linked[link.left] = true;
        linked[link.right] = true;
    }

    let labels = forest.into_labeling();
    let mut root_slot: Vec<Option<usize>> = vec![None; len];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for position in (0..len).filter(|&p| linked[p]) {
        let root = labels[position];
        match root_slot[root] {
            Some(slot) => components[slot].push(position),
            None => {
                root_slot[root] = Some(components.len());
                components.push(vec![position]);
            }
        }
    }
    components
}

// ============================================================================
// Component Analysis
// ============================================================================

/// Links, components and per-record annotations for one cluster.
#[derive(Debug, Clone)]
pub struct ComponentAnalysis {
    pub links: Vec<PairLink>,
    /// Components over linked members only, each sorted, ordered by first member.
    /// A record with no link belongs to no component.
    pub components: Vec<Vec<usize>>,
    /// Per member: "<row> - <fields>" for each record it linked with
    pub annotations: Vec<Vec<String>>,
}

impl ComponentAnalysis {
    /// Exactly one component, and it holds every member.
    pub fn is_single_component(&self, cluster_len: usize) -> bool {
        self.components.len() == 1 && self.components[0].len() == cluster_len
    }

    /// Criteria text per member, in member order.
    pub fn criteria(&self) -> Vec<String> {
        self.annotations
            .iter()
            .map(|notes| {
                if notes.is_empty() {
                    "matched with rows: None".to_string()
                } else {
                    format!("matched with rows: {}", notes.join("; "))
                }
            })
            .collect()
    }
}

pub fn analyze(cluster: &Cluster) -> ComponentAnalysis {
    let members = &cluster.members;
    let links = find_links(members);

    let mut annotations = vec![Vec::new(); members.len()];
    for link in &links {
        let fields = link.fields();
        annotations[link.left].push(format!(
            "{} - {}",
            members[link.right].record.display_row(),
            fields
        ));
        annotations[link.right].push(format!(
            "{} - {}",
            members[link.left].record.display_row(),
            fields
        ));
    }

    let components = group_components(members.len(), &links);
    ComponentAnalysis {
        links,
        components,
        annotations,
    }
}

pub fn check(cluster: &Cluster) -> Option<MatchVerdict> {
    let analysis = analyze(cluster);
    if !analysis.is_single_component(cluster.len()) {
        return None;
    }
    Some(MatchVerdict {
        pass: MatchPass::Third,
        criteria: MatchCriteria::PerRecord(analysis.criteria()),
    })
}
