use std::collections::HashSet;

use super::Deal;

/// The active filter widgets' selection, owned by the presentation layer
/// and applied as a pure predicate before aggregation. An empty set for a
/// dimension means no filter on that dimension, not "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub segments: HashSet<String>,
    pub owners: HashSet<String>,
    pub clients: HashSet<String>,
}

impl FilterSelection {
    pub fn matches(&self, deal: &Deal) -> bool {
        dimension_matches(&self.segments, &deal.segment)
            && dimension_matches(&self.owners, &deal.owner)
            && dimension_matches(&self.clients, &deal.client)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.segments.is_empty() && self.owners.is_empty() && self.clients.is_empty()
    }
}

fn dimension_matches(selected: &HashSet<String>, value: &str) -> bool {
    selected.is_empty() || selected.contains(value)
}
