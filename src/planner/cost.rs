//! Pruning keys and the cost-comparison rule the DP planner prunes by.
//!
//! Two plans are interchangeable for future joins iff they cover the same
//! node set, are sorted on the same column, and have applied the same
//! filter set — matching spec.md §3's "Subtree Plan" comparability rule
//! (a superset of §4.5 step 2's abbreviated `(node_set, sorted_on)`, which
//! implicitly assumes an empty filter set since pruning runs before
//! filter pushdown within a level).

use std::collections::BTreeSet;

pub type NodeSet = BTreeSet<usize>;
pub type FilterSet = BTreeSet<usize>;

/// `Ord` gives the DP table (a `BTreeMap<PruningKey, _>`) a deterministic
/// iteration order, so that among equal-cost, interchangeable plans the
/// one the planner settles on — and thus the resulting QET's cache key —
/// is reproducible across runs rather than depending on hash order
/// (spec.md §4.5: "Pruning key tie-breaks are stable").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PruningKey {
    pub nodes: NodeSet,
    pub sorted_on: Option<usize>,
    pub filters: FilterSet,
}

impl PruningKey {
    pub fn new(nodes: NodeSet, sorted_on: Option<usize>, filters: FilterSet) -> Self {
        PruningKey { nodes, sorted_on, filters }
    }
}

/// `⌊log2(n)⌋` clamped to a minimum factor of 1, per the OrderBy/Sort cost
/// formula (spec.md §4.2).
pub fn log2_floor_clamped(n: u64) -> u64 {
    if n < 2 {
        1
    } else {
        ((n as f64).log2().floor() as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_small_sizes_to_one() {
        assert_eq!(log2_floor_clamped(0), 1);
        assert_eq!(log2_floor_clamped(1), 1);
        assert_eq!(log2_floor_clamped(2), 1);
        assert_eq!(log2_floor_clamped(4), 2);
        assert_eq!(log2_floor_clamped(1024), 10);
    }
}
