//! `Index`: the consumed-not-implemented triple catalog contract, plus an
//! in-memory test double (`InMemoryIndex`) sufficient to drive the
//! planner and operators in tests without a real on-disk index.

use crate::id::Id;
use std::collections::HashMap;

/// Resolves relation ids to sorted posting lists, plus the per-relation
/// statistics the cost model and Join operator need.
pub trait Index: Send + Sync {
    /// Sorted `(subject, object)` pairs for `relation`, optionally
    /// restricted to a fixed subject.
    fn scan(&self, relation: Id, fixed_lhs: Option<Id>) -> Vec<(Id, Id)>;
    fn nof_elements(&self, relation: Id) -> u64;
    fn is_functional(&self, relation: Id) -> bool;
    fn has_blocks(&self, relation: Id) -> bool;
}

struct RelationData {
    postings: Vec<(Id, Id)>,
    is_functional: bool,
    has_blocks: bool,
}

/// An `Index` implementor backed by sorted in-memory vectors — enough to
/// exercise Scan/Join/planner logic in tests, not a real index.
#[derive(Default)]
pub struct InMemoryIndex {
    relations: HashMap<Id, RelationData>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        InMemoryIndex {
            relations: HashMap::new(),
        }
    }

    /// Insert `(subject, object)` pairs for `relation`. Postings are
    /// sorted and functionality is derived (each subject maps to at most
    /// one object).
    pub fn insert_relation(&mut self, relation: Id, mut postings: Vec<(Id, Id)>) {
        postings.sort();
        postings.dedup();
        let is_functional = postings
            .windows(2)
            .all(|w| w[0].0 != w[1].0);
        self.relations.insert(
            relation,
            RelationData {
                postings,
                is_functional,
                has_blocks: false,
            },
        );
    }
}

impl Index for InMemoryIndex {
    fn scan(&self, relation: Id, fixed_lhs: Option<Id>) -> Vec<(Id, Id)> {
        let Some(data) = self.relations.get(&relation) else {
            return Vec::new();
        };
        match fixed_lhs {
            None => data.postings.clone(),
            Some(lhs) => data
                .postings
                .iter()
                .filter(|(s, _)| *s == lhs)
                .copied()
                .collect(),
        }
    }

    fn nof_elements(&self, relation: Id) -> u64 {
        self.relations
            .get(&relation)
            .map(|d| d.postings.len() as u64)
            .unwrap_or(0)
    }

    fn is_functional(&self, relation: Id) -> bool {
        self.relations
            .get(&relation)
            .map(|d| d.is_functional)
            .unwrap_or(false)
    }

    fn has_blocks(&self, relation: Id) -> bool {
        self.relations
            .get(&relation)
            .map(|d| d.has_blocks)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_filters_by_fixed_subject() {
        let mut idx = InMemoryIndex::new();
        let rel = Id::from(1u64);
        idx.insert_relation(
            rel,
            vec![
                (Id::from(10u64), Id::from(100u64)),
                (Id::from(10u64), Id::from(101u64)),
                (Id::from(11u64), Id::from(102u64)),
            ],
        );
        assert_eq!(idx.nof_elements(rel), 3);
        assert!(!idx.is_functional(rel));
        let restricted = idx.scan(rel, Some(Id::from(10u64)));
        assert_eq!(restricted.len(), 2);
    }

    #[test]
    fn functional_relation_is_detected() {
        let mut idx = InMemoryIndex::new();
        let rel = Id::from(2u64);
        idx.insert_relation(
            rel,
            vec![
                (Id::from(1u64), Id::from(1u64)),
                (Id::from(2u64), Id::from(2u64)),
            ],
        );
        assert!(idx.is_functional(rel));
    }

    #[test]
    fn unknown_relation_scans_empty() {
        let idx = InMemoryIndex::new();
        assert!(idx.scan(Id::from(99u64), None).is_empty());
        assert_eq!(idx.nof_elements(Id::from(99u64)), 0);
    }
}
