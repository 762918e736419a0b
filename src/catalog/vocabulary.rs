//! In-memory `Vocabulary`: the bijection between string terms and [`Id`]s
//! that the planner and text operators consume.
//!
//! Modeled directly on `VocabularyTest.cpp`'s four scenarios: plain id
//! lookup, prefix-range lookup, file round-trip, and construction from an
//! unsorted set. Terms are kept sorted so both lookups are binary
//! searches; callers are expected to insert in final sorted order (as the
//! real on-disk vocabulary is built by an external sort pass), which
//! `create_from_set` does for them.

use crate::id::{Id, IdRange};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary { terms: Vec::new() }
    }

    /// Build a vocabulary from an arbitrary (possibly unsorted, possibly
    /// duplicate-containing) set of terms.
    pub fn create_from_set(terms: impl IntoIterator<Item = String>) -> Self {
        let mut v: Vec<String> = terms.into_iter().collect();
        v.sort();
        v.dedup();
        Vocabulary { terms: v }
    }

    pub fn size(&self) -> usize {
        self.terms.len()
    }

    /// Append a term, assigning it the next id. Callers must maintain
    /// overall sort order themselves; `get_id`/prefix lookups assume it.
    pub fn push_back(&mut self, term: impl Into<String>) -> Id {
        self.terms.push(term.into());
        Id::from(self.terms.len() - 1)
    }

    pub fn get_id(&self, term: &str) -> Option<Id> {
        self.terms
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(Id::from)
    }

    /// `prefix*` lookup: the inclusive `[first, last]` range of ids whose
    /// terms start with `prefix`, or `None` if no term does.
    pub fn get_id_range_for_full_text_prefix(&self, prefix_pattern: &str) -> Option<IdRange> {
        let prefix = prefix_pattern.strip_suffix('*').unwrap_or(prefix_pattern);
        let start = self.terms.partition_point(|t| t.as_str() < prefix);
        if start >= self.terms.len() || !self.terms[start].starts_with(prefix) {
            return None;
        }
        let run = self.terms[start..].partition_point(|t| t.as_str().starts_with(prefix));
        Some(IdRange::new(Id::from(start), Id::from(start + run - 1)))
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.terms.join("\n"))
    }

    /// Replace the in-memory contents with whatever is on disk at `path`,
    /// discarding any unflushed in-memory changes (e.g. a `push_back`
    /// since the last write).
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.terms = content
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> Vocabulary {
        Vocabulary::create_from_set(terms.iter().map(|s| s.to_string()))
    }

    #[test]
    fn plain_id_lookup() {
        let v = vocab(&["a", "ab", "ba", "car"]);
        assert_eq!(v.get_id("ba"), Some(Id::from(2u64)));
        assert_eq!(v.get_id("a"), Some(Id::from(0u64)));
        assert_eq!(v.get_id("foo"), None);
    }

    #[test]
    fn prefix_range_lookup() {
        let v = vocab(&["wordA0", "wordA1", "wordB2", "wordB3", "wordB4"]);
        assert_eq!(
            v.get_id_range_for_full_text_prefix("wordA1*"),
            Some(IdRange::new(Id::from(1u64), Id::from(1u64)))
        );
        assert_eq!(
            v.get_id_range_for_full_text_prefix("word*"),
            Some(IdRange::new(Id::from(0u64), Id::from(4u64)))
        );
        assert_eq!(
            v.get_id_range_for_full_text_prefix("wordA*"),
            Some(IdRange::new(Id::from(0u64), Id::from(1u64)))
        );
        assert_eq!(
            v.get_id_range_for_full_text_prefix("wordB*"),
            Some(IdRange::new(Id::from(2u64), Id::from(4u64)))
        );
        assert_eq!(v.get_id_range_for_full_text_prefix("foo*"), None);
    }

    #[test]
    fn persistence_round_trip() {
        let v = vocab(&["wordA0", "wordA1", "wordB2", "wordB3", "wordB4"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        v.write_to_file(&path).unwrap();

        let mut v = v;
        v.push_back("foo");
        assert_eq!(v.size(), 6);

        v.read_from_file(&path).unwrap();
        assert_eq!(v.size(), 5);
    }
}
