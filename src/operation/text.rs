//! Full-text operators (spec.md §4.6).
//!
//! `TextLeafOp` answers a single `word*` prefix lookup. `TextOperationOp`
//! performs the full pipeline: prefix-range lookup per word, K-way
//! intersection by context id, an optional join against an entity
//! subtree, per-(entity, context) score aggregation, and a top-k cutoff
//! per entity.

use crate::catalog::{FullTextIndex, Index};
use crate::error::EngineResult;
use crate::id::{Id, IdRange, Score};
use crate::result_table::ResultTable;
use crate::row::Row;
use std::collections::HashMap;
use std::sync::Arc;

use super::Operation;

#[derive(Debug, Clone)]
pub struct TextLeafOp {
    pub word_range: IdRange,
    pub text_limit: usize,
}

impl TextLeafOp {
    pub fn new(word_range: IdRange, text_limit: usize) -> Self {
        TextLeafOp { word_range, text_limit }
    }

    pub fn compute_result(&self, fulltext: &dyn FullTextIndex) -> EngineResult<ResultTable> {
        let mut postings = fulltext.postings_for_range(self.word_range);
        // top-k by score, ties broken by the smaller context id (§4.6).
        postings.sort_by(|a, b| b.score.cmp(&a.score).then(a.context.cmp(&b.context)));
        postings.truncate(self.text_limit.max(1));
        postings.sort_by_key(|p| p.context);

        let mut table = ResultTable::new(2);
        for posting in postings {
            table.append_row(Row::from_slice(&[posting.context, posting.score.as_id()]));
        }
        table.set_sorted_by(Some(0));
        table.publish_ready();
        Ok(table)
    }

    pub fn result_width(&self) -> usize {
        2
    }

    pub fn size_estimate(&self) -> u64 {
        self.word_range.len().min(self.text_limit as u64)
    }

    pub fn cost_estimate(&self) -> u64 {
        self.word_range.len()
    }

    pub fn known_empty(&self) -> bool {
        self.word_range.is_empty()
    }

    pub fn as_string(&self) -> String {
        format!(
            "TEXTLEAF([{},{}] limit={})",
            self.word_range.first, self.word_range.last, self.text_limit
        )
    }
}

#[derive(Debug, Clone)]
pub struct TextOperationOp {
    /// One prefix range per word in the query's text clique; postings are
    /// intersected K-way on context id.
    pub word_ranges: Vec<IdRange>,
    /// Supplies entity ids (and any other already-bound columns) to join
    /// the matched contexts against. Assumed to carry the entity id in
    /// its first column and the context id in its second.
    pub entity_subtree: Option<Arc<Operation>>,
    pub text_limit: usize,
}

impl TextOperationOp {
    pub fn compute_result(
        &self,
        index: &dyn Index,
        fulltext: &dyn FullTextIndex,
    ) -> EngineResult<ResultTable> {
        let intersected = self.intersect_word_postings(fulltext);

        match &self.entity_subtree {
            None => {
                // No entity join: entity coincides with context, output
                // width 2 (context, score), top-k over the whole result
                // since there is exactly one "entity" per row.
                let mut candidates: Vec<(Id, Score)> = intersected.into_iter().collect();
                candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                candidates.truncate(self.text_limit.max(1));
                candidates.sort_by_key(|(context, _)| *context);

                let mut table = ResultTable::new(2);
                for (context, score) in candidates {
                    table.append_row(Row::from_slice(&[context, score.as_id()]));
                }
                table.set_sorted_by(Some(0));
                table.publish_ready();
                Ok(table)
            }
            Some(entity_subtree) => {
                let entity_table = entity_subtree.compute_result(index, fulltext)?;
                let entity_width = entity_table.nof_columns();

                let mut by_entity: HashMap<Id, Vec<(Row, Score)>> = HashMap::new();
                for row in entity_table.rows() {
                    let context = match row.get(1) {
                        Some(c) => c,
                        None => continue,
                    };
                    if let Some(&score) = intersected.get(&context) {
                        let entity = row.get(0).unwrap_or(Id::EMPTY);
                        by_entity.entry(entity).or_default().push((row.clone(), score));
                    }
                }

                let mut entities: Vec<Id> = by_entity.keys().copied().collect();
                entities.sort();

                let mut table = ResultTable::new(entity_width + 1);
                for entity in entities {
                    let mut group = by_entity.remove(&entity).unwrap();
                    group.sort_by(|a, b| {
                        b.1.cmp(&a.1).then_with(|| {
                            a.0.get(1).cmp(&b.0.get(1))
                        })
                    });
                    group.truncate(self.text_limit.max(1));
                    group.sort_by_key(|(row, _)| row.get(1));
                    for (row, score) in group {
                        let mut values: Vec<Id> = row.as_slice().to_vec();
                        values.push(score.as_id());
                        table.append_row(Row::from_slice(&values));
                    }
                }
                table.set_sorted_by(Some(0));
                table.publish_ready();
                Ok(table)
            }
        }
    }

    fn intersect_word_postings(&self, fulltext: &dyn FullTextIndex) -> HashMap<Id, Score> {
        let mut per_word: Vec<HashMap<Id, Score>> = self
            .word_ranges
            .iter()
            .map(|range| {
                fulltext
                    .postings_for_range(*range)
                    .into_iter()
                    .map(|p| (p.context, p.score))
                    .collect::<HashMap<_, _>>()
            })
            .collect();

        let Some(first) = per_word.pop() else {
            return HashMap::new();
        };
        let mut intersection = first;
        for word_postings in per_word {
            intersection.retain(|context, score| {
                if let Some(&other_score) = word_postings.get(context) {
                    *score = *score + other_score;
                    true
                } else {
                    false
                }
            });
        }
        intersection
    }

    pub fn result_width(&self) -> usize {
        match &self.entity_subtree {
            None => 2,
            Some(sub) => sub.result_width() + 1,
        }
    }

    pub fn size_estimate(&self) -> u64 {
        self.word_ranges
            .iter()
            .map(|r| r.len())
            .min()
            .unwrap_or(0)
            .min(self.text_limit as u64 * 1000)
    }

    pub fn cost_estimate(&self) -> u64 {
        let postings_read: u64 = self.word_ranges.iter().map(|r| r.len()).sum();
        postings_read + self.size_estimate()
    }

    pub fn known_empty(&self) -> bool {
        self.word_ranges.iter().any(IdRange::is_empty)
            || self.entity_subtree.as_ref().is_some_and(|s| s.known_empty())
    }

    pub fn multiplicity(&self, col: usize) -> f64 {
        match &self.entity_subtree {
            Some(sub) if col < sub.result_width() => sub.multiplicity(col),
            _ => 1.0,
        }
    }

    pub fn as_string(&self) -> String {
        let ranges: Vec<String> = self
            .word_ranges
            .iter()
            .map(|r| format!("[{},{}]", r.first, r.last))
            .collect();
        let sub = self
            .entity_subtree
            .as_ref()
            .map(|s| s.as_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "TEXTOP(words={:?} entities={} limit={})",
            ranges, sub, self.text_limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryFullTextIndex;

    #[test]
    fn text_leaf_caps_at_text_limit_and_sorts_by_context() {
        let mut idx = InMemoryFullTextIndex::new();
        let word = Id::from(1u64);
        idx.insert(word, Id::from(10u64), Score::new(5));
        idx.insert(word, Id::from(5u64), Score::new(9));
        idx.insert(word, Id::from(7u64), Score::new(1));
        let op = TextLeafOp::new(IdRange::new(word, word), 2);
        let table = op.compute_result(&idx).unwrap();
        assert_eq!(table.size(), 2);
        assert_eq!(table.rows()[0].get(0), Some(Id::from(5u64)));
        assert_eq!(table.rows()[1].get(0), Some(Id::from(10u64)));
    }

    #[test]
    fn text_operation_without_entities_aggregates_scores_across_words() {
        let mut idx = InMemoryFullTextIndex::new();
        let w1 = Id::from(1u64);
        let w2 = Id::from(2u64);
        idx.insert(w1, Id::from(100u64), Score::new(3));
        idx.insert(w2, Id::from(100u64), Score::new(4));
        idx.insert(w1, Id::from(200u64), Score::new(10));
        // context 200 only matches w1, so it should be excluded from the
        // intersection.
        let op = TextOperationOp {
            word_ranges: vec![IdRange::new(w1, w1), IdRange::new(w2, w2)],
            entity_subtree: None,
            text_limit: 5,
        };
        let index = crate::catalog::InMemoryIndex::new();
        let table = op.compute_result(&index, &idx).unwrap();
        assert_eq!(table.size(), 1);
        assert_eq!(table.rows()[0].get(0), Some(Id::from(100u64)));
        assert_eq!(table.rows()[0].get(1), Some(Id::from(7u64)));
    }
}
