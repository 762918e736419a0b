//! `FullTextIndex`: the consumed-not-implemented posting store contract,
//! plus an in-memory test double.

use crate::id::{Id, IdRange, Score};
use std::collections::HashMap;

/// One posting returned by `postings_for_word`: a word occurring in a
/// context with a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub context: Id,
    pub word: Id,
    pub score: Score,
}

/// One posting returned by `postings_for_range`, used by text leaves over
/// a prefix range rather than a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePosting {
    pub context: Id,
    pub score: Score,
}

pub trait FullTextIndex: Send + Sync {
    fn postings_for_word(&self, word: Id) -> Vec<Posting>;
    fn postings_for_range(&self, range: IdRange) -> Vec<RangePosting>;
}

/// A `FullTextIndex` implementor over an in-memory word → postings map.
#[derive(Default)]
pub struct InMemoryFullTextIndex {
    postings: HashMap<Id, Vec<(Id, Score)>>,
}

impl InMemoryFullTextIndex {
    pub fn new() -> Self {
        InMemoryFullTextIndex {
            postings: HashMap::new(),
        }
    }

    pub fn insert(&mut self, word: Id, context: Id, score: Score) {
        self.postings.entry(word).or_default().push((context, score));
    }
}

impl FullTextIndex for InMemoryFullTextIndex {
    fn postings_for_word(&self, word: Id) -> Vec<Posting> {
        self.postings
            .get(&word)
            .map(|v| {
                v.iter()
                    .map(|&(context, score)| Posting { context, word, score })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn postings_for_range(&self, range: IdRange) -> Vec<RangePosting> {
        let mut out = Vec::new();
        for (word, postings) in &self.postings {
            if range.contains(*word) {
                out.extend(
                    postings
                        .iter()
                        .map(|&(context, score)| RangePosting { context, score }),
                );
            }
        }
        out.sort_by_key(|p| p.context);
        out
    }
}
