//! # Catalog
//!
//! The external collaborators the core consumes but does not implement:
//! `Index` (triples) and `FullTextIndex` (postings), plus `Vocabulary` and
//! `RelationMetadata`. The real, on-disk versions of these are out of
//! scope; the in-memory implementors here exist so the planner and
//! operators are exercisable end to end in tests, matching the shape of
//! the original system's own `VocabularyTest.cpp` (a concrete in-memory
//! vocabulary, not a mock).

mod fulltext;
mod index;
mod metadata;
mod vocabulary;

pub use fulltext::{FullTextIndex, InMemoryFullTextIndex, Posting, RangePosting};
pub use index::{Index, InMemoryIndex};
pub use metadata::RelationMetadata;
pub use vocabulary::Vocabulary;
