//! # triplecore
//!
//! A triple-store query engine core: plan and execute SPARQL-like basic
//! graph patterns (bound/variable subjects and objects, comparison
//! filters, ORDER BY, DISTINCT) together with a full-text index, over an
//! externally supplied catalog.
//!
//! ## Pipeline
//!
//! ```text
//! Triple patterns + filters  (triple::TripleGraph)
//!     ↓
//! [planner::plan]            → Query Execution Tree (operation::Operation)
//!     ↓
//! [execution::ExecutionContext::execute]
//!     ├── execution::cache::SubtreeCache  (subtree result reuse)
//!     ├── execution::limits::ResourceLimits (cooperative limits)
//!     └── execution::timeout::QueryTimeout  (cancellation)
//!     ↓
//! result_table::ResultTable
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use triplecore::catalog::{InMemoryFullTextIndex, InMemoryIndex};
//! use triplecore::config::Config;
//! use triplecore::execution::ExecutionContext;
//! use triplecore::id::Id;
//! use triplecore::triple::{Term, Triple, TripleGraph};
//!
//! let mut index = InMemoryIndex::new();
//! index.insert_relation(
//!     Id::from(1u64),
//!     vec![(Id::from(10u64), Id::from(20u64))],
//! );
//!
//! let triples = vec![Triple::new(
//!     Term::Variable("x".to_string()),
//!     "<knows>".to_string(),
//!     Term::Variable("y".to_string()),
//! )];
//! let graph = TripleGraph::from_triples(triples);
//!
//! let mut relation_ids = HashMap::new();
//! relation_ids.insert("<knows>".to_string(), Id::from(1u64));
//!
//! let qet = triplecore::planner::plan(
//!     &graph,
//!     &[],
//!     None,
//!     &relation_ids,
//!     &index,
//!     &HashMap::new(),
//!     100,
//! )
//! .unwrap();
//!
//! let config = Config::default();
//! let ctx = ExecutionContext::new(
//!     Arc::new(index),
//!     Arc::new(InMemoryFullTextIndex::new()),
//!     &config,
//! );
//! let result = ctx.execute(&qet).unwrap();
//! assert_eq!(result.size(), 1);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod id;
pub mod logging;
pub mod operation;
pub mod parser;
pub mod planner;
pub mod result_table;
pub mod row;
pub mod triple;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use id::{Id, IdRange, Score};
pub use operation::Operation;
pub use parser::{parse_ntriples_line, RawTriple};
pub use result_table::{ResultTable, Status};
pub use row::Row;
pub use triple::{Comparator, Filter, FilterExpr, Term, Triple, TripleGraph};
