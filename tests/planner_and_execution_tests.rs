//! End-to-end planner + execution tests: plan a query over an in-memory
//! catalog, execute it through an `ExecutionContext`, and check the
//! result.

use std::collections::HashMap;
use std::sync::Arc;

use triplecore::catalog::{InMemoryFullTextIndex, InMemoryIndex};
use triplecore::config::Config;
use triplecore::execution::ExecutionContext;
use triplecore::id::Id;
use triplecore::planner;
use triplecore::triple::{Term, Triple, TripleGraph};

fn knows_index() -> InMemoryIndex {
    let mut index = InMemoryIndex::new();
    index.insert_relation(
        Id::from(1u64),
        vec![
            (Id::from(1u64), Id::from(2u64)),
            (Id::from(2u64), Id::from(3u64)),
            (Id::from(3u64), Id::from(4u64)),
        ],
    );
    index
}

#[test]
fn plans_and_executes_a_two_hop_join() {
    let index = knows_index();
    let triples = vec![
        Triple::new(Term::Variable("a".into()), "<knows>", Term::Variable("b".into())),
        Triple::new(Term::Variable("b".into()), "<knows>", Term::Variable("c".into())),
    ];
    let graph = TripleGraph::from_triples(triples);
    let mut relation_ids = HashMap::new();
    relation_ids.insert("<knows>".to_string(), Id::from(1u64));

    let qet = planner::plan(&graph, &[], None, &relation_ids, &index, &HashMap::new(), 100)
        .expect("plan should succeed for a connected graph");

    let config = Config::default();
    let ctx = ExecutionContext::new(
        Arc::new(index),
        Arc::new(InMemoryFullTextIndex::new()),
        &config,
    );
    let result = ctx.execute(&qet).unwrap();
    // (1,2,3), (2,3,4)
    assert_eq!(result.size(), 2);
    assert_eq!(result.nof_columns(), 3);
}

#[test]
fn planning_a_disconnected_graph_reports_the_unreachable_variable() {
    let index = knows_index();
    let triples = vec![
        Triple::new(Term::Variable("a".into()), "<knows>", Term::Variable("b".into())),
        Triple::new(Term::Variable("x".into()), "<knows>", Term::Variable("y".into())),
    ];
    let graph = TripleGraph::from_triples(triples);
    let mut relation_ids = HashMap::new();
    relation_ids.insert("<knows>".to_string(), Id::from(1u64));

    let err = planner::plan(&graph, &[], None, &relation_ids, &index, &HashMap::new(), 100)
        .unwrap_err();
    match err {
        triplecore::EngineError::PlannerFailure { disconnected_vars } => {
            assert!(!disconnected_vars.is_empty());
        }
        other => panic!("expected PlannerFailure, got {other:?}"),
    }
}

#[test]
fn repeated_execution_of_the_same_qet_hits_the_subtree_cache() {
    let index = knows_index();
    let triples = vec![Triple::new(
        Term::Variable("a".into()),
        "<knows>",
        Term::Variable("b".into()),
    )];
    let graph = TripleGraph::from_triples(triples);
    let mut relation_ids = HashMap::new();
    relation_ids.insert("<knows>".to_string(), Id::from(1u64));
    let qet = planner::plan(&graph, &[], None, &relation_ids, &index, &HashMap::new(), 100).unwrap();

    let config = Config::default();
    let ctx = ExecutionContext::new(
        Arc::new(index),
        Arc::new(InMemoryFullTextIndex::new()),
        &config,
    );
    let first = ctx.execute(&qet).unwrap();
    let second = ctx.execute(&qet).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
