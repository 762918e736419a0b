//! Planner performance benchmarks: seed/DP cost over chains of triples
//! of varying size and over a query with pushdown filters.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::time::Duration;
use triplecore::catalog::InMemoryIndex;
use triplecore::id::Id;
use triplecore::triple::{Comparator, Filter, FilterExpr, Term, Triple, TripleGraph};

fn var(name: &str) -> Term {
    Term::Variable(name.to_string())
}

/// A linear chain `?v0 knows ?v1 . ?v1 knows ?v2 . ... ` of `len` triples,
/// each relation populated with a handful of postings so scans are cheap
/// but the DP search space still grows with `len`.
fn make_chain(len: usize) -> (TripleGraph, HashMap<String, Id>, InMemoryIndex) {
    let mut index = InMemoryIndex::new();
    let mut relation_ids = HashMap::new();
    let mut triples = Vec::with_capacity(len);

    for i in 0..len {
        let relation = format!("<knows{i}>");
        let rel_id = Id::from((i + 1) as u64);
        index.insert_relation(
            rel_id,
            (0..20u64)
                .map(|n| (Id::from(n), Id::from(n + 1)))
                .collect(),
        );
        relation_ids.insert(relation.clone(), rel_id);
        triples.push(Triple::new(var(&format!("v{i}")), relation, var(&format!("v{}", i + 1))));
    }

    (TripleGraph::from_triples(triples), relation_ids, index)
}

fn bench_plan_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_chain");
    for len in [2usize, 4, 6] {
        let (graph, relation_ids, index) = make_chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                triplecore::planner::plan(&graph, &[], None, &relation_ids, &index, &HashMap::new(), 100)
            });
        });
    }
    group.finish();
}

fn bench_plan_with_filter_pushdown(c: &mut Criterion) {
    let (graph, relation_ids, index) = make_chain(3);
    let filters = vec![Filter {
        id: 0,
        expr: FilterExpr::CompareVarConst {
            var: "v1".to_string(),
            cmp: Comparator::Gt,
            value: Id::from(5u64),
        },
    }];

    c.bench_function("plan_with_filter_pushdown", |b| {
        b.iter(|| {
            triplecore::planner::plan(&graph, &filters, None, &relation_ids, &index, &HashMap::new(), 100)
        });
    });
}

fn bench_plan_with_order_by(c: &mut Criterion) {
    let (graph, relation_ids, index) = make_chain(3);
    let order_by = vec![("v0".to_string(), false)];

    c.bench_function("plan_with_order_by", |b| {
        b.iter(|| {
            triplecore::planner::plan(
                &graph,
                &[],
                Some(&order_by),
                &relation_ids,
                &index,
                &HashMap::new(),
                100,
            )
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));
    targets = bench_plan_chain, bench_plan_with_filter_pushdown, bench_plan_with_order_by
}
criterion_main!(benches);
