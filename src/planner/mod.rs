//! # Planner
//!
//! Turns a [`TripleGraph`] plus a filter list into a single cost-minimal
//! QET by dynamic programming over connected node subsets (spec.md
//! §4.5): seed leaf plans per node, combine disjoint-and-connected plans
//! level by level, push filters down as soon as their free variables are
//! covered, prune by `(node_set, sorted_on, filter_set)`, and finally
//! reconcile against an ORDER BY clause.
//!
//! A pure-text graph (every node collapsed into a text clique) needs no
//! special-cased shortcut here: with a single node the combine loop's
//! range is empty and the seed plan is immediately the only finalist,
//! which is the DP-skip the spec describes realized as the natural
//! degenerate case rather than a separate code path.

pub mod cost;

use crate::catalog::{Index, Vocabulary};
use crate::error::{EngineError, EngineResult};
use crate::id::{Id, IdRange};
use crate::operation::{
    FilterOp, FilterPredicate, IndexScanOp, JoinOp, Operation, OrderByOp, SortOp, TextLeafOp,
    TextOperationOp,
};
use crate::triple::{Filter, FilterExpr, Node, NodeId, Term, Triple, TripleGraph};
use cost::{FilterSet, NodeSet, PruningKey};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct SubtreePlan {
    qet: Arc<Operation>,
    covered_nodes: NodeSet,
    covered_filters: FilterSet,
    var_cols: HashMap<String, usize>,
    cost: u64,
}

fn pruning_key_of(plan: &SubtreePlan) -> PruningKey {
    PruningKey::new(
        plan.covered_nodes.clone(),
        plan.qet.result_sorted_on(),
        plan.covered_filters.clone(),
    )
}

/// Insert `plan`, keeping only the cheapest entry per pruning key. Ties
/// keep the entry already present (stable: earlier plans win).
fn insert_with_pruning(all_plans: &mut BTreeMap<PruningKey, SubtreePlan>, plan: SubtreePlan) {
    let key = pruning_key_of(&plan);
    match all_plans.get(&key) {
        Some(existing) if existing.cost <= plan.cost => {}
        _ => {
            all_plans.insert(key, plan);
        }
    }
}

/// Wrap `qet` in a `Sort` unless it is already sorted on `col`.
fn ensure_sorted(qet: Arc<Operation>, col: usize) -> Arc<Operation> {
    if qet.result_sorted_on() == Some(col) {
        qet
    } else {
        Arc::new(Operation::Sort(SortOp { child: qet, col }))
    }
}

fn translate_filter(expr: &FilterExpr, var_cols: &HashMap<String, usize>) -> Option<FilterPredicate> {
    match expr {
        FilterExpr::CompareVarConst { var, cmp, value } => {
            Some(FilterPredicate::CompareColConst { col: *var_cols.get(var)?, cmp: *cmp, value: *value })
        }
        FilterExpr::CompareVarVar { left, cmp, right } => Some(FilterPredicate::CompareColCol {
            left_col: *var_cols.get(left)?,
            cmp: *cmp,
            right_col: *var_cols.get(right)?,
        }),
    }
}

fn seed_plans_for_node(
    node: &Node,
    relation_ids: &HashMap<String, Id>,
    index: &dyn Index,
    text_word_ranges: &HashMap<NodeId, Vec<IdRange>>,
    text_limit: usize,
) -> EngineResult<Vec<SubtreePlan>> {
    if node.is_text_node() {
        return seed_text_plan(node, text_word_ranges, text_limit).map(|p| vec![p]);
    }

    let triple = node
        .triples
        .first()
        .ok_or_else(|| EngineError::BadInput("graph node has no triple".to_string()))?;

    let relation = *relation_ids
        .get(&triple.predicate)
        .ok_or_else(|| EngineError::BadInput(format!("unknown relation: {}", triple.predicate)))?;

    let fixed_lhs = match &triple.subject {
        Term::Bound(id) => Some(*id),
        Term::Variable(_) | Term::Word(_) => None,
    };
    let nof_elements = index.nof_elements(relation);
    let is_functional = index.is_functional(relation);
    let scan = IndexScanOp::new(relation, triple.predicate.clone(), fixed_lhs, nof_elements, is_functional);
    let width = scan.result_width();

    let mut qet = Arc::new(Operation::IndexScan(scan));
    let mut var_cols = HashMap::new();
    let object_col = width - 1;

    if fixed_lhs.is_none() {
        if let Term::Variable(v) = &triple.subject {
            var_cols.insert(v.clone(), 0);
        }
    }
    match &triple.object {
        Term::Variable(v) => {
            var_cols.insert(v.clone(), object_col);
        }
        Term::Bound(value) => {
            qet = Arc::new(Operation::Filter(FilterOp {
                child: qet,
                predicate: FilterPredicate::CompareColConst {
                    col: object_col,
                    cmp: crate::triple::Comparator::Eq,
                    value: *value,
                },
            }));
        }
        Term::Word(_) => {
            return Err(EngineError::BadInput(format!(
                "text word literal found outside a collapsed text clique in triple with predicate {}",
                triple.predicate
            )));
        }
    }

    let covered_nodes: NodeSet = std::iter::once(node.id).collect();
    let mut plans = Vec::new();
    let cost = qet.cost_estimate();
    plans.push(SubtreePlan {
        qet: qet.clone(),
        covered_nodes: covered_nodes.clone(),
        covered_filters: FilterSet::new(),
        var_cols: var_cols.clone(),
        cost,
    });

    // A second candidate sorted on the object column — the "different
    // sort orders" seed variant (§4.5 step 1) — only useful when there is
    // an object variable left to sort by.
    if fixed_lhs.is_none() && matches!(triple.object, Term::Variable(_)) {
        let sorted = Arc::new(Operation::Sort(SortOp { child: qet, col: object_col }));
        let cost = sorted.cost_estimate();
        plans.push(SubtreePlan {
            qet: sorted,
            covered_nodes,
            covered_filters: FilterSet::new(),
            var_cols,
            cost,
        });
    }

    Ok(plans)
}

fn seed_text_plan(
    node: &Node,
    text_word_ranges: &HashMap<NodeId, Vec<IdRange>>,
    text_limit: usize,
) -> EngineResult<SubtreePlan> {
    let ranges = text_word_ranges
        .get(&node.id)
        .ok_or_else(|| EngineError::BadInput(format!("no word ranges supplied for text node {}", node.id)))?;
    if ranges.is_empty() {
        return Err(EngineError::BadInput(format!("empty word ranges for text node {}", node.id)));
    }

    let qet = if ranges.len() == 1 {
        Arc::new(Operation::TextLeaf(TextLeafOp::new(ranges[0], text_limit)))
    } else {
        Arc::new(Operation::TextOperation(TextOperationOp {
            word_ranges: ranges.clone(),
            entity_subtree: None,
            text_limit,
        }))
    };

    let mut var_cols = HashMap::new();
    if let Some(cvar) = &node.context_var {
        var_cols.insert(cvar.clone(), 0);
    }
    let cost = qet.cost_estimate();
    Ok(SubtreePlan {
        qet,
        covered_nodes: std::iter::once(node.id).collect(),
        covered_filters: FilterSet::new(),
        var_cols,
        cost,
    })
}

/// Attach every currently-eligible, not-yet-included filter to every plan
/// of `level_size` nodes, then repeat against the plans just produced
/// until a pass adds nothing new. A single pass only ever attaches one
/// filter per candidate (the candidate snapshot is taken before the
/// pass runs), so two filters that both only become eligible together at
/// this level — e.g. a single triple with two independent filters —
/// need a second pass to combine; looping to a fixpoint is what lets a
/// plan covering `covered_filters == full_filters` actually get built.
fn push_down_filters(
    all_plans: &mut BTreeMap<PruningKey, SubtreePlan>,
    filters: &[Filter],
    level_size: usize,
) {
    loop {
        let candidates: Vec<SubtreePlan> = all_plans
            .values()
            .filter(|p| p.covered_nodes.len() == level_size)
            .cloned()
            .collect();

        let mut made_progress = false;
        for plan in candidates {
            for filter in filters {
                if plan.covered_filters.contains(&filter.id) {
                    continue;
                }
                let free_vars = filter.free_variables();
                if !free_vars.iter().all(|v| plan.var_cols.contains_key(v)) {
                    continue;
                }
                let Some(predicate) = translate_filter(&filter.expr, &plan.var_cols) else {
                    continue;
                };
                let new_qet = Arc::new(Operation::Filter(FilterOp { child: plan.qet.clone(), predicate }));
                let cost = new_qet.cost_estimate();
                let mut covered_filters = plan.covered_filters.clone();
                covered_filters.insert(filter.id);
                let key = PruningKey::new(plan.covered_nodes.clone(), new_qet.result_sorted_on(), covered_filters.clone());
                if !all_plans.contains_key(&key) {
                    made_progress = true;
                }
                insert_with_pruning(
                    all_plans,
                    SubtreePlan {
                        qet: new_qet,
                        covered_nodes: plan.covered_nodes.clone(),
                        covered_filters,
                        var_cols: plan.var_cols.clone(),
                        cost,
                    },
                );
            }
        }
        if !made_progress {
            break;
        }
    }
}

/// Plan a query: build the cost-minimal QET covering every node of
/// `graph` with every filter in `filters` applied, finished by
/// `order_by` if present.
///
/// `relation_ids` resolves a triple's predicate name to a catalog
/// relation id; `text_word_ranges` supplies the already-vocabulary-
/// resolved prefix range(s) for each text-clique node (word resolution
/// happens upstream of the planner, mirroring `Vocabulary` being a
/// consumed interface rather than something the planner re-derives).
pub fn plan(
    graph: &TripleGraph,
    filters: &[Filter],
    order_by: Option<&[(String, bool)]>,
    relation_ids: &HashMap<String, Id>,
    index: &dyn Index,
    text_word_ranges: &HashMap<NodeId, Vec<IdRange>>,
    text_limit: usize,
) -> EngineResult<Arc<Operation>> {
    if graph.is_empty() {
        return Err(EngineError::BadInput("empty triple graph".to_string()));
    }

    let n = graph.len();
    let mut all_plans: BTreeMap<PruningKey, SubtreePlan> = BTreeMap::new();

    for node in graph.nodes() {
        for seed in seed_plans_for_node(node, relation_ids, index, text_word_ranges, text_limit)? {
            insert_with_pruning(&mut all_plans, seed);
        }
    }
    push_down_filters(&mut all_plans, filters, 1);

    for k in 2..=n {
        let smaller: Vec<SubtreePlan> = all_plans.values().cloned().collect();
        let mut new_candidates = Vec::new();

        for a in &smaller {
            for b in &smaller {
                if a.covered_nodes.len() + b.covered_nodes.len() != k {
                    continue;
                }
                if !a.covered_nodes.is_disjoint(&b.covered_nodes) {
                    continue;
                }
                let union: NodeSet = a.covered_nodes.union(&b.covered_nodes).copied().collect();
                let union_hash: HashSet<NodeId> = union.iter().copied().collect();
                let some_a = *a.covered_nodes.iter().next().unwrap();
                let some_b = *b.covered_nodes.iter().next().unwrap();
                if !graph.connected_within(some_a, some_b, &union_hash) {
                    continue;
                }

                let shared: Vec<String> = a
                    .var_cols
                    .keys()
                    .filter(|v| b.var_cols.contains_key(*v))
                    .cloned()
                    .collect();

                for var in shared {
                    let left_col = a.var_cols[&var];
                    let right_col = b.var_cols[&var];
                    let left_qet = ensure_sorted(a.qet.clone(), left_col);
                    let right_qet = ensure_sorted(b.qet.clone(), right_col);
                    let lw = left_qet.result_width();
                    let join_qet = Arc::new(Operation::Join(JoinOp {
                        left: left_qet,
                        right: right_qet,
                        left_col,
                        right_col,
                    }));

                    let mut var_cols = a.var_cols.clone();
                    for (v, &c) in &b.var_cols {
                        if c == right_col {
                            continue;
                        }
                        let position_after_drop = if c < right_col { c } else { c - 1 };
                        var_cols.insert(v.clone(), lw + position_after_drop);
                    }

                    let covered_filters: FilterSet =
                        a.covered_filters.union(&b.covered_filters).copied().collect();
                    let cost = join_qet.cost_estimate();
                    new_candidates.push(SubtreePlan {
                        qet: join_qet,
                        covered_nodes: union.clone(),
                        covered_filters,
                        var_cols,
                        cost,
                    });
                }
            }
        }

        for candidate in new_candidates {
            insert_with_pruning(&mut all_plans, candidate);
        }
        push_down_filters(&mut all_plans, filters, k);
    }

    let full_nodes: NodeSet = (0..n).collect();
    let full_filters: FilterSet = filters.iter().map(|f| f.id).collect();
    let finalists: Vec<&SubtreePlan> = all_plans
        .values()
        .filter(|p| p.covered_nodes == full_nodes && p.covered_filters == full_filters)
        .collect();

    if finalists.is_empty() {
        let reachable = graph.bfs_leave_out(0, &HashSet::new());
        let mut disconnected_vars: Vec<String> = graph
            .nodes()
            .iter()
            .filter(|node| !reachable.contains(&node.id))
            .flat_map(|node| node.variables.iter().cloned())
            .collect();
        disconnected_vars.sort();
        disconnected_vars.dedup();
        return Err(EngineError::PlannerFailure { disconnected_vars });
    }

    let cheapest = finalists.iter().min_by_key(|p| p.cost).copied().unwrap();

    let Some(order_by) = order_by else {
        return Ok(cheapest.qet.clone());
    };

    let mut keys = Vec::with_capacity(order_by.len());
    for (var, desc) in order_by {
        let col = *cheapest
            .var_cols
            .get(var)
            .ok_or_else(|| EngineError::BadInput(format!("ORDER BY references unbound variable {var}")))?;
        keys.push((col, *desc));
    }

    let order_by_qet = Arc::new(Operation::OrderBy(OrderByOp { child: cheapest.qet.clone(), keys }));
    let mut best = order_by_qet.clone();
    let mut best_cost = order_by_qet.cost_estimate();

    if order_by.len() == 1 {
        let (var, desc) = &order_by[0];
        if !desc {
            for plan in &finalists {
                if let Some(&col) = plan.var_cols.get(var) {
                    if plan.qet.result_sorted_on() == Some(col) && plan.cost < best_cost {
                        best = plan.qet.clone();
                        best_cost = plan.cost;
                    }
                }
            }
        }
    }

    Ok(best)
}

/// Compose a full query plan from a flat triple list: build the graph,
/// collapse text cliques (§4.4 step 4), resolve each clique's word
/// pattern(s) against `vocabulary` into the id ranges `plan` needs, and
/// hand the collapsed graph plus the filters split off by collapsing to
/// `plan`. This is the entry point callers should use for any query that
/// may contain `<in-context>` triples — `plan` itself takes an
/// already-collapsed graph and pre-resolved ranges, since word resolution
/// is a vocabulary lookup the planner has no business repeating per call.
pub fn plan_query(
    triples: Vec<Triple>,
    filters: Vec<Filter>,
    order_by: Option<&[(String, bool)]>,
    relation_ids: &HashMap<String, Id>,
    index: &dyn Index,
    vocabulary: &Vocabulary,
    text_limit: usize,
) -> EngineResult<Arc<Operation>> {
    let mut graph = TripleGraph::from_triples(triples);
    let filters = graph.collapse_text_cliques(filters);

    let mut text_word_ranges: HashMap<NodeId, Vec<IdRange>> = HashMap::new();
    for node in graph.nodes() {
        if !node.is_text_node() {
            continue;
        }
        let words = node.word_part.as_deref().unwrap_or("");
        let ranges: Vec<IdRange> = words
            .split_whitespace()
            .map(|word| {
                vocabulary
                    .get_id_range_for_full_text_prefix(word)
                    .unwrap_or(IdRange::EMPTY)
            })
            .collect();
        text_word_ranges.insert(node.id, ranges);
    }

    plan(&graph, &filters, order_by, relation_ids, index, &text_word_ranges, text_limit)
}
