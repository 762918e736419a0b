//! # Physical operators
//!
//! `Operation` is the tagged-variant QET node: every physical operator
//! conforms to the same polymorphic contract (`compute_result`,
//! `result_width`, `result_sorted_on`, `size_estimate`, `cost_estimate`,
//! `multiplicity`, `known_empty`, `as_string`). Children are held by
//! `Arc` so a cache hit can reuse a subtree across queries without
//! cloning it (spec.md §9, "QET ownership"). Catalog access
//! (`&dyn Index` / `&dyn FullTextIndex`) is threaded through
//! `compute_result` explicitly rather than stored on the node — the node
//! itself is catalog-agnostic once its scan-time statistics
//! (`nof_elements`, `is_functional`) are baked in at construction.

pub mod text;

use crate::catalog::{FullTextIndex, Index};
use crate::error::{EngineError, EngineResult};
use crate::id::Id;
use crate::result_table::ResultTable;
use crate::row::Row;
use crate::triple::Comparator;
use std::sync::Arc;

pub use text::{TextLeafOp, TextOperationOp};

fn compare(cmp: Comparator, a: Id, b: Id) -> bool {
    match cmp {
        Comparator::Eq => a == b,
        Comparator::Ne => a != b,
        Comparator::Lt => a < b,
        Comparator::Le => a <= b,
        Comparator::Gt => a > b,
        Comparator::Ge => a >= b,
    }
}

#[derive(Debug, Clone)]
pub enum FilterPredicate {
    CompareColConst { col: usize, cmp: Comparator, value: Id },
    CompareColCol { left_col: usize, cmp: Comparator, right_col: usize },
}

impl FilterPredicate {
    fn matches(&self, row: &Row) -> bool {
        match self {
            FilterPredicate::CompareColConst { col, cmp, value } => row
                .get(*col)
                .map(|v| compare(*cmp, v, *value))
                .unwrap_or(false),
            FilterPredicate::CompareColCol { left_col, cmp, right_col } => {
                match (row.get(*left_col), row.get(*right_col)) {
                    (Some(l), Some(r)) => compare(*cmp, l, r),
                    _ => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexScanOp {
    pub relation: Id,
    pub relation_name: String,
    pub fixed_lhs: Option<Id>,
    pub nof_elements: u64,
    pub is_functional: bool,
}

impl IndexScanOp {
    pub fn new(
        relation: Id,
        relation_name: impl Into<String>,
        fixed_lhs: Option<Id>,
        nof_elements: u64,
        is_functional: bool,
    ) -> Self {
        IndexScanOp {
            relation,
            relation_name: relation_name.into(),
            fixed_lhs,
            nof_elements,
            is_functional,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinOp {
    pub left: Arc<Operation>,
    pub right: Arc<Operation>,
    pub left_col: usize,
    pub right_col: usize,
}

#[derive(Debug, Clone)]
pub struct OrderByOp {
    pub child: Arc<Operation>,
    /// `(column, descending)` keys, applied in order.
    pub keys: Vec<(usize, bool)>,
}

#[derive(Debug, Clone)]
pub struct SortOp {
    pub child: Arc<Operation>,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOp {
    pub child: Arc<Operation>,
    pub predicate: FilterPredicate,
}

#[derive(Debug, Clone)]
pub struct DistinctOp {
    pub child: Arc<Operation>,
    pub key_cols: Vec<usize>,
}

/// Heuristic fanout used by `Filter::size_estimate` — the spec only
/// requires monotonicity, not exactness.
const FILTER_FANOUT_ESTIMATE: u64 = 2;

#[derive(Debug, Clone)]
pub enum Operation {
    IndexScan(IndexScanOp),
    Join(JoinOp),
    OrderBy(OrderByOp),
    Sort(SortOp),
    Filter(FilterOp),
    Distinct(DistinctOp),
    TextLeaf(TextLeafOp),
    TextOperation(TextOperationOp),
}

impl Operation {
    pub fn compute_result(
        &self,
        index: &dyn Index,
        fulltext: &dyn FullTextIndex,
    ) -> EngineResult<ResultTable> {
        match self {
            Operation::IndexScan(op) => {
                let postings = index.scan(op.relation, op.fixed_lhs);
                let width = op.result_width();
                let mut table = ResultTable::new(width);
                for (s, o) in postings {
                    let row = if op.fixed_lhs.is_some() {
                        Row::from_slice(&[o])
                    } else {
                        Row::from_slice(&[s, o])
                    };
                    table.append_row(row);
                }
                table.set_sorted_by(Some(0));
                table.publish_ready();
                Ok(table)
            }
            Operation::Join(op) => {
                let left = op.left.compute_result(index, fulltext)?;
                let right = op.right.compute_result(index, fulltext)?;
                if left.sorted_by() != Some(op.left_col) || right.sorted_by() != Some(op.right_col)
                {
                    return Err(EngineError::ExecutionFailure(
                        "join child was not pre-sorted on its join column".to_string(),
                    ));
                }
                Ok(sort_merge_join(&left, op.left_col, &right, op.right_col))
            }
            Operation::OrderBy(op) => {
                let child = op.child.compute_result(index, fulltext)?;
                let mut rows: Vec<Row> = child.rows().to_vec();
                rows.sort_by(|a, b| {
                    for &(col, desc) in &op.keys {
                        let ord = a.get(col).cmp(&b.get(col));
                        let ord = if desc { ord.reverse() } else { ord };
                        if ord != std::cmp::Ordering::Equal {
                            return ord;
                        }
                    }
                    std::cmp::Ordering::Equal
                });
                let mut out = ResultTable::new(child.nof_columns());
                for row in rows {
                    out.append_row(row);
                }
                // OrderBy never reports a sorted_by column (§9 open
                // question); the planner, not this operator, special-cases
                // a single ascending ORDER BY key.
                out.set_sorted_by(None);
                out.publish_ready();
                Ok(out)
            }
            Operation::Sort(op) => {
                let child = op.child.compute_result(index, fulltext)?;
                let mut rows: Vec<Row> = child.rows().to_vec();
                rows.sort_by(|a, b| a.get(op.col).cmp(&b.get(op.col)));
                let mut out = ResultTable::new(child.nof_columns());
                for row in rows {
                    out.append_row(row);
                }
                out.set_sorted_by(Some(op.col));
                out.publish_ready();
                Ok(out)
            }
            Operation::Filter(op) => {
                let child = op.child.compute_result(index, fulltext)?;
                let mut out = ResultTable::new(child.nof_columns());
                for row in child.rows() {
                    if op.predicate.matches(row) {
                        out.append_row(row.clone());
                    }
                }
                out.set_sorted_by(child.sorted_by());
                out.publish_ready();
                Ok(out)
            }
            Operation::Distinct(op) => {
                let child = op.child.compute_result(index, fulltext)?;
                let mut out = ResultTable::new(child.nof_columns());
                let mut prev_key: Option<Vec<Id>> = None;
                for row in child.rows() {
                    let key: Vec<Id> = op.key_cols.iter().filter_map(|&c| row.get(c)).collect();
                    if prev_key.as_ref() != Some(&key) {
                        out.append_row(row.clone());
                        prev_key = Some(key);
                    }
                }
                out.set_sorted_by(child.sorted_by());
                out.publish_ready();
                Ok(out)
            }
            Operation::TextLeaf(op) => op.compute_result(fulltext),
            Operation::TextOperation(op) => op.compute_result(index, fulltext),
        }
    }

    pub fn result_width(&self) -> usize {
        match self {
            Operation::IndexScan(op) => op.result_width(),
            Operation::Join(op) => op.left.result_width() + op.right.result_width() - 1,
            Operation::OrderBy(op) => op.child.result_width(),
            Operation::Sort(op) => op.child.result_width(),
            Operation::Filter(op) => op.child.result_width(),
            Operation::Distinct(op) => op.child.result_width(),
            Operation::TextLeaf(op) => op.result_width(),
            Operation::TextOperation(op) => op.result_width(),
        }
    }

    pub fn result_sorted_on(&self) -> Option<usize> {
        match self {
            Operation::IndexScan(_) => Some(0),
            Operation::Join(op) => Some(op.left_col),
            Operation::OrderBy(_) => None,
            Operation::Sort(op) => Some(op.col),
            Operation::Filter(op) => op.child.result_sorted_on(),
            Operation::Distinct(op) => op.child.result_sorted_on(),
            Operation::TextLeaf(_) => Some(0),
            Operation::TextOperation(_) => Some(0),
        }
    }

    pub fn size_estimate(&self) -> u64 {
        match self {
            Operation::IndexScan(op) => op.nof_elements,
            Operation::Join(op) => {
                let s_left = op.left.size_estimate();
                let s_right = op.right.size_estimate();
                let multiplicity = op.right.multiplicity(op.right_col).max(1.0);
                ((s_left as f64) * (s_right as f64) / multiplicity) as u64
            }
            Operation::OrderBy(op) => op.child.size_estimate(),
            Operation::Sort(op) => op.child.size_estimate(),
            Operation::Filter(op) => {
                (op.child.size_estimate() / FILTER_FANOUT_ESTIMATE).max(0)
            }
            Operation::Distinct(op) => op.child.size_estimate(),
            Operation::TextLeaf(op) => op.size_estimate(),
            Operation::TextOperation(op) => op.size_estimate(),
        }
    }

    pub fn cost_estimate(&self) -> u64 {
        match self {
            Operation::IndexScan(op) => op.nof_elements,
            Operation::Join(op) => {
                op.left.cost_estimate() + op.right.cost_estimate() + self.size_estimate()
            }
            Operation::OrderBy(op) => {
                let size = op.child.size_estimate();
                size * crate::planner::cost::log2_floor_clamped(size) + op.child.cost_estimate()
            }
            Operation::Sort(op) => {
                let size = op.child.size_estimate();
                size * crate::planner::cost::log2_floor_clamped(size) + op.child.cost_estimate()
            }
            Operation::Filter(op) => op.child.cost_estimate() + op.child.size_estimate(),
            Operation::Distinct(op) => op.child.cost_estimate() + op.child.size_estimate(),
            Operation::TextLeaf(op) => op.cost_estimate(),
            Operation::TextOperation(op) => op.cost_estimate(),
        }
    }

    pub fn multiplicity(&self, col: usize) -> f64 {
        match self {
            Operation::IndexScan(op) => op.multiplicity(col),
            Operation::Join(op) => {
                let lw = op.left.result_width();
                if col < lw {
                    if col == op.left_col {
                        op.left.multiplicity(col) * op.right.multiplicity(op.right_col)
                    } else {
                        op.left.multiplicity(col)
                    }
                } else {
                    let right_col = remap_right_column(col - lw, op.right_col);
                    op.right.multiplicity(right_col)
                }
            }
            Operation::OrderBy(op) => op.child.multiplicity(col),
            Operation::Sort(op) => op.child.multiplicity(col),
            Operation::Filter(op) => op.child.multiplicity(col),
            Operation::Distinct(_) => 1.0,
            Operation::TextLeaf(_) => 1.0,
            Operation::TextOperation(op) => op.multiplicity(col),
        }
    }

    pub fn known_empty(&self) -> bool {
        match self {
            Operation::IndexScan(op) => op.nof_elements == 0,
            Operation::Join(op) => op.left.known_empty() || op.right.known_empty(),
            Operation::OrderBy(op) => op.child.known_empty(),
            Operation::Sort(op) => op.child.known_empty(),
            Operation::Filter(op) => op.child.known_empty(),
            Operation::Distinct(op) => op.child.known_empty(),
            Operation::TextLeaf(op) => op.known_empty(),
            Operation::TextOperation(op) => op.known_empty(),
        }
    }

    /// Stable, structural, canonical key. Equal keys over the same
    /// catalog produce equal results; used verbatim as the subtree
    /// cache's lookup key.
    pub fn as_string(&self) -> String {
        match self {
            Operation::IndexScan(op) => format!(
                "SCAN({} fixed={:?})",
                op.relation_name,
                op.fixed_lhs.map(Id::value)
            ),
            Operation::Join(op) => {
                let left_key = op.left.as_string();
                let right_key = op.right.as_string();
                let forward = format!("JOIN({left_key}.{} = {right_key}.{})", op.left_col, op.right_col);
                let backward = format!("JOIN({right_key}.{} = {left_key}.{})", op.right_col, op.left_col);
                if forward <= backward {
                    forward
                } else {
                    backward
                }
            }
            Operation::OrderBy(op) => {
                format!("ORDERBY({:?} on {})", op.keys, op.child.as_string())
            }
            Operation::Sort(op) => format!("SORT({} on {})", op.col, op.child.as_string()),
            Operation::Filter(op) => format!("FILTER({:?} on {})", op.predicate, op.child.as_string()),
            Operation::Distinct(op) => {
                format!("DISTINCT({:?} on {})", op.key_cols, op.child.as_string())
            }
            Operation::TextLeaf(op) => op.as_string(),
            Operation::TextOperation(op) => op.as_string(),
        }
    }

    /// Propagate a text limit `k` to every text-bearing descendant.
    pub fn set_text_limit(&mut self, k: usize) {
        match self {
            Operation::Join(op) => {
                Arc::make_mut(&mut op.left).set_text_limit(k);
                Arc::make_mut(&mut op.right).set_text_limit(k);
            }
            Operation::OrderBy(op) => Arc::make_mut(&mut op.child).set_text_limit(k),
            Operation::Sort(op) => Arc::make_mut(&mut op.child).set_text_limit(k),
            Operation::Filter(op) => Arc::make_mut(&mut op.child).set_text_limit(k),
            Operation::Distinct(op) => Arc::make_mut(&mut op.child).set_text_limit(k),
            Operation::TextLeaf(op) => op.text_limit = k,
            Operation::TextOperation(op) => {
                op.text_limit = k;
                if let Some(sub) = &mut op.entity_subtree {
                    Arc::make_mut(sub).set_text_limit(k);
                }
            }
            Operation::IndexScan(_) => {}
        }
    }
}

impl IndexScanOp {
    pub fn result_width(&self) -> usize {
        if self.fixed_lhs.is_some() {
            1
        } else {
            2
        }
    }

    pub fn multiplicity(&self, col: usize) -> f64 {
        if self.fixed_lhs.is_some() {
            1.0
        } else if col == 0 {
            if self.is_functional {
                1.0
            } else {
                2.0
            }
        } else {
            2.0
        }
    }
}

/// Remap a joined-row column index (post-drop of the duplicated right
/// join column) back onto the right child's original column index.
fn remap_right_column(col_after_drop: usize, right_col: usize) -> usize {
    if col_after_drop < right_col {
        col_after_drop
    } else {
        col_after_drop + 1
    }
}

/// Classic sort-merge join with duplicate (non-unique key) handling on
/// both sides: every matching pair of rows from the equal-key runs is
/// emitted.
fn sort_merge_join(left: &ResultTable, left_col: usize, right: &ResultTable, right_col: usize) -> ResultTable {
    let mut out = ResultTable::new(left.nof_columns() + right.nof_columns() - 1);
    let lrows = left.rows();
    let rrows = right.rows();
    let mut i = 0;
    let mut j = 0;
    while i < lrows.len() && j < rrows.len() {
        let lv = lrows[i].get(left_col).expect("left_col in bounds");
        let rv = rrows[j].get(right_col).expect("right_col in bounds");
        match lv.cmp(&rv) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let mut i_end = i;
                while i_end < lrows.len() && lrows[i_end].get(left_col) == Some(lv) {
                    i_end += 1;
                }
                let mut j_end = j;
                while j_end < rrows.len() && rrows[j_end].get(right_col) == Some(rv) {
                    j_end += 1;
                }
                for li in i..i_end {
                    for rj in j..j_end {
                        let mut combined: Vec<Id> = lrows[li].as_slice().to_vec();
                        let mut right_values: Vec<Id> = rrows[rj].as_slice().to_vec();
                        right_values.remove(right_col);
                        combined.extend(right_values);
                        out.append_row(Row::from_slice(&combined));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    out.set_sorted_by(Some(left_col));
    out.publish_ready();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryIndex;
    use crate::catalog::InMemoryFullTextIndex;

    fn scan(relation: Id, index: &InMemoryIndex) -> Operation {
        Operation::IndexScan(IndexScanOp::new(
            relation,
            format!("r{}", relation.value()),
            None,
            index.nof_elements(relation),
            index.is_functional(relation),
        ))
    }

    #[test]
    fn index_scan_produces_sorted_width_two_rows() {
        let mut idx = InMemoryIndex::new();
        let rel = Id::from(1u64);
        idx.insert_relation(
            rel,
            vec![(Id::from(2u64), Id::from(20u64)), (Id::from(1u64), Id::from(10u64))],
        );
        let op = scan(rel, &idx);
        let ft = InMemoryFullTextIndex::new();
        let table = op.compute_result(&idx, &ft).unwrap();
        assert_eq!(table.size(), 2);
        assert_eq!(table.sorted_by(), Some(0));
    }

    #[test]
    fn join_combines_matching_rows_and_drops_duplicate_column() {
        let mut idx = InMemoryIndex::new();
        let r1 = Id::from(1u64);
        let r2 = Id::from(2u64);
        idx.insert_relation(r1, vec![(Id::from(1u64), Id::from(100u64))]);
        idx.insert_relation(r2, vec![(Id::from(100u64), Id::from(200u64))]);
        let left = Arc::new(scan(r1, &idx));
        let right = Arc::new(scan(r2, &idx));
        let join = Operation::Join(JoinOp {
            left,
            right,
            left_col: 1,
            right_col: 0,
        });
        let ft = InMemoryFullTextIndex::new();
        let table = join.compute_result(&idx, &ft).unwrap();
        assert_eq!(table.nof_columns(), 3);
        assert_eq!(table.size(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.as_slice(), &[Id::from(1u64), Id::from(100u64), Id::from(200u64)]);
    }

    #[test]
    fn join_requires_children_pre_sorted_on_join_column() {
        let mut idx = InMemoryIndex::new();
        let r1 = Id::from(1u64);
        idx.insert_relation(r1, vec![(Id::from(1u64), Id::from(100u64))]);
        let left = Arc::new(scan(r1, &idx));
        let right = Arc::new(scan(r1, &idx));
        // join on column 0 of a scan sorted on column 0 but we ask for
        // column 1 on the left, which is unsorted -> execution failure.
        let join = Operation::Join(JoinOp {
            left,
            right,
            left_col: 1,
            right_col: 1,
        });
        let ft = InMemoryFullTextIndex::new();
        assert!(join.compute_result(&idx, &ft).is_err());
    }

    #[test]
    fn order_by_cost_matches_the_spec_formula() {
        let mut idx = InMemoryIndex::new();
        let rel = Id::from(1u64);
        idx.insert_relation(
            rel,
            vec![
                (Id::from(1u64), Id::from(10u64)),
                (Id::from(2u64), Id::from(20u64)),
                (Id::from(3u64), Id::from(30u64)),
                (Id::from(4u64), Id::from(40u64)),
            ],
        );
        let child = Arc::new(scan(rel, &idx));
        let order_by = Operation::OrderBy(OrderByOp {
            child: child.clone(),
            keys: vec![(0, false)],
        });
        let size = child.size_estimate();
        let expected = size * (size as f64).log2().floor().max(1.0) as u64 + child.cost_estimate();
        assert_eq!(order_by.cost_estimate(), expected);
        assert_eq!(order_by.result_sorted_on(), None);
    }

    #[test]
    fn filter_preserves_order_and_drops_non_matching_rows() {
        let mut idx = InMemoryIndex::new();
        let rel = Id::from(1u64);
        idx.insert_relation(
            rel,
            vec![
                (Id::from(1u64), Id::from(10u64)),
                (Id::from(2u64), Id::from(20u64)),
            ],
        );
        let child = Arc::new(scan(rel, &idx));
        let filter = Operation::Filter(FilterOp {
            child,
            predicate: FilterPredicate::CompareColConst {
                col: 0,
                cmp: Comparator::Eq,
                value: Id::from(2u64),
            },
        });
        let ft = InMemoryFullTextIndex::new();
        let table = filter.compute_result(&idx, &ft).unwrap();
        assert_eq!(table.size(), 1);
        assert_eq!(table.rows()[0].get(0), Some(Id::from(2u64)));
    }
}
