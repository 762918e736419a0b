//! # Result Table
//!
//! The materialized output of a subtree: a column-oriented block of rows
//! plus metadata (column count, sort order, status). Constructed empty,
//! populated by exactly one producing operation while `BUILDING`, then
//! published as `READY`. Concurrent readers may only observe `READY`
//! tables (enforced at the [`crate::execution::cache::SubtreeCache`]
//! boundary, not here).

use crate::id::Id;
use crate::row::Row;
use std::fmt;

/// Lifecycle state of a [`ResultTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Still being populated by its producing operation.
    Building,
    /// Immutable and safe to read.
    Ready,
    /// The producing operation failed; rows must not be read.
    Failed,
}

/// Number of rows shown by [`ResultTable::debug_string`].
const DEBUG_ROW_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct ResultTable {
    nof_columns: usize,
    rows: Vec<Row>,
    /// Column the rows are non-decreasing on, or `None` for "unknown/unsorted".
    sorted_by: Option<usize>,
    status: Status,
}

impl ResultTable {
    /// Construct an empty, `BUILDING` table of the given width.
    pub fn new(nof_columns: usize) -> Self {
        ResultTable {
            nof_columns,
            rows: Vec::new(),
            sorted_by: None,
            status: Status::Building,
        }
    }

    pub fn nof_columns(&self) -> usize {
        self.nof_columns
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn sorted_by(&self) -> Option<usize> {
        self.sorted_by
    }

    pub fn set_sorted_by(&mut self, col: Option<usize>) {
        self.sorted_by = col;
    }

    /// Append a row while the table is still `BUILDING`.
    ///
    /// # Panics
    /// Panics if the table is not `BUILDING`, or if `row`'s width does not
    /// equal `nof_columns`: these are both structural contract violations,
    /// not expected runtime conditions (see spec.md §7's distinction
    /// between expected empties and invariant violations).
    pub fn append_row(&mut self, row: Row) {
        assert_eq!(
            self.status,
            Status::Building,
            "append_row called on a table that is not BUILDING"
        );
        assert_eq!(
            row.width(),
            self.nof_columns,
            "row width {} does not match table width {}",
            row.width(),
            self.nof_columns
        );
        self.rows.push(row);
    }

    /// Mark the table `READY`. After this, `rows` and `nof_columns` are
    /// immutable.
    pub fn publish_ready(&mut self) {
        self.status = Status::Ready;
    }

    /// Mark the table `FAILED`. Partial rows are discarded; a failed table
    /// is never cached (see [`crate::execution::cache::SubtreeCache`]).
    pub fn publish_failed(&mut self) {
        self.rows.clear();
        self.status = Status::Failed;
    }

    /// Number of rows. Valid regardless of status (useful while building,
    /// for size-estimate bookkeeping), but callers must only treat the
    /// rows themselves as meaningful once `status() == Ready`.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Deep copy of the data block. The cache shares tables via `Arc`
    /// instead of calling this; this exists for callers that need an
    /// independently-mutable copy (e.g. to re-sort a cached result).
    ///
    /// Deep copy is legal for variable-width tables as well as
    /// width-specialized ones — see spec.md §9's open question, resolved
    /// here in favor of "legal" since the tagged `Row` representation
    /// makes a width mismatch unrepresentable.
    pub fn deep_copy(&self) -> ResultTable {
        self.clone()
    }

    /// First (up to) 5 rows, tab-separated, one row per line.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for row in self.rows.iter().take(DEBUG_ROW_LIMIT) {
            let cols: Vec<String> = row.as_slice().iter().map(Id::to_string).collect();
            out.push_str(&cols.join("\t"));
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResultTable(cols={}, rows={}, status={:?})\n{}",
            self.nof_columns,
            self.size(),
            self.status,
            self.debug_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[u64]) -> Row {
        let ids: Vec<Id> = values.iter().map(|&v| Id::from(v)).collect();
        Row::from_slice(&ids)
    }

    #[test]
    fn append_then_publish() {
        let mut t = ResultTable::new(2);
        t.append_row(row(&[1, 2]));
        t.append_row(row(&[3, 4]));
        t.set_sorted_by(Some(0));
        t.publish_ready();
        assert_eq!(t.status(), Status::Ready);
        assert_eq!(t.size(), 2);
        assert_eq!(t.sorted_by(), Some(0));
    }

    #[test]
    #[should_panic]
    fn append_after_ready_panics() {
        let mut t = ResultTable::new(1);
        t.publish_ready();
        t.append_row(row(&[1]));
    }

    #[test]
    #[should_panic]
    fn width_mismatch_panics() {
        let mut t = ResultTable::new(2);
        t.append_row(row(&[1]));
    }

    #[test]
    fn debug_string_caps_at_five_rows() {
        let mut t = ResultTable::new(1);
        for i in 0..10u64 {
            t.append_row(row(&[i]));
        }
        t.publish_ready();
        assert_eq!(t.debug_string().lines().count(), 5);
    }

    #[test]
    fn failed_table_discards_rows() {
        let mut t = ResultTable::new(1);
        t.append_row(row(&[1]));
        t.publish_failed();
        assert_eq!(t.status(), Status::Failed);
        assert_eq!(t.size(), 0);
    }
}
