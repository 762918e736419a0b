//! # Row model
//!
//! A [`Row`] is an ordered tuple of [`Id`]s of known width. Per the design
//! note on pointer-tagged storage, widths 1-5 are packed into
//! cache-friendly fixed arrays and widths 6+ fall back to a variable-length
//! `Vec<Id>`. Both are semantically a tuple of `Id`s; the split is purely a
//! performance optimization and is made unrepresentable-as-a-mismatch by
//! using a single tagged enum rather than a width integer paired with an
//! untyped pointer.

use crate::id::Id;

/// A single row of a fixed width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Row {
    W1([Id; 1]),
    W2([Id; 2]),
    W3([Id; 3]),
    W4([Id; 4]),
    W5([Id; 5]),
    Var(Vec<Id>),
}

impl Row {
    pub fn width(&self) -> usize {
        match self {
            Row::W1(_) => 1,
            Row::W2(_) => 2,
            Row::W3(_) => 3,
            Row::W4(_) => 4,
            Row::W5(_) => 5,
            Row::Var(v) => v.len(),
        }
    }

    pub fn get(&self, col: usize) -> Option<Id> {
        self.as_slice().get(col).copied()
    }

    pub fn as_slice(&self) -> &[Id] {
        match self {
            Row::W1(a) => a.as_slice(),
            Row::W2(a) => a.as_slice(),
            Row::W3(a) => a.as_slice(),
            Row::W4(a) => a.as_slice(),
            Row::W5(a) => a.as_slice(),
            Row::Var(v) => v.as_slice(),
        }
    }

    /// Build a row from a slice, picking the specialized representation
    /// for widths 1-5 and falling back to the variable-width form
    /// otherwise.
    pub fn from_slice(values: &[Id]) -> Row {
        match values.len() {
            1 => Row::W1([values[0]]),
            2 => Row::W2([values[0], values[1]]),
            3 => Row::W3([values[0], values[1], values[2]]),
            4 => Row::W4([values[0], values[1], values[2], values[3]]),
            5 => Row::W5([values[0], values[1], values[2], values[3], values[4]]),
            _ => Row::Var(values.to_vec()),
        }
    }

    /// Re-order/select columns according to `indices`, producing a new row
    /// whose width is `indices.len()` (used by Join to drop the duplicated
    /// join column and by projections).
    pub fn project(&self, indices: &[usize]) -> Row {
        let values: Vec<Id> = indices.iter().map(|&i| self.as_slice()[i]).collect();
        Row::from_slice(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specializes_by_width() {
        assert!(matches!(Row::from_slice(&[Id::from(1u64)]), Row::W1(_)));
        assert!(matches!(
            Row::from_slice(&[Id::from(1u64); 5]),
            Row::W5(_)
        ));
        assert!(matches!(Row::from_slice(&[Id::from(1u64); 6]), Row::Var(_)));
    }

    #[test]
    fn width_matches_representation() {
        let row = Row::from_slice(&[Id::from(1u64), Id::from(2u64), Id::from(3u64)]);
        assert_eq!(row.width(), 3);
        assert_eq!(row.get(1), Some(Id::from(2u64)));
        assert_eq!(row.get(9), None);
    }

    #[test]
    fn project_drops_and_reorders_columns() {
        let row = Row::from_slice(&[Id::from(10u64), Id::from(20u64), Id::from(30u64)]);
        let projected = row.project(&[2, 0]);
        assert_eq!(projected.as_slice(), &[Id::from(30u64), Id::from(10u64)]);
    }
}
