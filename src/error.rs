//! Crate-wide error type.
//!
//! Unknown-term vocabulary misses are deliberately *not* a variant here:
//! per spec.md §7 they surface as an empty scan result, not an error.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A triple or query fragment didn't match the expected grammar.
    #[error("bad input: {0}")]
    BadInput(String),

    /// No connected plan covers all triple-graph nodes.
    #[error("planner failure: disconnected variables {disconnected_vars:?}")]
    PlannerFailure { disconnected_vars: Vec<String> },

    /// An operator hit an I/O error or invariant violation while computing
    /// its result; the result table is marked `FAILED`.
    #[error("execution failure: {0}")]
    ExecutionFailure(String),

    /// A cache `build_fn` failed; propagated identically to every waiter.
    #[error("cache build failure: {0}")]
    CacheBuildFailure(String),

    /// CLI/benchmark usage error; the binary exits with code 1.
    #[error("usage error: {0}")]
    UsageError(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
