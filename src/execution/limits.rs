//! Resource Limits Module
//!
//! Provides resource limit enforcement for query execution:
//! - Memory usage limits
//! - Result set size limits
//! - Intermediate result limits
//!
//! ## Design
//!
//! Uses cooperative checking - query execution code should periodically
//! call `check_*` methods to verify limits are not exceeded.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Resource limit error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    /// Memory limit exceeded
    #[error("Memory limit exceeded: used {used} bytes, limit {limit} bytes")]
    MemoryLimitExceeded { limit: usize, used: usize },

    /// Result size limit exceeded
    #[error("Result size limit exceeded: {actual} tuples, limit {limit} tuples")]
    ResultSizeLimitExceeded { limit: usize, actual: usize },

    /// Intermediate result size exceeded
    #[error(
        "Intermediate result limit exceeded at '{stage}': {actual} tuples, limit {limit} tuples"
    )]
    IntermediateResultExceeded {
        limit: usize,
        actual: usize,
        stage: String,
    },

    /// Row width (tuple arity) exceeded
    #[error("Row width limit exceeded: {actual} columns, limit {limit} columns")]
    RowWidthExceeded { limit: usize, actual: usize },
}

/// Resource limits configuration
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum memory usage in bytes (None = unlimited)
    pub max_memory_bytes: Option<usize>,

    /// Maximum number of tuples in final result (None = unlimited)
    pub max_result_size: Option<usize>,

    /// Maximum number of tuples in intermediate results (None = unlimited)
    pub max_intermediate_size: Option<usize>,

    /// Maximum row width (number of columns per tuple)
    pub max_row_width: Option<usize>,

    /// Maximum recursion depth; unused by this core (no recursive
    /// operator in the catalog) but kept as an ambient knob matching the
    /// rest of the resource-limit surface.
    pub max_recursion_depth: Option<usize>,
}

impl ResourceLimits {
    pub fn unlimited() -> Self {
        ResourceLimits {
            max_memory_bytes: None,
            max_result_size: None,
            max_intermediate_size: None,
            max_row_width: None,
            max_recursion_depth: None,
        }
    }

    pub fn check_result_size(&self, actual: usize) -> Result<(), ResourceError> {
        if let Some(limit) = self.max_result_size {
            if actual > limit {
                return Err(ResourceError::ResultSizeLimitExceeded { limit, actual });
            }
        }
        Ok(())
    }

    pub fn check_intermediate_size(&self, stage: &str, actual: usize) -> Result<(), ResourceError> {
        if let Some(limit) = self.max_intermediate_size {
            if actual > limit {
                return Err(ResourceError::IntermediateResultExceeded {
                    limit,
                    actual,
                    stage: stage.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn check_row_width(&self, actual: usize) -> Result<(), ResourceError> {
        if let Some(limit) = self.max_row_width {
            if actual > limit {
                return Err(ResourceError::RowWidthExceeded { limit, actual });
            }
        }
        Ok(())
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits::unlimited()
    }
}

impl From<crate::config::ResourceLimitsConfig> for ResourceLimits {
    fn from(cfg: crate::config::ResourceLimitsConfig) -> Self {
        ResourceLimits {
            max_memory_bytes: cfg.max_memory_bytes,
            max_result_size: cfg.max_result_size,
            max_intermediate_size: cfg.max_intermediate_size,
            max_row_width: cfg.max_row_width,
            max_recursion_depth: None,
        }
    }
}

/// Tracks cumulative memory attributed to live Result Tables, so a
/// `max_memory_bytes` limit can be enforced across an entire execution
/// context rather than per operator.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    used: AtomicUsize,
}

impl MemoryTracker {
    pub fn new() -> Self {
        MemoryTracker { used: AtomicUsize::new(0) }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Record `bytes` as newly allocated, failing (without recording the
    /// allocation) if doing so would exceed `limit`.
    pub fn allocate(&self, bytes: usize, limit: Option<usize>) -> Result<(), ResourceError> {
        let prior = self.used.fetch_add(bytes, Ordering::SeqCst);
        let total = prior + bytes;
        if let Some(limit) = limit {
            if total > limit {
                self.used.fetch_sub(bytes, Ordering::SeqCst);
                return Err(ResourceError::MemoryLimitExceeded { limit, used: total });
            }
        }
        Ok(())
    }

    pub fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_size_limit_is_enforced() {
        let limits = ResourceLimits { max_result_size: Some(10), ..ResourceLimits::unlimited() };
        assert!(limits.check_result_size(10).is_ok());
        assert!(limits.check_result_size(11).is_err());
    }

    #[test]
    fn memory_tracker_rejects_overflowing_allocation_without_recording_it() {
        let tracker = MemoryTracker::new();
        tracker.allocate(50, Some(100)).unwrap();
        assert_eq!(tracker.used(), 50);
        assert!(tracker.allocate(60, Some(100)).is_err());
        assert_eq!(tracker.used(), 50);
        tracker.release(50);
        assert_eq!(tracker.used(), 0);
    }
}
