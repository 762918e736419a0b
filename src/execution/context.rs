//! Execution Context Module
//!
//! Binds everything a running query needs: the catalog (triple index and
//! full-text index), the shared subtree cache, resource limits and a
//! timeout/cancellation handle.

use std::sync::Arc;

use crate::catalog::{FullTextIndex, Index};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::operation::Operation;
use crate::result_table::ResultTable;

use super::cache::SubtreeCache;
use super::limits::ResourceLimits;
use super::timeout::QueryTimeout;

/// Everything a query needs to run: the catalog it reads from, the
/// subtree cache it reads and writes through, and the resource/time
/// budget it must respect.
pub struct ExecutionContext {
    index: Arc<dyn Index>,
    fulltext: Arc<dyn FullTextIndex>,
    cache: SubtreeCache,
    limits: ResourceLimits,
    timeout: QueryTimeout,
}

impl ExecutionContext {
    pub fn new(index: Arc<dyn Index>, fulltext: Arc<dyn FullTextIndex>, config: &Config) -> Self {
        ExecutionContext {
            index,
            fulltext,
            cache: SubtreeCache::new(config.cache.subtree_cache_capacity),
            limits: ResourceLimits::from(config.limits.clone()),
            timeout: QueryTimeout::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: QueryTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &SubtreeCache {
        &self.cache
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn timeout(&self) -> &QueryTimeout {
        &self.timeout
    }

    /// Executes `qet`, consulting the subtree cache by the operation's
    /// canonical key and checking the timeout and resource limits before
    /// and after the build.
    pub fn execute(&self, qet: &Arc<Operation>) -> EngineResult<Arc<ResultTable>> {
        self.timeout
            .check()
            .map_err(|e| EngineError::ExecutionFailure(e.to_string()))?;

        if let Some(limit) = self.limits.max_row_width {
            self.limits
                .check_row_width(qet.result_width())
                .map_err(|_| EngineError::ExecutionFailure(format!(
                    "row width {} exceeds limit {}",
                    qet.result_width(),
                    limit
                )))?;
        }

        let key = qet.as_string();
        let index = Arc::clone(&self.index);
        let fulltext = Arc::clone(&self.fulltext);
        let qet = Arc::clone(qet);
        let limits = self.limits.clone();

        let table = self.cache.get_or_build(&key, move || {
            let table = qet.compute_result(index.as_ref(), fulltext.as_ref())?;
            limits
                .check_result_size(table.size())
                .map_err(|e| EngineError::ExecutionFailure(e.to_string()))?;
            Ok(table)
        })?;

        self.timeout
            .check()
            .map_err(|e| EngineError::ExecutionFailure(e.to_string()))?;

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryFullTextIndex, InMemoryIndex};
    use crate::id::Id;
    use crate::operation::IndexScanOp;

    #[test]
    fn executes_and_reuses_the_cache() {
        let mut index = InMemoryIndex::new();
        index.insert_relation(
            Id::from(1u64),
            vec![(Id::from(10u64), Id::from(20u64))],
        );
        let config = Config::default();
        let ctx = ExecutionContext::new(
            Arc::new(index),
            Arc::new(InMemoryFullTextIndex::new()),
            &config,
        );

        let qet = Arc::new(Operation::IndexScan(IndexScanOp::new(
            Id::from(1u64),
            "<rel>".to_string(),
            None,
            1,
            true,
        )));

        let first = ctx.execute(&qet).unwrap();
        let second = ctx.execute(&qet).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cache().stats().ready_entries, 1);
    }

    #[test]
    fn a_cancelled_timeout_stops_execution_before_running() {
        let index = InMemoryIndex::new();
        let config = Config::default();
        let ctx = ExecutionContext::new(
            Arc::new(index),
            Arc::new(InMemoryFullTextIndex::new()),
            &config,
        )
        .with_timeout(QueryTimeout::infinite());
        ctx.timeout().cancel();

        let qet = Arc::new(Operation::IndexScan(IndexScanOp::new(
            Id::from(1u64),
            "<rel>".to_string(),
            None,
            0,
            false,
        )));
        assert!(ctx.execute(&qet).is_err());
    }
}
