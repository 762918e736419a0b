//! Query Execution Module
//!
//! Binds a planned Query Execution Tree to a running context:
//! - Subtree result caching with single-flight builds
//! - Cooperative resource limits (memory, result size, row width)
//! - Timeout / cancellation
//!
//! ## Example
//!
//! ```rust,no_run
//! use triplecore::execution::ExecutionContext;
//! use triplecore::config::Config;
//! # use std::sync::Arc;
//! # use triplecore::catalog::{InMemoryIndex, InMemoryFullTextIndex};
//!
//! let config = Config::default();
//! let ctx = ExecutionContext::new(
//!     Arc::new(InMemoryIndex::new()),
//!     Arc::new(InMemoryFullTextIndex::new()),
//!     &config,
//! );
//! ```

mod cache;
mod context;
mod limits;
mod timeout;

pub use cache::{CacheStats, SubtreeCache};
pub use context::ExecutionContext;
pub use limits::{MemoryTracker, ResourceError, ResourceLimits};
pub use timeout::{with_timeout, with_timeout_result, CancelHandle, QueryTimeout, TimeoutError};
