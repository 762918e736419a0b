//! Tracing initialization.
//!
//! Centralizes the `tracing_subscriber` setup the teacher's binaries
//! otherwise perform ad hoc. Honors `RUST_LOG` if set, falling back to the
//! level configured in [`crate::config::Config`].

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call more than once;
/// subsequent calls are no-ops (matches `tracing`'s own guidance for
/// binaries that may initialize logging from more than one entry point,
/// e.g. both `main` and a test harness).
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
