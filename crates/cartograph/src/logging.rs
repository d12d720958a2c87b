//! # Logging Bootstrap
//!
//! Installs a `tracing` subscriber for the binaries. Accepts the usual
//! `RUST_LOG` filters.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Returns false if one was already set.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
