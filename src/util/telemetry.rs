//! Tracing bootstrap for binaries and tests embedding the scheduler.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable: scheduler lifecycle
/// at info, everything else at warn.
pub const DEFAULT_LOG_FILTER: &str = "warn,exchange_sync_scheduler=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Returns whether this call installed it; an
/// already installed global subscriber is left alone.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_LOG_FILTER)
}

/// Same as [`init_tracing`] with a caller-chosen fallback filter.
pub fn init_tracing_with(fallback: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
