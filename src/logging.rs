//! Tracing setup for binaries and tests embedding the ledger
//!
//! The library only emits events; nothing is printed until the host
//! installs a subscriber, for example with [`init_tracing`].

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when `RUST_LOG` is unset or unparseable
pub const DEFAULT_DIRECTIVE: &str = "budget_ledger=info";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// Safe to call more than once; only the first call has an effect. If
/// another subscriber is already installed it is left in place.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
