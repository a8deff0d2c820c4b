//! Tracing bootstrap
//!
//! Library code only emits `tracing` events. Binaries and tests that want
//! to see them call [`init_tracing`] once at startup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,slotguard=debug";

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `fallback` when
/// `RUST_LOG` is unset or invalid
///
/// Returns `false` if a global subscriber was already installed; calling
/// this more than once is harmless.
pub fn init_tracing(fallback: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
