//! Development-time tracing for the follower.
//!
//! Diagnostics only: `RUST_LOG` controls verbosity and output goes to
//! stderr, so `follower simulate` keeps stdout for its JSON lines.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber. Later calls leave the first one in place.
///
/// ```bash
/// RUST_LOG=follower=debug follower simulate --scenario run.json --leader Leader
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
