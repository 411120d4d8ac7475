//! Diagnostic logging to stderr.
//!
//! `RUST_LOG` wins when set. Otherwise `--verbose` shows debug output from
//! the flows, `--quiet` shows errors only, and the default is `warn` so that
//! failed attempts are visible.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(verbose: bool, quiet: bool) {
    let fallback = if verbose {
        "counterpoint_flows=debug,counterpoint=debug,warn"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
