//! Diagnostic logging setup
//!
//! Console output meant for the user (banner, progress, summary) goes to
//! stdout through `println!`; diagnostics go through `tracing` to stderr.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for the given verbosity
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "deepmip_check=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default level.
///
/// Calling it a second time is a no-op.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false),
        )
        .with(filter)
        .try_init();
}
