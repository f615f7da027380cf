//! Initialization of logging.

use std::io;

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr.
///
/// The level defaults to `info`, or `debug` if `verbose` is set. `RUST_LOG` takes
/// precedence over both.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},russh=warn")));
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .event_format(format)
        .init();
}
