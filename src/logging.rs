//! Tracing setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for `--json` output. `RUST_LOG`
//! overrides the verbosity flags when set.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "places_anchors=error";
    }
    match verbose {
        0 => "places_anchors=info",
        1 => "places_anchors=debug",
        _ => "places_anchors=trace,reqwest=debug",
    }
}

/// Install the global subscriber. Calling twice is harmless.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .without_time()
        .try_init();
}
