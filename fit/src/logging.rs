//! Diagnostic logging to stderr
//!
//! The filter comes from `FIT_LOG`, then `RUST_LOG`, then defaults to
//! `warn`. `--verbose` forces `debug`. Stdout is left to command output.

use tracing_subscriber::EnvFilter;

pub const ENV_VAR: &str = "FIT_LOG";

pub fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_env(ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber; later calls are ignored
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
