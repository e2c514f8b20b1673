//! Logging configuration for sqlpilot.
//!
//! Logs go to stderr so that `sqlpilot ask` can print the answer on stdout
//! without interleaving diagnostics.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` for this
/// crate and `info` for everything else.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn default_directive(verbose: bool) -> String {
    if verbose {
        format!("{DEFAULT_FILTER},sqlpilot=debug")
    } else {
        DEFAULT_FILTER.to_string()
    }
}
