//! Support for tracing execution of a program.

use tracing_subscriber::{fmt::Subscriber, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` isn't set. Our normal output goes to
/// stdout, so only warnings are shown by default.
const DEFAULT_FILTER: &str = "warn";

/// Set up the `tracing` library, logging to stderr and filtering with
/// `RUST_LOG`.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .finish()
        .init();
}
